use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::config::Config;
use crate::error::AppError;

/// The caller identity bound by the auth middleware. Not otherwise
/// consumed by the core; it exists for audit/logging hooks (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct Identity(pub String);

const ANONYMOUS: &str = "anonymous";

/// Single decision made before any handler body runs (spec.md §4.6): bind
/// `anonymous` when unauthenticated access is allowed, otherwise require
/// the configured header to be present and non-empty.
pub async fn middleware(
    State(config): State<Arc<Config>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = if config.allow_unauthenticated_access {
        Identity(ANONYMOUS.to_string())
    } else {
        let header_value = request
            .headers()
            .get(&config.user_in_header)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty());

        match header_value {
            Some(value) => Identity(value.to_string()),
            None => {
                return Err(AppError::Forbidden(format!(
                    "missing or empty {} header",
                    config.user_in_header
                )));
            }
        }
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{Router, middleware as axum_middleware};
    use tower::ServiceExt;

    fn test_config(allow_unauthenticated: bool) -> Arc<Config> {
        Arc::new(Config {
            port: 8888,
            log_level: "info".to_string(),
            allow_unauthenticated_access: allow_unauthenticated,
            user_in_header: "X-Forwarded-User".to_string(),
        })
    }

    fn app(config: Arc<Config>) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum_middleware::from_fn_with_state(config.clone(), middleware))
            .with_state(config)
    }

    #[tokio::test]
    async fn anonymous_access_is_allowed_when_configured() {
        let response = app(test_config(true))
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_header_is_forbidden() {
        let response = app(test_config(false))
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn present_header_is_accepted() {
        let response = app(test_config(false))
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("X-Forwarded-User", "alice")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
