//! Wires the HTTP façade (C5) together: router assembly, shared state, and
//! the CORS/CSP response layer shared by every endpoint (spec.md §4.5,
//! §8 invariant 5).

use std::sync::Arc;

use axum::http::header::CONTENT_SECURITY_POLICY;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use kernel_manager::KernelManager;
use tower_http::cors::CorsLayer;

use crate::channels::{NoopChannelConnector, UpstreamChannelConnector};
use crate::config::Config;
use crate::{auth, handlers, openapi};

/// Shared state every handler is wired against.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<KernelManager>,
    pub config: Arc<Config>,
    pub connector: Arc<dyn UpstreamChannelConnector>,
}

impl AppState {
    pub fn new(manager: Arc<KernelManager>, config: Arc<Config>) -> Self {
        Self {
            manager,
            config,
            connector: Arc::new(NoopChannelConnector),
        }
    }
}

/// Strip `Content-Security-Policy` from every response: this is a pure
/// JSON API serving no frontend media types, so the header is never
/// meaningful here (spec.md §4.5, §8 invariant 5).
async fn clear_csp(request: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().remove(CONTENT_SECURITY_POLICY);
    response
}

/// Assemble the full router: C5 endpoints, the C6 auth middleware, the C7
/// channels bridge, and the CORS/CSP response layer applied to everything.
pub fn build_router(state: AppState) -> Router {
    let auth_config = state.config.clone();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/kernelspecs", get(handlers::kernel_specs))
        .route_service("/api/swagger.yaml", openapi::swagger_yaml_service())
        .route_service("/api/docs", openapi::swagger_docs_service())
        .route(
            "/api/kernels",
            get(handlers::list_kernels)
                .post(handlers::create_kernel)
                .delete(handlers::delete_kernels_batch),
        )
        .route(
            "/api/kernels/{id}",
            get(handlers::get_kernel).delete(handlers::delete_kernel),
        )
        .route("/api/kernels/{id}/channels", get(crate::channels::channels_handler))
        .layer(middleware::from_fn_with_state(auth_config, auth::middleware))
        .layer(middleware::from_fn(clear_csp))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
