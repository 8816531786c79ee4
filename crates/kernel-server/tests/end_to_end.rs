//! End-to-end scenarios from spec.md §8, exercised against the full
//! router with a fake [`KernelCrClient`] standing in for Kubernetes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use kernel_k8s::{K8sClientError, KernelCrClient};
use kernel_manager::KernelManager;
use kernel_schema::{CrNames, KernelPayload, KernelView, cr_to_view, payload_to_cr};
use kernel_server::{AppState, Config, build_router};
use serde_json::Value;
use tower::ServiceExt;

#[derive(Default)]
struct FakeClient {
    names: CrNames,
    kernels: Mutex<Vec<Value>>,
    force_exists: bool,
    force_quota_exceeded: bool,
    never_ready: bool,
    delete_calls: AtomicUsize,
}

#[async_trait]
impl KernelCrClient for FakeClient {
    async fn create(&self, payload: &KernelPayload, _timeout: Option<Duration>) -> Result<(), K8sClientError> {
        if self.force_exists {
            return Err(K8sClientError::KernelExistsError("already exists".to_string()));
        }
        if self.force_quota_exceeded {
            return Err(K8sClientError::KernelResourceQuotaExceededError(
                "exceeded quota: pods=10".to_string(),
            ));
        }
        let mut cr = payload_to_cr(payload, &self.names);
        if !self.never_ready {
            cr["status"] = serde_json::json!({"phase": "Running"});
        } else {
            cr["status"] = serde_json::json!({"phase": "Pending"});
        }
        self.kernels.lock().expect("lock").push(cr);
        Ok(())
    }

    async fn list(
        &self,
        _namespace: Option<&str>,
        _timeout: Option<Duration>,
    ) -> Result<Vec<KernelView>, K8sClientError> {
        self.kernels
            .lock()
            .expect("lock")
            .iter()
            .map(|cr| cr_to_view(cr, &self.names).map_err(K8sClientError::from))
            .collect()
    }

    async fn get_by_id(
        &self,
        kernel_id: &str,
        _namespace: Option<&str>,
        _timeout: Option<Duration>,
    ) -> Result<KernelView, K8sClientError> {
        let kernels = self.kernels.lock().expect("lock");
        let cr = kernels
            .iter()
            .find(|cr| cr["metadata"]["labels"]["jupyter.org/kernel-id"] == kernel_id)
            .ok_or_else(|| K8sClientError::KernelNotFoundError(format!("no kernel {kernel_id}")))?;
        cr_to_view(cr, &self.names).map_err(K8sClientError::from)
    }

    async fn delete_by_id(
        &self,
        kernel_id: &str,
        _namespace: Option<&str>,
        _timeout: Option<Duration>,
    ) -> Result<(), K8sClientError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut kernels = self.kernels.lock().expect("lock");
        kernels.retain(|cr| cr["metadata"]["labels"]["jupyter.org/kernel-id"] != kernel_id);
        Ok(())
    }
}

fn test_config() -> Arc<Config> {
    Arc::new(Config {
        port: 8888,
        log_level: "error".to_string(),
        allow_unauthenticated_access: true,
        user_in_header: "X-Forwarded-User".to_string(),
    })
}

fn app_with(client: FakeClient) -> axum::Router {
    app_with_timeout(client, Duration::from_secs(60))
}

fn app_with_timeout(client: FakeClient, ready_timeout: Duration) -> axum::Router {
    let manager = Arc::new(KernelManager::with_ready_timeout(Arc::new(client), ready_timeout));
    let state = AppState::new(manager, test_config());
    build_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.expect("collect body").to_bytes();
    serde_json::from_slice(&bytes).expect("valid json body")
}

#[tokio::test]
async fn create_succeeds() {
    let app = app_with(FakeClient::default());
    let response = app
        .oneshot(
            Request::post("/api/kernels")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"python"}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["name"].as_str().expect("name").starts_with("python-"));
    assert_eq!(body["execution_state"], "idle");
    assert_eq!(body["connections"], 0);
}

#[tokio::test]
async fn create_already_exists() {
    let app = app_with(FakeClient {
        force_exists: true,
        ..Default::default()
    });
    let response = app
        .oneshot(
            Request::post("/api/kernels")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"python","env":{"KERNEL_ID":"XXXXX"}}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["message"].as_str().expect("message").contains("already exists"));
}

#[tokio::test]
async fn create_quota_exceeded() {
    let app = app_with(FakeClient {
        force_quota_exceeded: true,
        ..Default::default()
    });
    let response = app
        .oneshot(
            Request::post("/api/kernels")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"python"}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn get_not_found() {
    let app = app_with(FakeClient::default());
    let response = app
        .oneshot(
            Request::get("/api/kernels/aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_readiness_timeout() {
    let app = app_with_timeout(
        FakeClient {
            never_ready: true,
            ..Default::default()
        },
        Duration::from_secs(1),
    );
    let response = app
        .oneshot(
            Request::post("/api/kernels")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"python"}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn invalid_request_body() {
    let app = app_with(FakeClient::default());
    let response = app
        .oneshot(
            Request::post("/api/kernels")
                .header("content-type", "application/json")
                .body(Body::from("\"invalid json\""))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn batch_delete_issues_one_call_per_id() {
    let client = FakeClient::default();
    for id in ["a-b-c-d-e", "f-g-h-i-j"] {
        let payload = KernelPayload {
            kernel_id: id.to_string(),
            ..Default::default()
        };
        let mut cr = payload_to_cr(&payload, &CrNames::default());
        cr["status"] = serde_json::json!({"phase": "Running"});
        client.kernels.lock().expect("lock").push(cr);
    }

    let manager = Arc::new(KernelManager::new(Arc::new(client)));
    let state = AppState::new(manager.clone(), test_config());
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::delete("/api/kernels")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"kernel_ids":["a-b-c-d-e","f-g-h-i-j"]}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(manager.list(None).await.expect("list").is_empty());
}

#[tokio::test]
async fn batch_delete_rejects_missing_field() {
    let app = app_with(FakeClient::default());
    let response = app
        .oneshot(
            Request::delete("/api/kernels")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"not_kernel_ids": []}"#))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn idempotent_delete_returns_ok_twice() {
    let client = FakeClient::default();
    let payload = KernelPayload {
        kernel_id: "a-b-c-d-e".to_string(),
        ..Default::default()
    };
    let mut cr = payload_to_cr(&payload, &CrNames::default());
    cr["status"] = serde_json::json!({"phase": "Running"});
    client.kernels.lock().expect("lock").push(cr);

    let manager = Arc::new(KernelManager::new(Arc::new(client)));
    let state = AppState::new(manager, test_config());
    let app = build_router(state);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/kernels/a-b-c-d-e")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn swagger_yaml_and_docs_are_served() {
    let app = app_with(FakeClient::default());
    let response = app
        .clone()
        .oneshot(
            Request::get("/api/swagger.yaml")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.expect("collect body").to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("openapi:"));

    let response = app
        .oneshot(Request::get("/api/docs").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.expect("collect body").to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("SwaggerUIBundle"));
}

#[tokio::test]
async fn health_and_kernelspecs() {
    let app = app_with(FakeClient::default());
    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/api/kernelspecs").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!(["python"]));
}
