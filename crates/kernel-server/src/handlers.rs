//! HTTP façade (C5): binds the REST endpoints in spec.md §4.5 to the
//! kernel manager, translating between the external JSON payload and the
//! internal [`KernelPayload`]/[`KernelView`] model.

use std::sync::LazyLock;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use futures::future::join_all;
use kernel_k8s::K8sClientError;
use kernel_schema::{CreateKernelRequest, DeleteKernelsRequest, KernelResponse, KernelSpecName};
use regex::Regex;

use crate::error::AppError;
use crate::routes::AppState;

/// The path-parameter shape the router enforces for a kernel id: five
/// dash-separated `\w+` tokens (spec.md §4.5 "Kernel id URL pattern").
static KERNEL_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+-\w+-\w+-\w+-\w+$").expect("valid regex"));

pub fn kernel_id_is_well_formed(id: &str) -> bool {
    KERNEL_ID_PATTERN.is_match(id)
}

fn require_well_formed_id(id: &str) -> Result<(), AppError> {
    if kernel_id_is_well_formed(id) {
        Ok(())
    } else {
        Err(AppError::MalformedKernelId(id.to_string()))
    }
}

/// `GET /health`.
pub async fn health() -> &'static str {
    "OK"
}

/// `GET /api/kernelspecs`.
pub async fn kernel_specs() -> Json<Vec<String>> {
    Json(KernelSpecName::all().iter().map(ToString::to_string).collect())
}

/// `GET /api/kernels`.
pub async fn list_kernels(State(state): State<AppState>) -> Result<Json<Vec<KernelResponse>>, AppError> {
    let kernels = state.manager.list(None).await?;
    Ok(Json(kernels.iter().map(KernelResponse::from).collect()))
}

/// `POST /api/kernels`: filter the request body's env to `KERNEL_*` keys,
/// overlay `KERNEL_SPEC_NAME` from the top-level `name`, validate the
/// result against [`KernelPayload`], then create and wait for readiness
/// (spec.md §4.5 "POST input filtering").
pub async fn create_kernel(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<KernelResponse>, AppError> {
    let request: CreateKernelRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?;

    let mut fields: serde_json::Map<String, serde_json::Value> = request
        .env
        .into_iter()
        .filter(|(key, _)| key.starts_with("KERNEL_"))
        .collect();
    fields.insert(
        "KERNEL_SPEC_NAME".to_string(),
        serde_json::Value::String(request.name.to_string()),
    );

    let payload = serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let view = state.manager.start(&payload, true).await?;
    Ok(Json(KernelResponse::from(&view)))
}

/// `GET /api/kernels/{id}`. A kernel that exists but isn't ready yet is
/// rendered the same as not-found, matching the teacher's upstream
/// behaviour of treating "not ready" as absent on this read path (the
/// channels endpoint, by contrast, surfaces "not ready" as a 500 —
/// spec.md §4.7).
pub async fn get_kernel(
    State(state): State<AppState>,
    Path(kernel_id): Path<String>,
) -> Result<Json<KernelResponse>, AppError> {
    require_well_formed_id(&kernel_id)?;

    match state.manager.get(&kernel_id, None).await? {
        Some(view) => Ok(Json(KernelResponse::from(&view))),
        None => Err(AppError::from(K8sClientError::KernelNotFoundError(format!(
            "Kernel not found: {kernel_id}"
        )))),
    }
}

/// `DELETE /api/kernels/{id}`. Idempotent: a delete on a non-existent or
/// already-deleted kernel still returns success (spec.md §4.2, §8).
pub async fn delete_kernel(
    State(state): State<AppState>,
    Path(kernel_id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_well_formed_id(&kernel_id)?;
    state.manager.remove(&kernel_id, None).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /api/kernels` (batch delete): deletes run concurrently and the
/// response waits for all to complete (spec.md §4.5, §5).
pub async fn delete_kernels_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let request: DeleteKernelsRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::BatchValidation(e.to_string()))?;

    let results = join_all(
        request
            .kernel_ids
            .iter()
            .map(|id| state.manager.remove(id, None)),
    )
    .await;

    for result in results {
        result?;
    }

    Ok(StatusCode::OK)
}
