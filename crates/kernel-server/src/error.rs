use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel_k8s::K8sClientError;
use kernel_manager::ManagerError;
use kernel_schema::SchemaMappingError;
use serde::Serialize;

/// The error envelope every non-2xx JSON response carries (spec.md §4.5).
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub reason: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

/// Façade-level errors, mapped to HTTP status per spec.md §7.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("request validation failed: {0}")]
    Validation(String),

    #[error("request body is invalid: {0}")]
    BatchValidation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("kernel id {0:?} does not match the expected shape")]
    MalformedKernelId(String),
}

impl From<K8sClientError> for AppError {
    fn from(err: K8sClientError) -> Self {
        AppError::Manager(ManagerError::from(err))
    }
}

impl From<SchemaMappingError> for AppError {
    fn from(err: SchemaMappingError) -> Self {
        AppError::Manager(ManagerError::from(K8sClientError::from(err)))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, reason, message) = classify(&self);
        let body = ErrorBody {
            reason,
            message,
            traceback: None,
        };
        (status, Json(body)).into_response()
    }
}

fn classify(err: &AppError) -> (StatusCode, &'static str, String) {
    match err {
        AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "ValidationError", msg.clone()),
        AppError::BatchValidation(msg) => (StatusCode::BAD_REQUEST, "ValidationError", msg.clone()),
        AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "Forbidden", msg.clone()),
        AppError::MalformedKernelId(id) => (
            StatusCode::NOT_FOUND,
            "KernelNotFoundError",
            format!("Kernel not found: {id}"),
        ),
        AppError::Manager(ManagerError::KernelWaitReadyTimeoutError { kernel_id, namespace }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "KernelWaitReadyTimeoutError",
            format!("Kernel {kernel_id} in namespace {namespace} is not ready"),
        ),
        AppError::Manager(ManagerError::K8sClient(k8s_err)) => classify_k8s(k8s_err),
    }
}

fn classify_k8s(err: &K8sClientError) -> (StatusCode, &'static str, String) {
    match err {
        K8sClientError::KernelExistsError(msg) => (StatusCode::CONFLICT, "KernelExistsError", msg.clone()),
        K8sClientError::KernelResourceQuotaExceededError(msg) => {
            (StatusCode::FORBIDDEN, "KernelResourceQuotaExceededError", msg.clone())
        }
        K8sClientError::KernelForbiddenError(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "KernelForbiddenError", msg.clone())
        }
        K8sClientError::KernelCreationError(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "KernelCreationError", msg.clone())
        }
        K8sClientError::KernelRetrieveError(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "KernelRetrieveError", msg.clone())
        }
        K8sClientError::KernelNotFoundError(msg) => (StatusCode::NOT_FOUND, "KernelNotFoundError", msg.clone()),
        K8sClientError::KernelDeleteError(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "KernelDeleteError", msg.clone())
        }
        K8sClientError::InitError(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "InitError", msg.clone())
        }
        K8sClientError::SchemaMapping(err) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "SchemaMappingError", err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_maps_to_403() {
        let err = AppError::from(K8sClientError::KernelResourceQuotaExceededError("x".to_string()));
        let (status, reason, _) = classify(&err);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(reason, "KernelResourceQuotaExceededError");
    }

    #[test]
    fn other_forbidden_maps_to_500() {
        let err = AppError::from(K8sClientError::KernelForbiddenError("x".to_string()));
        let (status, _, _) = classify(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn exists_maps_to_409() {
        let err = AppError::from(K8sClientError::KernelExistsError("x".to_string()));
        let (status, _, _) = classify(&err);
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::from(K8sClientError::KernelNotFoundError("x".to_string()));
        let (status, _, _) = classify(&err);
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
