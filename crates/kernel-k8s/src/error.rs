use kernel_schema::SchemaMappingError;

/// The failure taxonomy this crate collapses heterogeneous Kubernetes API
/// errors into (spec.md §7). One enum per crate boundary, matching the
/// teacher's error style, rather than a type per kind.
#[derive(Debug, thiserror::Error)]
pub enum K8sClientError {
    #[error("failed to initialise Kubernetes client: {0}")]
    InitError(String),

    #[error("Kernel already exists: {0}")]
    KernelExistsError(String),

    #[error("Kernel creation is forbidden. Resource quota exceeded: {0}")]
    KernelResourceQuotaExceededError(String),

    #[error("Kernel creation is forbidden: {0}")]
    KernelForbiddenError(String),

    #[error("Error creating kernel: {0}")]
    KernelCreationError(String),

    #[error("Error getting kernel: {0}")]
    KernelRetrieveError(String),

    #[error("Kernel not found: {0}")]
    KernelNotFoundError(String),

    #[error("Error deleting kernel: {0}")]
    KernelDeleteError(String),

    #[error("CR mapping failed: {0}")]
    SchemaMapping(#[from] SchemaMappingError),
}

/// The substring a 403 response body must contain to be classified as
/// quota exhaustion rather than a generic permission failure (spec.md
/// §4.2, §9 Open Questions — the substring-match variant is adopted).
const QUOTA_EXCEEDED_MARKER: &str = "exceeded quota";

/// Classify a `kube::Error` encountered during CR creation.
pub(crate) fn classify_create_error(err: kube::Error) -> K8sClientError {
    match status_of(&err) {
        Some((409, _)) => K8sClientError::KernelExistsError(err.to_string()),
        Some((403, message)) if message.contains(QUOTA_EXCEEDED_MARKER) => {
            K8sClientError::KernelResourceQuotaExceededError(err.to_string())
        }
        Some((403, _)) => K8sClientError::KernelForbiddenError(err.to_string()),
        _ => K8sClientError::KernelCreationError(err.to_string()),
    }
}

pub(crate) fn classify_retrieve_error(err: kube::Error) -> K8sClientError {
    K8sClientError::KernelRetrieveError(err.to_string())
}

pub(crate) fn classify_delete_error(err: kube::Error) -> K8sClientError {
    K8sClientError::KernelDeleteError(err.to_string())
}

fn status_of(err: &kube::Error) -> Option<(u16, &str)> {
    match err {
        kube::Error::Api(status) => Some((status.code, status.message.as_str())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16, message: &str) -> kube::Error {
        kube::Error::Api(Box::new(kube::core::Status {
            status: None,
            code,
            message: message.to_string(),
            metadata: None,
            reason: String::new(),
            details: None,
        }))
    }

    #[test]
    fn conflict_maps_to_exists() {
        let classified = classify_create_error(api_error(409, "already exists"));
        assert!(matches!(classified, K8sClientError::KernelExistsError(_)));
    }

    #[test]
    fn forbidden_with_quota_marker_maps_to_quota_exceeded() {
        let classified =
            classify_create_error(api_error(403, "forbidden: exceeded quota: pods=10"));
        assert!(matches!(
            classified,
            K8sClientError::KernelResourceQuotaExceededError(_)
        ));
    }

    #[test]
    fn forbidden_without_quota_marker_maps_to_forbidden() {
        let classified = classify_create_error(api_error(403, "forbidden"));
        assert!(matches!(classified, K8sClientError::KernelForbiddenError(_)));
    }

    #[test]
    fn other_status_maps_to_creation_error() {
        let classified = classify_create_error(api_error(500, "internal error"));
        assert!(matches!(classified, K8sClientError::KernelCreationError(_)));
    }
}
