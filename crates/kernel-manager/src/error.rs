use kernel_k8s::K8sClientError;

/// Errors surfaced by the kernel manager: the Kubernetes client's taxonomy,
/// plus the manager's own readiness-timeout kind (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error(transparent)]
    K8sClient(#[from] K8sClientError),

    #[error("Kernel {kernel_id} in namespace {namespace} is not ready")]
    KernelWaitReadyTimeoutError { kernel_id: String, namespace: String },
}
