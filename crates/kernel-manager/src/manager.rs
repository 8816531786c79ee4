use std::sync::Arc;
use std::time::Duration;

use kernel_k8s::{K8sClientError, KernelCrClient};
use kernel_schema::{KernelPayload, KernelView};
use tracing::warn;

use crate::error::ManagerError;
use crate::readiness;

/// Default bound for the readiness wait when a caller doesn't specify one.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Orchestrates C1-C3 behind the operations the HTTP façade invokes.
/// Holds no cache: Kubernetes is the sole source of truth, and every read
/// goes through `client` (spec.md §4.4).
pub struct KernelManager {
    client: Arc<dyn KernelCrClient>,
    ready_timeout: Duration,
}

impl KernelManager {
    pub fn new(client: Arc<dyn KernelCrClient>) -> Self {
        Self {
            client,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    pub fn with_ready_timeout(client: Arc<dyn KernelCrClient>, ready_timeout: Duration) -> Self {
        Self {
            client,
            ready_timeout,
        }
    }

    /// Create a kernel, optionally waiting for it to become ready, and
    /// return the canonical view re-read from Kubernetes.
    pub async fn start(
        &self,
        payload: &KernelPayload,
        wait_for_ready: bool,
    ) -> Result<KernelView, ManagerError> {
        self.client.create(payload, None).await?;

        if wait_for_ready {
            let ready = readiness::wait(
                self.client.as_ref(),
                &payload.kernel_id,
                &payload.kernel_namespace,
                self.ready_timeout,
            )
            .await?;
            if !ready {
                return Err(ManagerError::KernelWaitReadyTimeoutError {
                    kernel_id: payload.kernel_id.clone(),
                    namespace: payload.kernel_namespace.clone(),
                });
            }
        }

        Ok(self
            .client
            .get_by_id(&payload.kernel_id, Some(&payload.kernel_namespace), None)
            .await?)
    }

    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<KernelView>, ManagerError> {
        Ok(self.client.list(namespace, None).await?)
    }

    /// Returns `None` when the kernel exists but isn't ready yet; the
    /// caller renders that as "not ready" rather than "not found".
    pub async fn get(
        &self,
        kernel_id: &str,
        namespace: Option<&str>,
    ) -> Result<Option<KernelView>, ManagerError> {
        let view = self.client.get_by_id(kernel_id, namespace, None).await?;
        Ok(if view.ready { Some(view) } else { None })
    }

    /// Best-effort delete: a `KernelDeleteError` is swallowed since retries
    /// are the operator's responsibility. Other errors (e.g. a retrieval
    /// failure while resolving the CR name) still propagate.
    pub async fn remove(
        &self,
        kernel_id: &str,
        namespace: Option<&str>,
    ) -> Result<(), ManagerError> {
        match self.client.delete_by_id(kernel_id, namespace, None).await {
            Ok(()) => Ok(()),
            Err(K8sClientError::KernelDeleteError(msg)) => {
                warn!(%kernel_id, error = %msg, "swallowing best-effort kernel delete failure");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn shutdown_all(&self, namespace: Option<&str>) -> Result<(), ManagerError> {
        let kernels = self.list(namespace).await?;
        for kernel in kernels {
            self.remove(&kernel.payload.kernel_id, namespace).await?;
        }
        Ok(())
    }
}
