use std::time::{Duration, Instant};

use kernel_k8s::{K8sClientError, KernelCrClient};
use tracing::debug;

/// Poll cadence for readiness checks (spec.md §4.3).
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll `client.getById` at a fixed cadence until the kernel reports
/// `ready=true` or `timeout` elapses. Has no shared state; the caller owns
/// cancellation.
///
/// Transient retrieval errors are fatal to the wait and propagated as-is —
/// the caller (the HTTP façade) classifies them.
pub async fn wait(
    client: &dyn KernelCrClient,
    kernel_id: &str,
    namespace: &str,
    timeout: Duration,
) -> Result<bool, K8sClientError> {
    let started = Instant::now();
    loop {
        let view = client.get_by_id(kernel_id, Some(namespace), None).await?;
        if view.ready {
            debug!(%kernel_id, namespace, "kernel became ready");
            return Ok(true);
        }
        if started.elapsed() > timeout {
            debug!(%kernel_id, namespace, "kernel readiness wait timed out");
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
