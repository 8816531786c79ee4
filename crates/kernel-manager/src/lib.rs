//! Orchestrates the Kubernetes CR client and the readiness poller behind
//! the operations the HTTP façade invokes.

mod error;
mod manager;
mod readiness;

pub use error::ManagerError;
pub use manager::{DEFAULT_READY_TIMEOUT, KernelManager};
pub use readiness::wait;
