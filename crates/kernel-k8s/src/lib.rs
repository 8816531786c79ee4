//! Async Kubernetes custom-resource client for kernel CRUD, and the error
//! taxonomy collapsing Kubernetes API failures into client-meaningful kinds.

mod client;
mod error;

pub use client::{DEFAULT_TIMEOUT, K8sCrClient, KernelCrClient};
pub use error::K8sClientError;
