use std::time::{Duration, Instant};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kernel_schema::{CrNames, KernelPayload, KernelView, cr_to_view, payload_to_cr};
use kube::api::{Api, DeleteParams, DynamicObject, GroupVersionKind, ListParams, PostParams};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use tracing::{debug, warn};

use crate::error::{K8sClientError, classify_create_error, classify_delete_error, classify_retrieve_error};

/// The default per-call timeout, applied when a caller doesn't request
/// one explicitly (spec.md §4.2).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The operations the kernel manager needs from a Kubernetes-backed kernel
/// store. A trait so tests can substitute a fake implementation instead of
/// a real cluster (spec.md §9).
#[async_trait]
pub trait KernelCrClient: Send + Sync {
    /// `timeout` overrides the client's default for this call only
    /// (spec.md "each external call carries an explicit timeout ...
    /// overridable per call"); `None` falls back to that default.
    async fn create(
        &self,
        payload: &KernelPayload,
        timeout: Option<Duration>,
    ) -> Result<(), K8sClientError>;
    async fn list(
        &self,
        namespace: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Vec<KernelView>, K8sClientError>;
    async fn get_by_id(
        &self,
        kernel_id: &str,
        namespace: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<KernelView, K8sClientError>;
    async fn delete_by_id(
        &self,
        kernel_id: &str,
        namespace: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<(), K8sClientError>;
}

/// A [`KernelCrClient`] backed by a real Kubernetes API server, addressing
/// the `Kernel` custom resource through a [`kube::discovery::ApiResource`]
/// built from configurable group/version/kind/plural names rather than a
/// statically derived type, since those names are a construction-time
/// parameter (spec.md §6).
pub struct K8sCrClient {
    client: Client,
    resource: ApiResource,
    names: CrNames,
    timeout: Duration,
}

impl K8sCrClient {
    /// Build a client, trying in-cluster credentials first and falling
    /// back to the local kubeconfig. Both failure paths collapse into a
    /// single initialisation error (spec.md §4.2 "Config resolution").
    pub async fn try_new(names: CrNames) -> Result<Self, K8sClientError> {
        Self::try_new_with_timeout(names, DEFAULT_TIMEOUT).await
    }

    pub async fn try_new_with_timeout(
        names: CrNames,
        timeout: Duration,
    ) -> Result<Self, K8sClientError> {
        let config = match Config::incluster() {
            Ok(config) => config,
            Err(in_cluster_err) => {
                warn!(error = %in_cluster_err, "failed to load in-cluster config, trying kubeconfig");
                Config::infer()
                    .await
                    .map_err(|e| K8sClientError::InitError(e.to_string()))?
            }
        };
        let client =
            Client::try_from(config).map_err(|e| K8sClientError::InitError(e.to_string()))?;

        let gvk = GroupVersionKind::gvk(&names.group, &names.version, &names.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &names.plural);

        Ok(Self {
            client,
            resource,
            names,
            timeout,
        })
    }

    fn api(&self, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &self.resource),
            None => Api::all_with(self.client.clone(), &self.resource),
        }
    }

    fn label_selector(&self, kernel_id: &str) -> String {
        format!("{}/kernel-id={kernel_id}", self.names.group)
    }

    fn effective_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.timeout)
    }
}

#[async_trait]
impl KernelCrClient for K8sCrClient {
    async fn create(
        &self,
        payload: &KernelPayload,
        timeout: Option<Duration>,
    ) -> Result<(), K8sClientError> {
        let started = Instant::now();
        let doc = payload_to_cr(payload, &self.names);
        let object: DynamicObject =
            serde_json::from_value(doc).map_err(|e| K8sClientError::KernelCreationError(e.to_string()))?;

        let api = self.api(Some(&payload.kernel_namespace));
        let result = tokio::time::timeout(
            self.effective_timeout(timeout),
            api.create(&PostParams::default(), &object),
        )
        .await;

        debug!(
            kernel_id = %payload.kernel_id,
            namespace = %payload.kernel_namespace,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "create"
        );

        match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(classify_create_error(e)),
            Err(_) => Err(K8sClientError::KernelCreationError(
                "timed out waiting for Kubernetes API".to_string(),
            )),
        }
    }

    async fn list(
        &self,
        namespace: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Vec<KernelView>, K8sClientError> {
        let started = Instant::now();
        let api = self.api(namespace);
        let result = tokio::time::timeout(self.effective_timeout(timeout), api.list(&ListParams::default())).await;

        debug!(
            namespace = ?namespace,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "list"
        );

        let objects = match result {
            Ok(Ok(objects)) => objects,
            Ok(Err(e)) => return Err(classify_retrieve_error(e)),
            Err(_) => {
                return Err(K8sClientError::KernelRetrieveError(
                    "timed out waiting for Kubernetes API".to_string(),
                ));
            }
        };

        objects
            .items
            .into_iter()
            .map(|object| cr_to_view(&object_to_json(&object), &self.names).map_err(K8sClientError::from))
            .collect()
    }

    async fn get_by_id(
        &self,
        kernel_id: &str,
        namespace: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<KernelView, K8sClientError> {
        let started = Instant::now();
        let api = self.api(namespace);
        let params = ListParams::default()
            .labels(&self.label_selector(kernel_id))
            .limit(1);
        let result = tokio::time::timeout(self.effective_timeout(timeout), api.list(&params)).await;

        debug!(
            %kernel_id,
            namespace = ?namespace,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "get_by_id"
        );

        let objects = match result {
            Ok(Ok(objects)) => objects,
            Ok(Err(e)) => return Err(classify_retrieve_error(e)),
            Err(_) => {
                return Err(K8sClientError::KernelRetrieveError(
                    "timed out waiting for Kubernetes API".to_string(),
                ));
            }
        };

        let Some(object) = objects.items.into_iter().next() else {
            return Err(K8sClientError::KernelNotFoundError(format!(
                "Could not find kernel with id {kernel_id}"
            )));
        };

        cr_to_view(&object_to_json(&object), &self.names).map_err(K8sClientError::from)
    }

    async fn delete_by_id(
        &self,
        kernel_id: &str,
        namespace: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<(), K8sClientError> {
        let kernel = match self.get_by_id(kernel_id, namespace, timeout).await {
            Ok(kernel) => kernel,
            Err(K8sClientError::KernelNotFoundError(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        let started = Instant::now();
        let api = self.api(Some(&kernel.kernel_namespace));
        let result = tokio::time::timeout(
            self.effective_timeout(timeout),
            api.delete(&kernel.kernel_name, &DeleteParams::default()),
        )
        .await;

        debug!(
            %kernel_id,
            namespace = %kernel.kernel_namespace,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "delete_by_id"
        );

        match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(classify_delete_error(e)),
            Err(_) => Err(K8sClientError::KernelDeleteError(
                "timed out waiting for Kubernetes API".to_string(),
            )),
        }
    }
}

fn object_to_json(object: &DynamicObject) -> serde_json::Value {
    let mut value = serde_json::to_value(object).unwrap_or(serde_json::Value::Null);
    // `DynamicObject` doesn't carry `creationTimestamp` as a typed field;
    // Kubernetes returns it under `metadata` like any other server-set field.
    if let Some(metadata) = value.get_mut("metadata")
        && let ObjectMeta {
            creation_timestamp: Some(ts),
            ..
        } = &object.metadata
    {
        metadata["creationTimestamp"] = serde_json::Value::String(ts.0.to_string());
    }
    value
}
