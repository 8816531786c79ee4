//! Bidirectional, pure mapping between [`KernelPayload`]/[`KernelView`] and
//! the JSON shape of the Kubernetes `Kernel` custom resource.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Value, json};

use crate::types::{ConnectionInfo, KernelPayload, KernelView};

/// A mapping failure: the CR document is missing a field this mapper
/// requires, or carries one in a shape it can't parse. The mapper never
/// performs I/O and never partially populates a [`KernelView`] on error.
#[derive(Debug, thiserror::Error)]
pub enum SchemaMappingError {
    #[error("CR document is missing required label {0:?}")]
    MissingLabel(String),
    #[error("CR document is missing required field {0:?}")]
    MissingField(String),
    #[error("CR field {field:?} has an unexpected shape: {reason}")]
    MalformedField { field: String, reason: String },
}

/// The names this mapper uses to address the Kubernetes custom resource,
/// configurable at construction (spec.md §6).
#[derive(Debug, Clone)]
pub struct CrNames {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
}

impl Default for CrNames {
    fn default() -> Self {
        Self {
            group: "jupyter.org".to_string(),
            version: "v1".to_string(),
            kind: "Kernel".to_string(),
            plural: "kernels".to_string(),
        }
    }
}

impl CrNames {
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }

    fn label_kernel_id(&self) -> String {
        format!("{}/kernel-id", self.group)
    }

    fn label_manager_name(&self) -> String {
        format!("{}/kernelmanager-name", self.group)
    }

    fn label_spec_name(&self) -> String {
        format!("{}/kernel-spec-name", self.group)
    }

    fn annotation_last_activity_time(&self) -> String {
        format!("{}/kernel-last-activity-time", self.group)
    }
}

/// Culling-interval seconds carried on every CR, fixed per spec.md §4.1.
const CULLING_INTERVAL_SECONDS: u64 = 60;

/// Build the Kubernetes CR document for a kernel creation request.
pub fn payload_to_cr(payload: &KernelPayload, names: &CrNames) -> Value {
    let cr_name = payload.cr_name();
    let env: Vec<Value> = payload
        .kernel_env_entries()
        .into_iter()
        .map(|(name, value)| json!({"name": name, "value": value}))
        .collect();

    json!({
        "apiVersion": names.api_version(),
        "kind": names.kind,
        "metadata": {
            "name": cr_name,
            "namespace": payload.kernel_namespace,
            "labels": {
                names.label_kernel_id(): payload.kernel_id,
                names.label_manager_name(): cr_name,
                names.label_spec_name(): payload.kernel_spec_name.to_string(),
            },
        },
        "spec": {
            "idleTimeoutSeconds": payload.kernel_idle_timeout,
            "cullingIntervalSeconds": CULLING_INTERVAL_SECONDS,
            "kernelConnectionConfig": connection_info_to_json(&payload.kernel_connection_info),
            "template": {
                "spec": {
                    "containers": [{
                        "name": "ipykernel",
                        "image": payload.kernel_image,
                        "workingDir": payload.kernel_working_dir,
                        "volumeMounts": payload.kernel_volume_mounts,
                        "command": ["python", "-m", "ipykernel", "-f", "$(KERNEL_CONNECTION_FILE_PATH)"],
                        "env": env,
                    }],
                    "volumes": payload.kernel_volumes,
                    "restartPolicy": "Never",
                },
            },
        },
    })
}

fn connection_info_to_json(info: &ConnectionInfo) -> Value {
    serde_json::to_value(info).unwrap_or(Value::Null)
}

/// Parse a Kubernetes CR document into a [`KernelView`].
///
/// Pure: performs no I/O, and returns an error rather than a partially
/// populated view when a required field is missing or malformed.
pub fn cr_to_view(cr: &Value, names: &CrNames) -> Result<KernelView, SchemaMappingError> {
    let metadata = cr
        .get("metadata")
        .ok_or_else(|| SchemaMappingError::MissingField("metadata".to_string()))?;

    let kernel_id = metadata
        .get("labels")
        .and_then(|labels| labels.get(names.label_kernel_id()))
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaMappingError::MissingLabel(names.label_kernel_id()))?
        .to_string();

    let kernel_name = metadata
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaMappingError::MissingField("metadata.name".to_string()))?
        .to_string();

    let kernel_namespace = metadata
        .get("namespace")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaMappingError::MissingField("metadata.namespace".to_string()))?
        .to_string();

    let kernel_spec_name_raw = metadata
        .get("labels")
        .and_then(|labels| labels.get(names.label_spec_name()))
        .and_then(Value::as_str)
        .unwrap_or("python");
    let kernel_spec_name = serde_json::from_value(Value::String(kernel_spec_name_raw.to_string()))
        .map_err(|e| SchemaMappingError::MalformedField {
            field: names.label_spec_name(),
            reason: e.to_string(),
        })?;

    let spec = cr
        .get("spec")
        .ok_or_else(|| SchemaMappingError::MissingField("spec".to_string()))?;

    let kernel_idle_timeout = spec
        .get("idleTimeoutSeconds")
        .and_then(Value::as_u64)
        .ok_or_else(|| SchemaMappingError::MissingField("spec.idleTimeoutSeconds".to_string()))?;

    let mut kernel_connection_info: ConnectionInfo = spec
        .get("kernelConnectionConfig")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| SchemaMappingError::MalformedField {
            field: "spec.kernelConnectionConfig".to_string(),
            reason: e.to_string(),
        })?
        .unwrap_or_default();

    let status = cr.get("status");

    if let Some(ip) = status.and_then(|s| s.get("ip")).and_then(Value::as_str) {
        kernel_connection_info.ip = ip.to_string();
    }

    let ready = status
        .and_then(|s| s.get("phase"))
        .and_then(Value::as_str)
        .map(|phase| phase == "Running")
        .unwrap_or(false);

    let container = spec
        .pointer("/template/spec/containers/0")
        .ok_or_else(|| {
            SchemaMappingError::MissingField("spec.template.spec.containers[0]".to_string())
        })?;

    let kernel_image = container
        .get("image")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kernel_working_dir = container
        .get("workingDir")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kernel_volume_mounts = container
        .get("volumeMounts")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let kernel_volumes = spec
        .pointer("/template/spec/volumes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let kernel_last_activity_time = last_activity_time(cr, metadata, names)?;

    let payload = KernelPayload {
        kernel_id,
        kernel_spec_name,
        kernel_working_dir,
        kernel_namespace: kernel_namespace.clone(),
        kernel_volumes,
        kernel_volume_mounts,
        kernel_idle_timeout,
        kernel_image,
        kernel_connection_info,
    };

    Ok(KernelView {
        payload,
        kernel_name,
        kernel_namespace,
        kernel_last_activity_time,
        ready,
    })
}

/// The exact timestamp format the original annotation is stamped in:
/// `YYYY-MM-DD HH:MM:SS.ffffff`, always UTC.
const LAST_ACTIVITY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn last_activity_time(
    cr: &Value,
    metadata: &Value,
    names: &CrNames,
) -> Result<Option<String>, SchemaMappingError> {
    if let Some(raw) = metadata
        .get("annotations")
        .and_then(|a| a.get(names.annotation_last_activity_time()))
        .and_then(Value::as_str)
    {
        let parsed = NaiveDateTime::parse_from_str(raw, LAST_ACTIVITY_FORMAT).map_err(|e| {
            SchemaMappingError::MalformedField {
                field: names.annotation_last_activity_time(),
                reason: e.to_string(),
            }
        })?;
        let utc = DateTime::<Utc>::from_naive_utc_and_offset(parsed, Utc);
        return Ok(Some(utc.to_rfc3339()));
    }

    Ok(cr
        .pointer("/metadata/creationTimestamp")
        .and_then(Value::as_str)
        .map(str::to_string))
}
