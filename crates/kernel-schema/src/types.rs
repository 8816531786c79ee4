//! The kernel data model: the creation request, its connection info, and
//! the read-side view materialised from a Kubernetes custom resource.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Supported kernel specification names.
///
/// Currently an open set with a single member; new variants are additive
/// and do not change the wire representation of existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelSpecName {
    #[default]
    Python,
}

impl fmt::Display for KernelSpecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
        }
    }
}

impl KernelSpecName {
    /// Every currently supported spec name, for `GET /api/kernelspecs`.
    pub const fn all() -> &'static [KernelSpecName] {
        &[KernelSpecName::Python]
    }
}

/// Kernel-channel endpoints and signing key, as carried in
/// `spec.kernelConnectionConfig` on the custom resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default = "default_shell_port")]
    pub shell_port: u16,
    #[serde(default = "default_iopub_port")]
    pub iopub_port: u16,
    #[serde(default = "default_stdin_port")]
    pub stdin_port: u16,
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    #[serde(default = "default_hb_port")]
    pub hb_port: u16,
    #[serde(default = "new_uuid")]
    pub kernel_id: String,
    #[serde(default = "new_uuid")]
    pub key: String,
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default = "default_signature_scheme")]
    pub signature_scheme: String,
    #[serde(default)]
    pub kernel_name: String,
}

fn default_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_shell_port() -> u16 {
    52318
}
fn default_iopub_port() -> u16 {
    52317
}
fn default_stdin_port() -> u16 {
    52319
}
fn default_control_port() -> u16 {
    52321
}
fn default_hb_port() -> u16 {
    52320
}
fn default_transport() -> String {
    "tcp".to_string()
}
fn default_signature_scheme() -> String {
    "hmac-sha256".to_string()
}
fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            shell_port: default_shell_port(),
            iopub_port: default_iopub_port(),
            stdin_port: default_stdin_port(),
            control_port: default_control_port(),
            hb_port: default_hb_port(),
            kernel_id: new_uuid(),
            key: new_uuid(),
            transport: default_transport(),
            signature_scheme: default_signature_scheme(),
            kernel_name: String::new(),
        }
    }
}

/// The default container image used for a kernel pod when the caller
/// doesn't supply one.
pub const DEFAULT_KERNEL_IMAGE: &str = "zjuici/tablegpt-kernel:0.1.1";

/// The kernel-creation request, and the fields a [`KernelView`] inherits.
///
/// Each field also accepts the `KERNEL_*` environment-style alias it's
/// bound from on `POST /api/kernels`, so the same struct deserializes both
/// a structured request body and the filtered env map built by the HTTP
/// façade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelPayload {
    #[serde(alias = "KERNEL_ID", default = "new_uuid")]
    pub kernel_id: String,

    #[serde(alias = "KERNEL_SPEC_NAME", default)]
    pub kernel_spec_name: KernelSpecName,

    #[serde(alias = "KERNEL_WORKING_DIR", default = "default_working_dir")]
    pub kernel_working_dir: String,

    #[serde(alias = "KERNEL_NAMESPACE", default = "default_namespace")]
    pub kernel_namespace: String,

    #[serde(
        alias = "KERNEL_VOLUMES",
        default,
        deserialize_with = "deserialize_sequence_or_json_string"
    )]
    pub kernel_volumes: Vec<serde_json::Value>,

    #[serde(
        alias = "KERNEL_VOLUME_MOUNTS",
        default,
        deserialize_with = "deserialize_sequence_or_json_string"
    )]
    pub kernel_volume_mounts: Vec<serde_json::Value>,

    #[serde(
        alias = "KERNEL_IDLE_TIMEOUT",
        default = "default_idle_timeout",
        deserialize_with = "deserialize_u64_or_string"
    )]
    pub kernel_idle_timeout: u64,

    #[serde(alias = "KERNEL_IMAGE", default = "default_kernel_image")]
    pub kernel_image: String,

    #[serde(default)]
    pub kernel_connection_info: ConnectionInfo,
}

fn default_working_dir() -> String {
    "/mnt/data".to_string()
}
fn default_namespace() -> String {
    "default".to_string()
}
fn default_idle_timeout() -> u64 {
    3600
}
fn default_kernel_image() -> String {
    DEFAULT_KERNEL_IMAGE.to_string()
}

impl Default for KernelPayload {
    fn default() -> Self {
        Self {
            kernel_id: new_uuid(),
            kernel_spec_name: KernelSpecName::default(),
            kernel_working_dir: default_working_dir(),
            kernel_namespace: default_namespace(),
            kernel_volumes: Vec::new(),
            kernel_volume_mounts: Vec::new(),
            kernel_idle_timeout: default_idle_timeout(),
            kernel_image: default_kernel_image(),
            kernel_connection_info: ConnectionInfo::default(),
        }
    }
}

impl KernelPayload {
    /// Deterministic CR name for this payload: `<spec>-<kernel_id>`.
    pub fn cr_name(&self) -> String {
        format!("{}-{}", self.kernel_spec_name, self.kernel_id)
    }

    /// The `KERNEL_*`-prefixed env entries that survive into the CR
    /// container env, in field declaration order, as `{name, value}`
    /// pairs. Invariant: only keys matching `^KERNEL_` survive (spec.md
    /// §8 invariant 1); `kernel_connection_info` never contributes an
    /// entry since it has no `KERNEL_*` alias.
    pub fn kernel_env_entries(&self) -> Vec<(String, String)> {
        vec![
            ("KERNEL_ID".to_string(), self.kernel_id.clone()),
            (
                "KERNEL_SPEC_NAME".to_string(),
                self.kernel_spec_name.to_string(),
            ),
            (
                "KERNEL_WORKING_DIR".to_string(),
                self.kernel_working_dir.clone(),
            ),
            (
                "KERNEL_NAMESPACE".to_string(),
                self.kernel_namespace.clone(),
            ),
            (
                "KERNEL_VOLUMES".to_string(),
                serde_json::to_string(&self.kernel_volumes).unwrap_or_default(),
            ),
            (
                "KERNEL_VOLUME_MOUNTS".to_string(),
                serde_json::to_string(&self.kernel_volume_mounts).unwrap_or_default(),
            ),
            (
                "KERNEL_IDLE_TIMEOUT".to_string(),
                self.kernel_idle_timeout.to_string(),
            ),
            ("KERNEL_IMAGE".to_string(), self.kernel_image.clone()),
        ]
    }
}

/// The read model returned by list/get: a [`KernelPayload`] plus
/// server-observed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelView {
    #[serde(flatten)]
    pub payload: KernelPayload,
    pub kernel_name: String,
    pub kernel_namespace: String,
    pub kernel_last_activity_time: Option<String>,
    pub ready: bool,
}

/// Build a JSON array-or-string deserializer: accepts either a structured
/// sequence or a JSON-encoded string of one (spec.md §3 invariant 6). Any
/// other shape, including a JSON string that doesn't decode to an array,
/// is rejected.
fn deserialize_sequence_or_json_string<'de, D>(
    deserializer: D,
) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SequenceOrString {
        Sequence(Vec<serde_json::Value>),
        String(String),
    }

    match SequenceOrString::deserialize(deserializer)? {
        SequenceOrString::Sequence(items) => Ok(items),
        SequenceOrString::String(s) => {
            let value: serde_json::Value = serde_json::from_str(&s).map_err(|e| {
                D::Error::custom(format!("must be a valid JSON string when not a list: {e}"))
            })?;
            match value {
                serde_json::Value::Array(items) => Ok(items),
                _ => Err(D::Error::custom(
                    "JSON-encoded string must decode to an array",
                )),
            }
        }
    }
}

fn deserialize_u64_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .parse()
            .map_err(|e| D::Error::custom(format!("not a valid integer: {e}"))),
    }
}

/// A JSON request body for `POST /api/kernels`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateKernelRequest {
    #[serde(default)]
    pub name: KernelSpecName,
    #[serde(default)]
    pub env: HashMap<String, serde_json::Value>,
}

/// A JSON request body for `DELETE /api/kernels` (batch delete).
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteKernelsRequest {
    pub kernel_ids: Vec<String>,
}

/// The JSON shape returned for a kernel by create/list/get (spec.md §4.5).
#[derive(Debug, Clone, Serialize)]
pub struct KernelResponse {
    pub id: String,
    pub name: String,
    pub last_activity: Option<String>,
    pub execution_state: &'static str,
    pub connections: u32,
}

impl From<&KernelView> for KernelResponse {
    fn from(view: &KernelView) -> Self {
        Self {
            id: view.payload.kernel_id.clone(),
            name: view.kernel_name.clone(),
            last_activity: view.kernel_last_activity_time.clone(),
            execution_state: if view.ready { "idle" } else { "starting" },
            connections: 0,
        }
    }
}
