//! Canonical (`tekton.dev/v1`) shape of a TaskRun as stored in the results
//! store. Every stored schema version is converted into these types before
//! anything else looks at it.

pub mod v1beta1;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub const LAST_APPLIED_CONFIG_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRun {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TaskRunSpec,
    #[serde(default)]
    pub status: TaskRunStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunSpec {
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub task_ref: Option<TaskRef>,
    #[serde(default)]
    pub service_account_name: String,
    #[serde(default)]
    pub timeout: Option<Timeout>,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceBinding>,
    #[serde(default)]
    pub step_specs: Vec<StepSpec>,
    #[serde(default)]
    pub sidecar_specs: Vec<StepSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub resolver: Option<String>,
    #[serde(default)]
    pub params: Vec<Param>,
}

/// Per-step (or per-sidecar) resource override.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    pub name: String,
    #[serde(default)]
    pub compute_resources: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub value: ParamValue,
}

impl Param {
    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: ParamValue::String(value.to_string()),
        }
    }
}

/// A parameter or result value: a plain string, a list, or a keyed map.
///
/// Decoding never fails. `null` becomes an empty string, and any value that
/// is not a string, a list of strings or a map of strings is kept as its
/// JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Array(Vec<String>),
    Object(BTreeMap<String, String>),
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::String(String::new())
    }
}

/// String form of a list item or map value; `null` reads as empty.
fn string_item(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => Some(String::new()),
        _ => None,
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::String(s) => ParamValue::String(s),
            Value::Null => ParamValue::String(String::new()),
            Value::Array(ref items) => match items.iter().map(string_item).collect::<Option<Vec<_>>>() {
                Some(items) => ParamValue::Array(items),
                None => ParamValue::String(value.to_string()),
            },
            Value::Object(ref map) => {
                let entries: Option<BTreeMap<String, String>> = map
                    .iter()
                    .map(|(k, v)| string_item(v).map(|v| (k.clone(), v)))
                    .collect();
                match entries {
                    Some(entries) => ParamValue::Object(entries),
                    None => ParamValue::String(value.to_string()),
                }
            }
            other => ParamValue::String(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(ParamValue::from)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::String(s) => write!(f, "{}", s),
            ParamValue::Array(items) => write!(f, "[{}]", items.join(" ")),
            ParamValue::Object(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
                write!(f, "map[{}]", pairs.join(" "))
            }
        }
    }
}

/// Run timeout, stored as a duration string such as `1h0m0s`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeout(pub Duration);

impl Timeout {
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl<'de> Deserialize<'de> for Timeout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw)
            .map(Timeout)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", raw)))
    }
}

/// Parses the `<number><unit>...` duration notation used by the stored
/// objects (`90s`, `1h30m`, `1.5h`, `250ms`). Negative durations are
/// clamped to zero.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let s = raw.trim();
    let (negative, mut rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return None;
        }
        let number: f64 = rest[..num_end].parse().ok()?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return None,
        };
        rest = &rest[unit_end..];
        total_nanos += number * scale;
    }

    if negative {
        return Some(Duration::ZERO);
    }
    Some(Duration::from_nanos(total_nanos.round() as u64))
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceBinding {
    pub name: String,
    pub sub_path: String,
    pub source: Option<WorkspaceSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceSource {
    VolumeClaimTemplate,
    PersistentVolumeClaim { claim_name: String },
    EmptyDir { medium: String },
    ConfigMap { name: String, items: Vec<KeyToPath> },
    Secret { secret_name: String, items: Vec<KeyToPath> },
    Projected,
    Csi { driver: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeyToPath {
    pub key: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorkspaceBinding {
    name: String,
    #[serde(default)]
    sub_path: String,
    #[serde(default)]
    volume_claim_template: Option<serde_json::Value>,
    #[serde(default)]
    persistent_volume_claim: Option<RawClaim>,
    #[serde(default)]
    empty_dir: Option<RawEmptyDir>,
    #[serde(default)]
    config_map: Option<RawConfigMap>,
    #[serde(default)]
    secret: Option<RawSecret>,
    #[serde(default)]
    projected: Option<serde_json::Value>,
    #[serde(default)]
    csi: Option<RawCsi>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaim {
    #[serde(default)]
    claim_name: String,
}

#[derive(Deserialize)]
struct RawEmptyDir {
    #[serde(default)]
    medium: String,
}

#[derive(Deserialize)]
struct RawConfigMap {
    #[serde(default)]
    name: String,
    #[serde(default)]
    items: Vec<KeyToPath>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSecret {
    #[serde(default)]
    secret_name: String,
    #[serde(default)]
    items: Vec<KeyToPath>,
}

#[derive(Deserialize)]
struct RawCsi {
    #[serde(default)]
    driver: String,
}

impl<'de> Deserialize<'de> for WorkspaceBinding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawWorkspaceBinding::deserialize(deserializer)?;
        let source = if raw.volume_claim_template.is_some() {
            Some(WorkspaceSource::VolumeClaimTemplate)
        } else if let Some(pvc) = raw.persistent_volume_claim {
            Some(WorkspaceSource::PersistentVolumeClaim {
                claim_name: pvc.claim_name,
            })
        } else if let Some(dir) = raw.empty_dir {
            Some(WorkspaceSource::EmptyDir { medium: dir.medium })
        } else if let Some(cm) = raw.config_map {
            Some(WorkspaceSource::ConfigMap {
                name: cm.name,
                items: cm.items,
            })
        } else if let Some(secret) = raw.secret {
            Some(WorkspaceSource::Secret {
                secret_name: secret.secret_name,
                items: secret.items,
            })
        } else if raw.projected.is_some() {
            Some(WorkspaceSource::Projected)
        } else {
            raw.csi.map(|csi| WorkspaceSource::Csi { driver: csi.driver })
        };

        Ok(WorkspaceBinding {
            name: raw.name,
            sub_path: raw.sub_path,
            source,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunStatus {
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub steps: Vec<StepState>,
    #[serde(default)]
    pub sidecars: Vec<SidecarState>,
    #[serde(default)]
    pub results: Vec<TaskRunResult>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskRunResult {
    pub name: String,
    #[serde(default)]
    pub value: ParamValue,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub last_transition_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
    #[default]
    #[serde(other)]
    Other,
}

/// Observed state of a step or sidecar container.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawComponentState")]
pub struct ComponentState {
    pub name: String,
    pub container: String,
    pub image_id: String,
    /// `None` when the stored entry carries none of the three lifecycle shapes.
    pub state: Option<ContainerState>,
}

pub type StepState = ComponentState;
pub type SidecarState = ComponentState;

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerState {
    Waiting {
        reason: String,
        message: String,
    },
    Running {
        started_at: Option<DateTime<Utc>>,
    },
    Terminated {
        started_at: Option<DateTime<Utc>>,
        finished_at: Option<DateTime<Utc>>,
        reason: String,
        message: String,
        exit_code: i32,
    },
}

impl ContainerState {
    #[cfg(test)]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ContainerState::Waiting { .. } => None,
            ContainerState::Running { started_at } => *started_at,
            ContainerState::Terminated { started_at, .. } => *started_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComponentState {
    #[serde(default)]
    name: String,
    #[serde(default)]
    container: String,
    #[serde(rename = "imageID", default)]
    image_id: String,
    #[serde(default)]
    waiting: Option<RawWaiting>,
    #[serde(default)]
    running: Option<RawRunning>,
    #[serde(default)]
    terminated: Option<RawTerminated>,
}

#[derive(Deserialize)]
struct RawWaiting {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRunning {
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTerminated {
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    exit_code: i32,
}

impl From<RawComponentState> for ComponentState {
    fn from(raw: RawComponentState) -> Self {
        let state = if let Some(w) = raw.waiting {
            Some(ContainerState::Waiting {
                reason: w.reason,
                message: w.message,
            })
        } else if let Some(r) = raw.running {
            Some(ContainerState::Running {
                started_at: r.started_at,
            })
        } else {
            raw.terminated.map(|t| ContainerState::Terminated {
                started_at: t.started_at,
                finished_at: t.finished_at,
                reason: t.reason,
                message: t.message,
                exit_code: t.exit_code,
            })
        };

        ComponentState {
            name: raw.name,
            container: raw.container,
            image_id: raw.image_id,
            state,
        }
    }
}
