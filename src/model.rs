use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
    #[serde(default)]
    pub initial_gadget: Option<String>,
}

/// A pluggable command-line tool exposed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gadget {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub modes: Vec<Mode>,
}

impl Gadget {
    pub fn mode(&self, mode_id: &str) -> Option<&Mode> {
        self.modes.iter().find(|m| m.id == mode_id)
    }
}

/// One invocable operation of a gadget, with its own parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "schema_fields")]
    pub form_schema: Vec<SchemaField>,
}

impl Mode {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.form_schema
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.spec)
    }
}

/// A named entry of a mode's form schema, in server declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub spec: FieldSpec,
}

/// `form_schema` arrives as a JSON object; keep its key order instead of sorting it.
mod schema_fields {
    use super::{FieldSpec, SchemaField};
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(fields: &[SchemaField], s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(fields.len()))?;
        for f in fields {
            map.serialize_entry(&f.name, &f.spec)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<SchemaField>, D::Error> {
        let raw = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(d)?;
        raw.unwrap_or_default()
            .into_iter()
            .map(|(name, value)| {
                serde_json::from_value::<FieldSpec>(value)
                    .map(|spec| SchemaField { name, spec })
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

/// Declarative description of one form input, exactly as the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

/// Server-assigned reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(pub String);

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored form value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Multi(BTreeSet<String>),
    File(FileRef),
}

impl ParamValue {
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Text(s) => s.trim().is_empty(),
            ParamValue::Multi(set) => set.is_empty(),
            ParamValue::File(r) => r.0.is_empty(),
        }
    }
}

/// `mode_id -> field_name -> value`
pub type ParameterSet = BTreeMap<String, BTreeMap<String, ParamValue>>;

/// Identifies one form field across all panels; uploads report progress against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    pub gadget_id: String,
    pub mode_id: String,
    pub field: String,
}

impl FieldKey {
    pub fn new(gadget_id: &str, mode_id: &str, field: &str) -> Self {
        Self {
            gadget_id: gadget_id.to_string(),
            mode_id: mode_id.to_string(),
            field: field.to_string(),
        }
    }
}

/// Status vocabulary shared by workers and tasks.
///
/// Unrecognized wire strings are kept in `Unknown` and rendered neutrally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Sleepy,
    Idle,
    Busy,
    Paused,
    Troubled,
    Unknown(String),
}

impl Status {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "Sleepy Goblin" => Status::Sleepy,
            "Idle Goblin" | "completed" => Status::Idle,
            "Busy Goblin" => Status::Busy,
            "Paused Goblin" => Status::Paused,
            "Troubled Goblin" | "error" => Status::Troubled,
            other => Status::Unknown(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            Status::Sleepy => "Sleepy Goblin",
            Status::Idle => "Idle Goblin",
            Status::Busy => "Busy Goblin",
            Status::Paused => "Paused Goblin",
            Status::Troubled => "Troubled Goblin",
            Status::Unknown(raw) => raw,
        }
    }

    /// Label for a worker row: what the worker is doing right now.
    pub fn worker_label(&self) -> &str {
        match self {
            Status::Sleepy => "Sleepy",
            Status::Idle => "Idle",
            Status::Busy => "Busy",
            Status::Paused => "Paused",
            Status::Troubled => "Troubled",
            Status::Unknown(raw) => raw,
        }
    }

    /// Label for a task row: how the task ended (or where it is).
    pub fn task_label(&self) -> &str {
        match self {
            Status::Sleepy => "Queued",
            Status::Idle => "Completed",
            Status::Busy => "Running",
            Status::Paused => "Paused",
            Status::Troubled => "Error",
            Status::Unknown(raw) => raw,
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Status::from_wire(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub status: Status,
}

#[derive(Debug, Default, Deserialize)]
pub struct MinionStatusResponse {
    #[serde(default)]
    pub minions: BTreeMap<String, Status>,
}

impl MinionStatusResponse {
    pub fn into_workers(self) -> Vec<Worker> {
        self.minions
            .into_iter()
            .map(|(id, status)| Worker { id, status })
            .collect()
    }
}

/// One unit of submitted work. Pending and completed listings carry different subsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gadget_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gadget_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_retry: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_task_id: Option<String>,
}

impl Task {
    pub fn short_id(&self) -> String {
        short_id(&self.task_id, 8)
    }
}

/// Truncate an identifier for table display.
pub fn short_id(id: &str, keep: usize) -> String {
    if id.chars().count() <= keep {
        id.to_string()
    } else {
        let head: String = id.chars().take(keep).collect();
        format!("{head}...")
    }
}

/// Point-in-time snapshot of the worker pool; replaced wholesale on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_percent: f64,
    #[serde(default)]
    pub active_tasks: u64,
    #[serde(default)]
    pub error_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_completed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_tasks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub gadget_id: String,
    pub modes: Vec<String>,
    pub parameters: ParameterSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub result_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Reply to cancel/pause/resume/retry. The server reports refusals in-band.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_task_id: Option<String>,
}

impl ActionResponse {
    pub fn is_rejected(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Submitted,
}

/// Session-local acknowledgement of one batch submission.
///
/// `task_ids[i]` and `result_dirs[i]` belong to `modes[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: String,
    pub timestamp: String,
    pub gadget_id: String,
    pub modes: Vec<String>,
    pub task_ids: Vec<String>,
    pub result_dirs: Vec<String>,
    pub status: RecordStatus,
}

/// Events emitted by background work and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum DashEvent {
    GadgetsLoaded(Vec<Gadget>),
    GadgetsFailed(String),
    SubmissionAccepted {
        gadget_id: String,
        modes: Vec<String>,
        response: SubmitResponse,
    },
    SubmissionFailed {
        gadget_id: String,
        message: String,
    },
    ActionCompleted {
        action: crate::orchestrator::LifecycleAction,
        message: String,
    },
    ActionFailed {
        action: crate::orchestrator::LifecycleAction,
        message: String,
    },
    UploadProgress {
        key: FieldKey,
        percent: u8,
    },
    UploadFinished {
        key: FieldKey,
        reference: FileRef,
    },
    UploadFailed {
        key: FieldKey,
        message: String,
    },
    // Box to keep DashEvent small; Task carries arbitrary JSON.
    TaskDetailLoaded(Box<Task>),
    Info(String),
}
