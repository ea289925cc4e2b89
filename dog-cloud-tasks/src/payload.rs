//! Job payloads and the `internal` bookkeeping block.
//!
//! A payload is the JSON object delivered as the callback body. Upstream code
//! produces it (see [`PayloadFactory`]); before submission the adapter writes
//! an `internal` block into it:
//!
//! ```json
//! {
//!   "internal": {
//!     "attempts": 0,
//!     "queue": "emails",
//!     "taskName": "projects/...",
//!     "connection": "cloudtasks"
//!   }
//! }
//! ```
//!
//! `attempts` survives re-enrichment so a released job keeps its counter.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::job::JobDescriptor;
use crate::{QueueError, QueueResult, TaskName};

/// Key of the bookkeeping block inside a payload
pub const INTERNAL_KEY: &str = "internal";

/// Bookkeeping the job handler needs to redeliver or release a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalMeta {
    #[serde(default)]
    pub attempts: u32,
    pub queue: String,
    pub task_name: TaskName,
    pub connection: String,
}

impl InternalMeta {
    fn to_value(&self) -> Value {
        json!({
            "attempts": self.attempts,
            "queue": self.queue,
            "taskName": self.task_name.as_str(),
            "connection": self.connection,
        })
    }
}

/// A job payload: an arbitrary JSON object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobPayload(Map<String, Value>);

impl JobPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Parse a raw payload; anything other than a JSON object is rejected
    pub fn from_json(raw: &str) -> QueueResult<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> QueueResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(QueueError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Client correlation id assigned when the payload was created
    pub fn uuid(&self) -> QueueResult<&str> {
        self.str_field("uuid")
    }

    /// Class-like name of the job, used for task naming
    pub fn display_name(&self) -> QueueResult<&str> {
        self.str_field("displayName")
    }

    /// Delivery attempts recorded so far, zero when never enriched
    pub fn attempts(&self) -> u32 {
        self.0
            .get(INTERNAL_KEY)
            .and_then(|internal| internal.get("attempts"))
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }

    /// The `internal` block, if present and well formed
    pub fn internal(&self) -> Option<InternalMeta> {
        self.0
            .get(INTERNAL_KEY)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_vec(&self) -> QueueResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    fn str_field(&self, key: &'static str) -> QueueResult<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s),
            _ => Err(QueueError::MissingField(key)),
        }
    }
}

/// Write the `internal` block, keeping any attempt count already recorded
pub fn enrich(
    mut payload: JobPayload,
    queue: &str,
    task_name: &TaskName,
    connection: &str,
) -> JobPayload {
    let internal = InternalMeta {
        attempts: payload.attempts(),
        queue: queue.to_string(),
        task_name: task_name.clone(),
        connection: connection.to_string(),
    };
    payload.0.insert(INTERNAL_KEY.to_string(), internal.to_value());
    payload
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Turns a job into the raw payload string handed to `push_raw`
pub trait PayloadFactory: Send + Sync {
    fn create_payload(&self, job: JobDescriptor, data: Value, queue: &str) -> QueueResult<String>;
}

/// Default payload shape: `uuid`, `displayName`, `job`, `data`, `maxTries`, `timeout`
#[derive(Debug, Clone, Default)]
pub struct JsonPayloadFactory;

impl PayloadFactory for JsonPayloadFactory {
    fn create_payload(&self, job: JobDescriptor, data: Value, _queue: &str) -> QueueResult<String> {
        let payload = json!({
            "uuid": Uuid::new_v4().to_string(),
            "displayName": job.display_name,
            "job": job.body,
            "data": data,
            "maxTries": job.max_tries,
            "timeout": job.timeout.map(|t| t.as_secs()),
        });
        Ok(serde_json::to_string(&payload)?)
    }
}
