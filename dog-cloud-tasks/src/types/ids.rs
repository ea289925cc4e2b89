use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully-qualified Cloud Tasks task name
/// (`projects/{project}/locations/{location}/queues/{queue}/tasks/{id}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskName(pub String);

impl TaskName {
    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing task id segment, after `/tasks/`
    pub fn task_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Queue path this task belongs to, if the name is fully qualified
    pub fn queue_path(&self) -> Option<&str> {
        self.0.rfind("/tasks/").map(|idx| &self.0[..idx])
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for TaskName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}
