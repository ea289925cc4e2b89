use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskName;

/// Minimal stable event protocol for task lifecycle observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEvent {
    /// Task was accepted by Cloud Tasks
    Created {
        queue: String,
        task_name: TaskName,
        scheduled_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },

    /// Task delete was acknowledged by Cloud Tasks
    Deleted {
        task_name: TaskName,
        at: DateTime<Utc>,
    },
}

impl TaskEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Deleted { .. } => "deleted",
        }
    }

    /// Get the task name from any event
    pub fn task_name(&self) -> &TaskName {
        match self {
            Self::Created { task_name, .. } => task_name,
            Self::Deleted { task_name, .. } => task_name,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Created { at, .. } => at,
            Self::Deleted { at, .. } => at,
        }
    }
}
