use serde::{Deserialize, Serialize};

use super::TaskName;

/// Address of a Cloud Tasks queue: project, location and queue name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueIdentity {
    pub project: String,
    pub location: String,
    pub queue: String,
}

impl QueueIdentity {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            queue: queue.into(),
        }
    }

    /// Same project and location, different queue
    pub fn with_queue(&self, queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            ..self.clone()
        }
    }

    /// Resource path used to address the queue in API calls
    pub fn queue_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/queues/{}",
            self.project, self.location, self.queue
        )
    }

    /// Fully-qualified name of a task inside this queue
    pub fn task_name(&self, task_id: &str) -> TaskName {
        TaskName(format!("{}/tasks/{}", self.queue_path(), task_id))
    }
}
