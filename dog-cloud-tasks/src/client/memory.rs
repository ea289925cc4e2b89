//! In-memory Cloud Tasks client.
//!
//! Accepts every create and delete call and keeps them for inspection.
//! Nothing is ever delivered; pair it with direct calls to the job handler
//! when a test needs execution.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::CloudTasksClient;
use crate::{QueueError, QueueResult, Task, TaskName};

/// A task accepted by [`RecordingClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub queue_path: String,
    pub task: Task,
}

#[derive(Debug, Default)]
struct ClientState {
    created: Vec<CreatedTask>,
    deleted: Vec<TaskName>,
    fail_next: Option<String>,
}

/// Records calls instead of talking to Cloud Tasks
#[derive(Debug, Default)]
pub struct RecordingClient {
    state: Mutex<ClientState>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with a remote error
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Every task created so far, oldest first
    pub fn created(&self) -> Vec<CreatedTask> {
        self.state.lock().created.clone()
    }

    pub fn last_created(&self) -> Option<CreatedTask> {
        self.state.lock().created.last().cloned()
    }

    /// Names passed to `delete_task`, oldest first
    pub fn deleted(&self) -> Vec<TaskName> {
        self.state.lock().deleted.clone()
    }

    /// Tasks created on one queue path
    pub fn created_on(&self, queue_path: &str) -> Vec<Task> {
        self.state
            .lock()
            .created
            .iter()
            .filter(|created| created.queue_path == queue_path)
            .map(|created| created.task.clone())
            .collect()
    }

    fn take_failure(state: &mut ClientState) -> QueueResult<()> {
        match state.fail_next.take() {
            Some(message) => Err(QueueError::Remote(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CloudTasksClient for RecordingClient {
    async fn create_task(&self, queue_path: &str, task: Task) -> QueueResult<Task> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;
        state.created.push(CreatedTask {
            queue_path: queue_path.to_string(),
            task: task.clone(),
        });
        Ok(task)
    }

    async fn delete_task(&self, task_name: &TaskName) -> QueueResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;
        state.deleted.push(task_name.clone());
        Ok(())
    }
}
