use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{Task, TaskEvent, TaskName};

/// Hook notified after the remote service accepts a create or delete
pub trait TaskObserver: Send + Sync {
    fn task_created(&self, queue: &str, task: &Task);

    fn task_deleted(&self, _task_name: &TaskName) {}
}

/// Logs every created and deleted task
#[derive(Debug, Clone, Default)]
pub struct LoggingObserver;

impl TaskObserver for LoggingObserver {
    fn task_created(&self, queue: &str, task: &Task) {
        info!(
            queue = %queue,
            task_name = %task.name,
            scheduled_at = ?task.schedule_time,
            "Created Cloud Task"
        );
    }

    fn task_deleted(&self, task_name: &TaskName) {
        info!(task_name = %task_name, "Deleted Cloud Task");
    }
}

/// Republishes task lifecycle as [`TaskEvent`]s on a broadcast channel
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<TaskEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: TaskEvent) {
        // No subscribers is fine
        if self.sender.send(event).is_err() {
            debug!("Task event dropped: no subscribers");
        }
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl TaskObserver for EventBroadcaster {
    fn task_created(&self, queue: &str, task: &Task) {
        self.publish(TaskEvent::Created {
            queue: queue.to_string(),
            task_name: task.name.clone(),
            scheduled_at: task.schedule_time,
            at: Utc::now(),
        });
    }

    fn task_deleted(&self, task_name: &TaskName) {
        self.publish(TaskEvent::Deleted {
            task_name: task_name.clone(),
            at: Utc::now(),
        });
    }
}

/// Adapts a closure into a [`TaskObserver`] that sees created tasks
pub struct FnObserver<F>(pub F);

impl<F> TaskObserver for FnObserver<F>
where
    F: Fn(&str, &Task) + Send + Sync,
{
    fn task_created(&self, queue: &str, task: &Task) {
        (self.0)(queue, task)
    }
}
