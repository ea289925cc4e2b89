//! Remote Cloud Tasks calls.
//!
//! - [`CloudTasksClient`]: the two calls the adapter makes
//! - [`memory::RecordingClient`]: records calls in memory, for tests and local runs
//! - `http::HttpCloudTasksClient`: Cloud Tasks v2 REST API (feature `gcp`)

pub mod memory;

#[cfg(feature = "gcp")]
pub mod http;

use async_trait::async_trait;

use crate::{QueueResult, Task, TaskName};

/// Already-authenticated access to the Cloud Tasks service.
///
/// Implementations do not retry; retry policy is configured on the remote queue.
#[async_trait]
pub trait CloudTasksClient: Send + Sync {
    /// Create `task` in the queue addressed by `queue_path` and return it as stored
    async fn create_task(&self, queue_path: &str, task: Task) -> QueueResult<Task>;

    /// Delete a task by its fully-qualified name. A task that no longer exists is not an error.
    async fn delete_task(&self, task_name: &TaskName) -> QueueResult<()>;
}

#[cfg(feature = "gcp")]
pub use http::HttpCloudTasksClient;
pub use memory::RecordingClient;
