use async_trait::async_trait;
use serde_json::Value;

use crate::job::{DeliveredJob, JobDescriptor};
use crate::{Delay, QueueResult};

/// Per-push options for [`Queue::push_raw`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    pub delay: Option<Delay>,
}

impl PushOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delayed(delay: impl Into<Delay>) -> Self {
        Self {
            delay: Some(delay.into()),
        }
    }
}

/// Generic worker-queue contract.
///
/// Push-style backends implement `pop` and `size` trivially: work arrives
/// through callbacks, so there is nothing to pull and nothing to count.
/// All pushes return the payload's client-assigned uuid.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Number of pending jobs
    async fn size(&self, queue: Option<&str>) -> QueueResult<usize>;

    /// Push a job for immediate execution
    async fn push(
        &self,
        job: JobDescriptor,
        data: Value,
        queue: Option<&str>,
    ) -> QueueResult<String>;

    /// Push an already-serialized payload
    async fn push_raw(
        &self,
        payload: String,
        queue: Option<&str>,
        options: PushOptions,
    ) -> QueueResult<String>;

    /// Push a job to run after `delay`
    async fn later(
        &self,
        delay: Delay,
        job: JobDescriptor,
        data: Value,
        queue: Option<&str>,
    ) -> QueueResult<String>;

    /// Take the next job, if the backend supports pulling
    async fn pop(&self, queue: Option<&str>) -> QueueResult<Option<DeliveredJob>>;

    /// Put a delivered job back to run again after `delay`
    async fn release(&self, job: &DeliveredJob, delay: Delay) -> QueueResult<String>;

    /// Remove a delivered job from the backend
    async fn delete(&self, job: &DeliveredJob) -> QueueResult<()>;

    /// Name of the connection this queue was created for
    fn connection_name(&self) -> &str;
}
