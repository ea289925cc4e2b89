use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::payload::{InternalMeta, JobPayload};
use crate::{QueueError, QueueResult, TaskName};

/// A unit of work that can be pushed onto a Cloud Tasks queue
pub trait Job: Serialize + Send + Sync {
    /// Class-like name used for task naming and display.
    /// Only the segment after the last `::` ends up in the task id.
    fn display_name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Maximum attempts the job handler should allow
    fn max_tries(&self) -> Option<u32> {
        None
    }

    /// Execution timeout the job handler should enforce
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// A job reduced to what payload creation needs
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    pub display_name: String,
    pub body: Value,
    pub max_tries: Option<u32>,
    pub timeout: Option<Duration>,
}

impl JobDescriptor {
    /// Serialize a job and capture its metadata
    pub fn of<J: Job>(job: &J) -> QueueResult<Self> {
        Ok(Self {
            display_name: job.display_name(),
            body: serde_json::to_value(job)?,
            max_tries: job.max_tries(),
            timeout: job.timeout(),
        })
    }
}

/// A job as received by the callback handler, carrying its enriched payload
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredJob {
    raw_body: String,
    payload: JobPayload,
    internal: InternalMeta,
}

impl DeliveredJob {
    /// Parse a callback body. The payload must carry an `internal` block.
    pub fn from_raw(raw_body: impl Into<String>) -> QueueResult<Self> {
        let raw_body = raw_body.into();
        let payload = JobPayload::from_json(&raw_body)?;
        let internal = payload
            .internal()
            .ok_or(QueueError::MissingField("internal"))?;
        Ok(Self {
            raw_body,
            payload,
            internal,
        })
    }

    /// Body exactly as delivered; `release` resubmits this verbatim
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }

    pub fn uuid(&self) -> QueueResult<&str> {
        self.payload.uuid()
    }

    pub fn queue(&self) -> &str {
        &self.internal.queue
    }

    pub fn task_name(&self) -> &TaskName {
        &self.internal.task_name
    }

    pub fn attempts(&self) -> u32 {
        self.internal.attempts
    }

    pub fn connection(&self) -> &str {
        &self.internal.connection
    }
}
