//! # dog-cloud-tasks: Google Cloud Tasks queue driver
//!
//! **Push-style job dispatch for DogRS services**
//!
//! dog-cloud-tasks turns every queued job into one Cloud Tasks task. The
//! service calls back into your application over HTTP when the job is due,
//! so there are no workers to run and nothing to poll.
//!
//! ## Features
//!
//! - **Two delivery modes**: App Engine routing or direct HTTPS with an OIDC token
//! - **Self-describing payloads**: each body carries its queue, task name and connection
//! - **Unique task names**: `{ulid}-{JobName}` under the configured queue path
//! - **Flexible delays**: durations, absolute instants or plain seconds
//! - **Pluggable client**: in-memory recording client for tests, REST client behind `gcp`
//! - **Structured observability**: `tracing` spans plus a broadcast stream of task events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dog_cloud_tasks::prelude::*;
//! use dog_cloud_tasks::client::RecordingClient;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct SendEmail {
//!     to: String,
//! }
//!
//! impl Job for SendEmail {
//!     fn display_name(&self) -> String {
//!         "App\\Jobs\\SendEmail".to_string()
//!     }
//! }
//!
//! # async fn run() -> QueueResult<()> {
//! let config = CloudTasksConfig::new("my-project", "europe-west1", "default")
//!     .with_service_account("tasks@my-project.iam.gserviceaccount.com")
//!     .with_handler("https://worker.example.com");
//!
//! let queue = CloudTasksQueue::new(config, Arc::new(RecordingClient::new()))?;
//! let job = SendEmail { to: "a@b.c".into() };
//! let uuid = queue
//!     .later_job(std::time::Duration::from_secs(60), &job, Some("emails"))
//!     .await?;
//! # let _ = uuid;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod handler;
pub mod job;
pub mod naming;
pub mod observability;
pub mod payload;
pub mod schedule;
pub mod target;
pub mod types;

pub use adapter::CloudTasksQueue;
pub use client::{CloudTasksClient, RecordingClient};
pub use config::CloudTasksConfig;
pub use contract::{PushOptions, Queue};
pub use error::{QueueError, QueueResult};
pub use handler::{StaticUrls, UrlGenerator};
pub use job::{DeliveredJob, Job, JobDescriptor};
pub use naming::TaskNamer;
pub use payload::{InternalMeta, JobPayload, JsonPayloadFactory, PayloadFactory};
pub use schedule::Delay;
pub use target::{HeaderProvider, RequestTargetBuilder};
pub use types::{
    AppEngineHttpRequest, AppEngineRouting, Headers, HttpMethod, HttpRequest, OidcToken,
    QueueIdentity, RequestTarget, Task, TaskEvent, TaskName,
};

#[cfg(feature = "gcp")]
pub use client::HttpCloudTasksClient;

pub use observability::{EventBroadcaster, FnObserver, LoggingObserver, TaskObserver};

/// Common imports for pushing jobs
pub mod prelude {
    pub use crate::{
        CloudTasksConfig, CloudTasksQueue, Delay, DeliveredJob, HeaderProvider, Job,
        JobDescriptor, PushOptions, Queue, QueueError, QueueResult,
    };

    pub use async_trait::async_trait;
}
