use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    client::CloudTasksClient,
    contract::{PushOptions, Queue},
    handler::{resolve_handler, StaticUrls, UrlGenerator},
    job::{DeliveredJob, Job, JobDescriptor},
    naming::TaskNamer,
    observability::{LoggingObserver, TaskObserver},
    payload::{enrich, JobPayload, JsonPayloadFactory, PayloadFactory},
    schedule::{schedule_time, Delay},
    target::{HeaderProvider, RequestTargetBuilder},
    CloudTasksConfig, QueueResult, Task,
};

/// Queue backed by Google Cloud Tasks.
///
/// Each push becomes one remote task whose callback POSTs the enriched
/// payload to the job handler. The adapter keeps no record of created tasks.
pub struct CloudTasksQueue {
    config: Arc<CloudTasksConfig>,
    client: Arc<dyn CloudTasksClient>,
    namer: TaskNamer,
    payloads: Arc<dyn PayloadFactory>,
    urls: Arc<dyn UrlGenerator>,
    headers: HeaderProvider,
    observers: Vec<Arc<dyn TaskObserver>>,
}

impl CloudTasksQueue {
    /// Create a queue from a validated configuration
    pub fn new(config: CloudTasksConfig, client: Arc<dyn CloudTasksClient>) -> QueueResult<Self> {
        config.validate()?;

        let urls = StaticUrls::new(config.app_url.clone(), &config.callback_path);
        Ok(Self {
            namer: TaskNamer::new(&config.project, &config.location),
            config: Arc::new(config),
            client,
            payloads: Arc::new(JsonPayloadFactory),
            urls: Arc::new(urls),
            headers: HeaderProvider::default(),
            observers: vec![Arc::new(LoggingObserver)],
        })
    }

    /// Use a custom payload shape for `push` and `later`
    pub fn with_payload_factory(mut self, payloads: Arc<dyn PayloadFactory>) -> Self {
        self.payloads = payloads;
        self
    }

    /// Resolve handler routes through the web layer instead of configuration
    pub fn with_url_generator(mut self, urls: Arc<dyn UrlGenerator>) -> Self {
        self.urls = urls;
        self
    }

    /// Register an observer notified after each successful create or delete
    pub fn with_observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_task_headers(mut self, headers: impl Into<HeaderProvider>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Replace the headers attached to subsequent tasks
    pub fn set_task_headers(&mut self, headers: impl Into<HeaderProvider>) {
        self.headers = headers.into();
    }

    pub fn config(&self) -> &CloudTasksConfig {
        &self.config
    }

    /// Callback URL used in direct mode
    pub fn get_handler(&self) -> QueueResult<String> {
        resolve_handler(self.config.handler.as_deref(), self.urls.as_ref())
    }

    /// Push a typed job for immediate execution
    pub async fn push_job<J: Job>(&self, job: &J, queue: Option<&str>) -> QueueResult<String> {
        self.push(JobDescriptor::of(job)?, Value::Null, queue).await
    }

    /// Push a typed job to run after `delay`
    pub async fn later_job<J: Job>(
        &self,
        delay: impl Into<Delay>,
        job: &J,
        queue: Option<&str>,
    ) -> QueueResult<String> {
        self.later(delay.into(), JobDescriptor::of(job)?, Value::Null, queue)
            .await
    }

    fn queue_name<'a>(&'a self, queue: Option<&'a str>) -> &'a str {
        queue
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.config.queue)
    }

    /// Build a task for `raw` and create it on Cloud Tasks.
    ///
    /// Returns the payload uuid; the remote task name is only visible to
    /// observers and inside the payload's `internal` block.
    #[instrument(skip(self, raw))]
    async fn dispatch(&self, queue: Option<&str>, raw: &str, delay: Delay) -> QueueResult<String> {
        let queue = self.queue_name(queue);
        let payload = JobPayload::from_json(raw)?;
        let uuid = payload.uuid()?.to_string();

        let task_name = self.namer.name(queue, payload.display_name()?);
        let payload = enrich(payload, queue, &task_name, &self.config.connection);
        let target = RequestTargetBuilder::new(&self.config, self.urls.as_ref())
            .build(&payload, &self.headers)?;

        let mut task = Task::new(task_name, target);
        if let Some(deadline) = self.config.dispatch_deadline() {
            task = task.with_dispatch_deadline(deadline);
        }
        if let Some(at) = schedule_time(delay, Utc::now()) {
            task = task.with_schedule_time(at);
        }

        let queue_path = self.config.identity_for(queue).queue_path();
        let created = self.client.create_task(&queue_path, task).await?;

        for observer in &self.observers {
            observer.task_created(queue, &created);
        }

        debug!("Dispatched job {} as {}", uuid, created.name);
        Ok(uuid)
    }
}

impl Clone for CloudTasksQueue {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
            namer: self.namer.clone(),
            payloads: self.payloads.clone(),
            urls: self.urls.clone(),
            headers: self.headers.clone(),
            observers: self.observers.clone(),
        }
    }
}

#[async_trait]
impl Queue for CloudTasksQueue {
    /// Cloud Tasks exposes no countable backlog through this API
    async fn size(&self, _queue: Option<&str>) -> QueueResult<usize> {
        Ok(0)
    }

    #[instrument(skip_all, fields(job = %job.display_name, queue = ?queue))]
    async fn push(
        &self,
        job: JobDescriptor,
        data: Value,
        queue: Option<&str>,
    ) -> QueueResult<String> {
        let payload = self
            .payloads
            .create_payload(job, data, self.queue_name(queue))?;
        self.push_raw(payload, queue, PushOptions::new()).await
    }

    #[instrument(skip(self, payload))]
    async fn push_raw(
        &self,
        payload: String,
        queue: Option<&str>,
        options: PushOptions,
    ) -> QueueResult<String> {
        self.dispatch(queue, &payload, options.delay.unwrap_or_default())
            .await
    }

    #[instrument(skip(self, job, data), fields(job = %job.display_name))]
    async fn later(
        &self,
        delay: Delay,
        job: JobDescriptor,
        data: Value,
        queue: Option<&str>,
    ) -> QueueResult<String> {
        let payload = self
            .payloads
            .create_payload(job, data, self.queue_name(queue))?;
        self.dispatch(queue, &payload, delay).await
    }

    /// Work is delivered by callback, never pulled
    async fn pop(&self, _queue: Option<&str>) -> QueueResult<Option<DeliveredJob>> {
        Ok(None)
    }

    /// Resubmit the delivered body as-is; its attempt count is already embedded
    #[instrument(skip_all, fields(task_name = %job.task_name(), attempts = job.attempts()))]
    async fn release(&self, job: &DeliveredJob, delay: Delay) -> QueueResult<String> {
        self.push_raw(
            job.raw_body().to_string(),
            Some(job.queue()),
            PushOptions::delayed(delay),
        )
        .await
    }

    #[instrument(skip_all, fields(task_name = %job.task_name()))]
    async fn delete(&self, job: &DeliveredJob) -> QueueResult<()> {
        self.client.delete_task(job.task_name()).await?;
        for observer in &self.observers {
            observer.task_deleted(job.task_name());
        }
        Ok(())
    }

    fn connection_name(&self) -> &str {
        &self.config.connection
    }
}
