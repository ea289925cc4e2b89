use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use dog_cloud_tasks::{
    client::RecordingClient, CloudTasksConfig, CloudTasksQueue, Delay, DeliveredJob,
    EventBroadcaster, FnObserver, Job, JobDescriptor, PushOptions, Queue, QueueError,
    RequestTarget, Task, TaskEvent, UrlGenerator,
};

const PROJECT: &str = "my-project";
const LOCATION: &str = "europe-west1";
const SERVICE_ACCOUNT: &str = "tasks@my-project.iam.gserviceaccount.com";

/// Test factory functions
fn direct_config() -> CloudTasksConfig {
    CloudTasksConfig::new(PROJECT, LOCATION, "default")
        .with_service_account(SERVICE_ACCOUNT)
        .with_handler("https://worker.example.com")
}

fn app_engine_config() -> CloudTasksConfig {
    CloudTasksConfig::new(PROJECT, LOCATION, "default").with_app_engine(Some("worker".into()))
}

fn create_queue(config: CloudTasksConfig) -> (CloudTasksQueue, Arc<RecordingClient>) {
    let client = Arc::new(RecordingClient::new());
    let queue = CloudTasksQueue::new(config, client.clone()).expect("valid config");
    (queue, client)
}

fn send_email_payload(uuid: &str) -> String {
    json!({
        "uuid": uuid,
        "displayName": "App\\Jobs\\SendEmail",
        "job": "Illuminate\\Queue\\CallQueuedHandler@call",
        "data": { "to": "someone@example.com" }
    })
    .to_string()
}

fn body_of(task: &Task) -> Value {
    task.body_json().expect("task body is JSON")
}

#[derive(Serialize)]
struct SendEmail {
    to: String,
}

impl Job for SendEmail {
    fn display_name(&self) -> String {
        "App\\Jobs\\SendEmail".to_string()
    }

    fn max_tries(&self) -> Option<u32> {
        Some(3)
    }
}

/// Immediate push in direct mode produces an HTTP task with no schedule
#[tokio::test]
async fn test_push_raw_direct_mode() {
    let (queue, client) = create_queue(direct_config());

    let id = queue
        .push_raw(send_email_payload("abc-123"), Some("emails"), PushOptions::new())
        .await
        .unwrap();
    assert_eq!(id, "abc-123");

    let created = client.last_created().unwrap();
    assert_eq!(
        created.queue_path,
        "projects/my-project/locations/europe-west1/queues/emails"
    );

    let task = created.task;
    assert!(task.schedule_time.is_none());
    assert!(task
        .name
        .as_str()
        .starts_with("projects/my-project/locations/europe-west1/queues/emails/tasks/"));
    assert!(task.name.task_id().ends_with("-SendEmail"));

    let http = task.target.as_http().expect("direct mode uses an HTTP target");
    assert_eq!(http.url, "https://worker.example.com/handle-task");
    assert_eq!(http.http_method.as_str(), "POST");
    assert_eq!(http.oidc_token.service_account_email, SERVICE_ACCOUNT);

    let body = body_of(&task);
    assert_eq!(body["uuid"], "abc-123");
    assert_eq!(body["data"]["to"], "someone@example.com");
    assert_eq!(body["internal"]["queue"], "emails");
    assert_eq!(body["internal"]["attempts"], 0);
    assert_eq!(body["internal"]["connection"], "cloudtasks");
    assert_eq!(body["internal"]["taskName"], task.name.as_str());
}

/// Omitting the queue falls back to the configured default
#[tokio::test]
async fn test_push_raw_default_queue() {
    let (queue, client) = create_queue(direct_config());

    queue
        .push_raw(send_email_payload("u-1"), None, PushOptions::new())
        .await
        .unwrap();

    let created = client.last_created().unwrap();
    assert!(created.queue_path.ends_with("/queues/default"));
    assert_eq!(body_of(&created.task)["internal"]["queue"], "default");
}

/// Releasing a delivered job keeps its attempt count and schedules it
#[tokio::test]
async fn test_release_preserves_attempts() {
    let (queue, client) = create_queue(direct_config());

    queue
        .push_raw(send_email_payload("abc-123"), Some("emails"), PushOptions::new())
        .await
        .unwrap();
    let first = client.last_created().unwrap().task;

    let mut delivered_body = body_of(&first);
    delivered_body["internal"]["attempts"] = json!(1);
    let delivered = DeliveredJob::from_raw(delivered_body.to_string()).unwrap();
    assert_eq!(delivered.attempts(), 1);

    let before = Utc::now();
    let id = queue
        .release(&delivered, Delay::Seconds(60))
        .await
        .unwrap();
    assert_eq!(id, "abc-123");

    let released = client.last_created().unwrap().task;
    let scheduled = released.schedule_time.expect("release with delay is scheduled");
    assert!(scheduled >= before + chrono::Duration::seconds(60));
    assert!(scheduled <= Utc::now() + chrono::Duration::seconds(60));

    let body = body_of(&released);
    assert_eq!(body["internal"]["attempts"], 1);
    assert_eq!(body["internal"]["queue"], "emails");
    assert_ne!(released.name, first.name);
    assert_eq!(body["internal"]["taskName"], released.name.as_str());
}

/// Every push gets its own task name
#[tokio::test]
async fn test_pushes_get_distinct_names() {
    let (queue, client) = create_queue(direct_config());

    for _ in 0..2 {
        queue
            .push_raw(send_email_payload("same-uuid"), Some("emails"), PushOptions::new())
            .await
            .unwrap();
    }

    let created = client.created();
    assert_eq!(created.len(), 2);
    assert_ne!(created[0].task.name, created[1].task.name);
}

/// App Engine mode routes by relative URI and service
#[tokio::test]
async fn test_app_engine_mode() {
    let (queue, client) = create_queue(app_engine_config());

    queue
        .push_raw(send_email_payload("ae-1"), None, PushOptions::new())
        .await
        .unwrap();

    let task = client.last_created().unwrap().task;
    assert!(task.target.as_http().is_none());
    let request = task
        .target
        .as_app_engine()
        .expect("app engine mode uses an App Engine target");
    assert_eq!(request.relative_uri, "/handle-task");
    assert_eq!(
        request.app_engine_routing.as_ref().map(|r| r.service.as_str()),
        Some("worker")
    );
}

/// App Engine mode without a service leaves routing unset
#[tokio::test]
async fn test_app_engine_mode_without_service() {
    let config = CloudTasksConfig::new(PROJECT, LOCATION, "default").with_app_engine(None);
    let (queue, client) = create_queue(config);

    queue
        .push_raw(send_email_payload("ae-2"), None, PushOptions::new())
        .await
        .unwrap();

    match client.last_created().unwrap().task.target {
        RequestTarget::AppEngine(request) => assert!(request.app_engine_routing.is_none()),
        RequestTarget::Http(_) => panic!("expected an App Engine target"),
    }
}

/// Typed jobs go through the payload factory
#[tokio::test]
async fn test_push_job_builds_payload() {
    let (queue, client) = create_queue(direct_config());

    let id = queue
        .push_job(&SendEmail { to: "a@b.c".into() }, Some("emails"))
        .await
        .unwrap();

    let body = body_of(&client.last_created().unwrap().task);
    assert_eq!(body["uuid"], id.as_str());
    assert_eq!(body["displayName"], "App\\Jobs\\SendEmail");
    assert_eq!(body["job"]["to"], "a@b.c");
    assert_eq!(body["maxTries"], 3);
    assert_eq!(body["internal"]["attempts"], 0);
}

/// `later` schedules relative to now; past instants dispatch immediately
#[tokio::test]
async fn test_later_schedules_future_only() {
    let (queue, client) = create_queue(direct_config());
    let job = JobDescriptor::of(&SendEmail { to: "a@b.c".into() }).unwrap();

    queue
        .later(Delay::from(Duration::from_secs(300)), job.clone(), Value::Null, None)
        .await
        .unwrap();
    let scheduled = client.last_created().unwrap().task.schedule_time.unwrap();
    assert!(scheduled > Utc::now() + chrono::Duration::seconds(290));

    queue
        .later(
            Delay::At(Utc::now() - chrono::Duration::minutes(5)),
            job,
            Value::Null,
            None,
        )
        .await
        .unwrap();
    assert!(client.last_created().unwrap().task.schedule_time.is_none());
}

/// A remote failure reaches the caller and nothing is recorded
#[tokio::test]
async fn test_remote_failure_propagates() {
    let (queue, client) = create_queue(direct_config());
    client.fail_next("PERMISSION_DENIED");

    let result = queue
        .push_raw(send_email_payload("x"), None, PushOptions::new())
        .await;

    assert_eq!(result, Err(QueueError::Remote("PERMISSION_DENIED".into())));
    assert!(client.created().is_empty());
}

/// Malformed payloads fail before the remote call
#[tokio::test]
async fn test_invalid_payloads_fail_locally() {
    let (queue, client) = create_queue(direct_config());

    let missing_name = queue
        .push_raw(json!({ "uuid": "u" }).to_string(), None, PushOptions::new())
        .await;
    assert_eq!(missing_name, Err(QueueError::MissingField("displayName")));

    let missing_uuid = queue
        .push_raw(
            json!({ "displayName": "SendEmail" }).to_string(),
            None,
            PushOptions::new(),
        )
        .await;
    assert_eq!(missing_uuid, Err(QueueError::MissingField("uuid")));

    let not_json = queue
        .push_raw("not json".to_string(), None, PushOptions::new())
        .await;
    assert!(matches!(not_json, Err(QueueError::SerializationError(_))));

    assert!(client.created().is_empty());
}

/// Direct mode needs a handler or an application URL
#[tokio::test]
async fn test_unresolvable_handler() {
    let config = CloudTasksConfig::new(PROJECT, LOCATION, "default")
        .with_service_account(SERVICE_ACCOUNT);
    let (queue, client) = create_queue(config);

    assert!(matches!(queue.get_handler(), Err(QueueError::HandlerUnresolved)));
    let result = queue
        .push_raw(send_email_payload("x"), None, PushOptions::new())
        .await;
    assert!(matches!(result, Err(QueueError::HandlerUnresolved)));
    assert!(client.created().is_empty());
}

/// Handler resolution appends the callback path exactly once
#[test]
fn test_get_handler() {
    let (queue, _) = create_queue(direct_config());
    assert_eq!(queue.get_handler().unwrap(), "https://worker.example.com/handle-task");

    let config = direct_config().with_handler("https://worker.example.com/handle-task/");
    let (queue, _) = create_queue(config);
    assert_eq!(queue.get_handler().unwrap(), "https://worker.example.com/handle-task");

    let config = CloudTasksConfig::new(PROJECT, LOCATION, "default")
        .with_service_account(SERVICE_ACCOUNT)
        .with_app_url("https://app.example.com/");
    let (queue, _) = create_queue(config);
    assert_eq!(queue.get_handler().unwrap(), "https://app.example.com/handle-task");
}

struct RoutedUrls;

impl UrlGenerator for RoutedUrls {
    fn handler_path(&self) -> String {
        "/_tasks/run".to_string()
    }

    fn root_url(&self) -> Option<String> {
        Some("https://routed.example.com".to_string())
    }
}

/// A custom URL generator drives both delivery modes
#[tokio::test]
async fn test_custom_url_generator() {
    let client = Arc::new(RecordingClient::new());
    let queue = CloudTasksQueue::new(app_engine_config(), client.clone())
        .unwrap()
        .with_url_generator(Arc::new(RoutedUrls));

    queue
        .push_raw(send_email_payload("r"), None, PushOptions::new())
        .await
        .unwrap();

    let task = client.last_created().unwrap().task;
    assert_eq!(task.target.as_app_engine().unwrap().relative_uri, "/_tasks/run");

    let config = CloudTasksConfig::new(PROJECT, LOCATION, "default")
        .with_service_account(SERVICE_ACCOUNT);
    let queue = CloudTasksQueue::new(config, client.clone())
        .unwrap()
        .with_url_generator(Arc::new(RoutedUrls));
    assert_eq!(queue.get_handler().unwrap(), "https://routed.example.com/_tasks/run");

    queue
        .push_raw(send_email_payload("d"), None, PushOptions::new())
        .await
        .unwrap();

    let task = client.last_created().unwrap().task;
    assert_eq!(
        task.target.as_http().unwrap().url,
        "https://routed.example.com/_tasks/run"
    );
}

/// Computed headers see the enriched payload
#[tokio::test]
async fn test_computed_task_headers() {
    let (mut queue, client) = create_queue(direct_config());
    queue.set_task_headers(dog_cloud_tasks::HeaderProvider::computed(|payload| {
        let mut headers = dog_cloud_tasks::Headers::new();
        if let Ok(uuid) = payload.uuid() {
            headers.insert("X-Job-Id".to_string(), uuid.to_string());
        }
        if let Some(internal) = payload.internal() {
            headers.insert("X-Queue".to_string(), internal.queue);
        }
        headers
    }));

    queue
        .push_raw(send_email_payload("hdr-1"), Some("emails"), PushOptions::new())
        .await
        .unwrap();

    let task = client.last_created().unwrap().task;
    let headers = task.target.headers();
    assert_eq!(headers.get("X-Job-Id").map(String::as_str), Some("hdr-1"));
    assert_eq!(headers.get("X-Queue").map(String::as_str), Some("emails"));
}

/// Delete reaches the client and observers
#[tokio::test]
async fn test_delete_and_events() {
    let broadcaster = EventBroadcaster::new(16);
    let mut events = broadcaster.subscribe();

    let client = Arc::new(RecordingClient::new());
    let queue = CloudTasksQueue::new(direct_config(), client.clone())
        .unwrap()
        .with_observer(Arc::new(broadcaster));

    queue
        .push_raw(send_email_payload("ev-1"), Some("emails"), PushOptions::new())
        .await
        .unwrap();
    let created = client.last_created().unwrap().task;

    let delivered = DeliveredJob::from_raw(body_of(&created).to_string()).unwrap();
    queue.delete(&delivered).await.unwrap();
    assert_eq!(client.deleted(), vec![created.name.clone()]);

    match events.recv().await.unwrap() {
        TaskEvent::Created { queue, task_name, scheduled_at, .. } => {
            assert_eq!(queue, "emails");
            assert_eq!(task_name, created.name);
            assert!(scheduled_at.is_none());
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(events.recv().await.unwrap().event_name(), "deleted");
}

/// Closure observers see each created task once
#[tokio::test]
async fn test_fn_observer() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let client = Arc::new(RecordingClient::new());
    let queue = CloudTasksQueue::new(direct_config(), client)
        .unwrap()
        .with_observer(Arc::new(FnObserver(move |queue: &str, task: &Task| {
            sink.lock().unwrap().push((queue.to_string(), task.name.clone()));
        })));

    queue
        .push_raw(send_email_payload("fn-1"), Some("emails"), PushOptions::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "emails");
}

/// Pull operations are inert
#[tokio::test]
async fn test_pop_and_size() {
    let (queue, client) = create_queue(direct_config());
    queue
        .push_raw(send_email_payload("p"), None, PushOptions::new())
        .await
        .unwrap();

    assert!(queue.pop(None).await.unwrap().is_none());
    assert_eq!(queue.size(None).await.unwrap(), 0);
    assert_eq!(client.created().len(), 1);
}
