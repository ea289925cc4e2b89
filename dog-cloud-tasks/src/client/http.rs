//! Cloud Tasks v2 REST client.
//!
//! Credentials come from the environment through `gcp_auth` (service account
//! key, workload identity or the metadata server). Only compiled with the
//! `gcp` feature.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use gcp_auth::TokenProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CloudTasksClient;
use crate::types::{AppEngineHttpRequest, HttpRequest, RequestTarget};
use crate::{QueueError, QueueResult, Task, TaskName};

const DEFAULT_ENDPOINT: &str = "https://cloudtasks.googleapis.com/v2";
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Cloud Tasks API request body for creating a task
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest {
    task: WireTask,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTask {
    name: String,
    #[serde(flatten)]
    target: WireTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dispatch_deadline: Option<String>,
}

/// Externally tagged, so exactly one of `appEngineHttpRequest` / `httpRequest` is emitted
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum WireTarget {
    AppEngineHttpRequest(WireAppEngineRequest),
    HttpRequest(WireHttpRequest),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAppEngineRequest {
    relative_uri: String,
    http_method: &'static str,
    headers: BTreeMap<String, String>,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_engine_routing: Option<WireAppEngineRouting>,
}

#[derive(Debug, Serialize)]
struct WireAppEngineRouting {
    service: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireHttpRequest {
    url: String,
    http_method: &'static str,
    headers: BTreeMap<String, String>,
    body: String,
    oidc_token: WireOidcToken,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireOidcToken {
    service_account_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    name: String,
}

/// Formats a duration as a Cloud Tasks API duration string
pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let nanos = duration.subsec_nanos();
    if nanos == 0 {
        return format!("{secs}s");
    }

    let mut fractional = format!("{nanos:09}");
    while fractional.ends_with('0') {
        fractional.pop();
    }

    format!("{secs}.{fractional}s")
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn encode_body(body: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(body)
}

impl From<&Task> for WireTask {
    fn from(task: &Task) -> Self {
        let target = match &task.target {
            RequestTarget::AppEngine(AppEngineHttpRequest {
                relative_uri,
                http_method,
                body,
                headers,
                app_engine_routing,
            }) => WireTarget::AppEngineHttpRequest(WireAppEngineRequest {
                relative_uri: relative_uri.clone(),
                http_method: http_method.as_str(),
                headers: headers.clone(),
                body: encode_body(body),
                app_engine_routing: app_engine_routing.as_ref().map(|routing| {
                    WireAppEngineRouting {
                        service: routing.service.clone(),
                    }
                }),
            }),
            RequestTarget::Http(HttpRequest {
                url,
                http_method,
                body,
                headers,
                oidc_token,
            }) => WireTarget::HttpRequest(WireHttpRequest {
                url: url.clone(),
                http_method: http_method.as_str(),
                headers: headers.clone(),
                body: encode_body(body),
                oidc_token: WireOidcToken {
                    service_account_email: oidc_token.service_account_email.clone(),
                    audience: oidc_token.audience.clone(),
                },
            }),
        };

        Self {
            name: task.name.to_string(),
            target,
            schedule_time: task.schedule_time.map(format_timestamp),
            dispatch_deadline: task.dispatch_deadline.map(format_duration),
        }
    }
}

/// Cloud Tasks client over the v2 REST API
pub struct HttpCloudTasksClient {
    token_provider: Arc<dyn TokenProvider>,
    client: reqwest::Client,
    endpoint: String,
}

// Manual Debug implementation since TokenProvider doesn't implement Debug
impl std::fmt::Debug for HttpCloudTasksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCloudTasksClient")
            .field("token_provider", &"<TokenProvider>")
            .field("client", &self.client)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpCloudTasksClient {
    /// Create a client using credentials discovered from the environment
    pub async fn new() -> QueueResult<Self> {
        let token_provider = gcp_auth::provider().await.map_err(|e| {
            QueueError::configuration(format!("Failed to initialize GCP auth: {e}"))
        })?;
        Self::with_token_provider(token_provider)
    }

    pub fn with_token_provider(token_provider: Arc<dyn TokenProvider>) -> QueueResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| QueueError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            token_provider,
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Point at another endpoint, e.g. a local Cloud Tasks emulator
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    async fn access_token(&self) -> QueueResult<String> {
        let token = self
            .token_provider
            .token(SCOPES)
            .await
            .map_err(|e| QueueError::remote(format!("Failed to get GCP access token: {e}")))?;
        Ok(token.as_str().to_string())
    }

    async fn error_from(response: reqwest::Response) -> QueueError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => QueueError::remote(format!(
                "Cloud Tasks API error: {} ({})",
                parsed.error.message, parsed.error.status
            )),
            Err(_) => QueueError::remote(format!("Cloud Tasks API error: {status} - {body}")),
        }
    }
}

#[async_trait]
impl CloudTasksClient for HttpCloudTasksClient {
    async fn create_task(&self, queue_path: &str, task: Task) -> QueueResult<Task> {
        let request = CreateTaskRequest {
            task: WireTask::from(&task),
        };
        let access_token = self.access_token().await?;
        let url = format!("{}/{}/tasks", self.endpoint, queue_path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| QueueError::remote(format!("Cloud Tasks API request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let created: CreatedResponse = response
            .json()
            .await
            .map_err(|e| QueueError::remote(format!("Failed to parse create response: {e}")))?;

        debug!("Cloud Tasks accepted task {}", created.name);
        Ok(Task {
            name: TaskName(created.name),
            ..task
        })
    }

    async fn delete_task(&self, task_name: &TaskName) -> QueueResult<()> {
        let access_token = self.access_token().await?;
        let url = format!("{}/{}", self.endpoint, task_name);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| QueueError::remote(format!("Cloud Tasks API request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Task {} already gone", task_name);
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }
}
