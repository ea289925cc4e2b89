//! # Cloud Tasks connection configuration
//!
//! [`CloudTasksConfig`] is an immutable value handed to
//! [`CloudTasksQueue::new`](crate::CloudTasksQueue::new). It can be built in
//! code, deserialized with serde, or read from the environment using the
//! DogRS convention where a double underscore separates segments:
//!
//! ```bash
//! export TASKS__PROJECT=my-project
//! export TASKS__LOCATION=europe-west1
//! export TASKS__QUEUE=default
//! export TASKS__SERVICE_ACCOUNT_EMAIL=tasks@my-project.iam.gserviceaccount.com
//! ```
//!
//! ```rust,no_run
//! use dog_cloud_tasks::CloudTasksConfig;
//!
//! let config = CloudTasksConfig::from_env("TASKS").unwrap();
//! assert!(!config.app_engine);
//! ```
//!
//! Exactly one delivery mode is active per configuration: App Engine routing
//! when `app_engine` is true, otherwise direct HTTP with an OIDC token minted
//! for `service_account_email`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{QueueError, QueueIdentity, QueueResult};

/// Connection name written into `internal.connection` when none is configured
pub const DEFAULT_CONNECTION: &str = "cloudtasks";

/// Path segment the inbound task handler listens on
pub const DEFAULT_CALLBACK_PATH: &str = "handle-task";

/// Shortest dispatch deadline Cloud Tasks accepts
pub const MIN_DISPATCH_DEADLINE: Duration = Duration::from_secs(15);

/// Longest dispatch deadline for HTTP targets
pub const MAX_HTTP_DISPATCH_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Longest dispatch deadline for App Engine targets
pub const MAX_APP_ENGINE_DISPATCH_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudTasksConfig {
    /// GCP project id
    pub project: String,
    /// Cloud Tasks location (e.g. "europe-west1")
    pub location: String,
    /// Default queue name
    pub queue: String,
    /// Seconds Cloud Tasks waits for the callback before retrying
    #[serde(default)]
    pub dispatch_deadline: Option<u64>,
    /// Deliver through App Engine routing instead of a direct URL
    #[serde(default)]
    pub app_engine: bool,
    /// App Engine service that should receive callbacks
    #[serde(default)]
    pub app_engine_service: Option<String>,
    /// Identity Cloud Tasks mints OIDC tokens for in direct mode
    #[serde(default)]
    pub service_account_email: Option<String>,
    /// Explicit callback base URL for direct mode
    #[serde(default)]
    pub handler: Option<String>,
    /// Root URL of the running application, used when `handler` is unset
    #[serde(default)]
    pub app_url: Option<String>,
    /// Connection name reported to the job handler
    #[serde(default = "default_connection")]
    pub connection: String,
    /// Path segment appended to the handler URL
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
}

fn default_connection() -> String {
    DEFAULT_CONNECTION.to_string()
}

fn default_callback_path() -> String {
    DEFAULT_CALLBACK_PATH.to_string()
}

impl CloudTasksConfig {
    /// Create a direct-mode configuration with required fields
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            queue: queue.into(),
            dispatch_deadline: None,
            app_engine: false,
            app_engine_service: None,
            service_account_email: None,
            handler: None,
            app_url: None,
            connection: default_connection(),
            callback_path: default_callback_path(),
        }
    }

    pub fn with_service_account(mut self, email: impl Into<String>) -> Self {
        self.service_account_email = Some(email.into());
        self
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = Some(url.into());
        self
    }

    /// Switch to App Engine routing, optionally pinned to a service
    pub fn with_app_engine(mut self, service: Option<String>) -> Self {
        self.app_engine = true;
        self.app_engine_service = service;
        self
    }

    pub fn with_dispatch_deadline(mut self, seconds: u64) -> Self {
        self.dispatch_deadline = Some(seconds);
        self
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = path.into();
        self
    }

    /// Dispatch deadline as a duration
    pub fn dispatch_deadline(&self) -> Option<Duration> {
        self.dispatch_deadline.map(Duration::from_secs)
    }

    /// Queue identity for the default queue
    pub fn identity(&self) -> QueueIdentity {
        QueueIdentity::new(&self.project, &self.location, &self.queue)
    }

    /// Queue identity for a named queue in the same project and location
    pub fn identity_for(&self, queue: &str) -> QueueIdentity {
        QueueIdentity::new(&self.project, &self.location, queue)
    }

    /// Check the configuration before it is used to build tasks
    pub fn validate(&self) -> QueueResult<()> {
        if self.project.trim().is_empty() {
            return Err(QueueError::configuration("project cannot be empty"));
        }
        if self.location.trim().is_empty() {
            return Err(QueueError::configuration("location cannot be empty"));
        }
        if self.queue.trim().is_empty() {
            return Err(QueueError::configuration("queue cannot be empty"));
        }
        if !self.app_engine
            && self
                .service_account_email
                .as_deref()
                .map_or(true, |email| email.trim().is_empty())
        {
            return Err(QueueError::configuration(
                "service_account_email is required when app_engine is disabled",
            ));
        }
        if let Some(deadline) = self.dispatch_deadline() {
            let max = if self.app_engine {
                MAX_APP_ENGINE_DISPATCH_DEADLINE
            } else {
                MAX_HTTP_DISPATCH_DEADLINE
            };
            if deadline < MIN_DISPATCH_DEADLINE || deadline > max {
                return Err(QueueError::configuration(format!(
                    "dispatch_deadline must be between {}s and {}s, got {}s",
                    MIN_DISPATCH_DEADLINE.as_secs(),
                    max.as_secs(),
                    deadline.as_secs()
                )));
            }
        }
        Ok(())
    }

    /// Build a configuration from lowercase `key -> value` pairs
    pub fn from_map(values: &HashMap<String, String>) -> QueueResult<Self> {
        let required = |key: &'static str| {
            values
                .get(key)
                .cloned()
                .ok_or_else(|| QueueError::configuration(format!("missing key: {key}")))
        };
        let optional = |key: &str| values.get(key).filter(|v| !v.is_empty()).cloned();

        let mut config = Self::new(
            required("project")?,
            required("location")?,
            required("queue")?,
        );

        if let Some(raw) = optional("dispatch_deadline") {
            let seconds = raw.parse::<u64>().map_err(|_| {
                QueueError::configuration(format!("dispatch_deadline is not a number: {raw}"))
            })?;
            config.dispatch_deadline = Some(seconds);
        }
        if let Some(raw) = optional("app_engine") {
            config.app_engine = parse_bool(&raw).ok_or_else(|| {
                QueueError::configuration(format!("app_engine is not a boolean: {raw}"))
            })?;
        }
        config.app_engine_service = optional("app_engine_service");
        config.service_account_email = optional("service_account_email");
        config.handler = optional("handler");
        config.app_url = optional("app_url");
        if let Some(connection) = optional("connection") {
            config.connection = connection;
        }
        if let Some(path) = optional("callback_path") {
            config.callback_path = path;
        }

        Ok(config)
    }

    /// Read `PREFIX__KEY` variables from the process environment
    pub fn from_env(prefix: &str) -> QueueResult<Self> {
        let marker = format!("{prefix}__");
        let values: HashMap<String, String> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(&marker)
                    .map(|stripped| (stripped.to_lowercase(), value))
            })
            .collect();
        Self::from_map(&values)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct() -> CloudTasksConfig {
        CloudTasksConfig::new("my-project", "europe-west1", "default")
            .with_service_account("tasks@my-project.iam.gserviceaccount.com")
    }

    #[test]
    fn direct_mode_requires_service_account() {
        let config = CloudTasksConfig::new("p", "l", "q");
        assert!(matches!(config.validate(), Err(QueueError::Configuration(_))));
        assert!(direct().validate().is_ok());
    }

    #[test]
    fn app_engine_mode_needs_no_service_account() {
        let config = CloudTasksConfig::new("p", "l", "q").with_app_engine(None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_identity_fields_are_rejected() {
        for config in [
            CloudTasksConfig::new("", "l", "q").with_service_account("sa"),
            CloudTasksConfig::new("p", " ", "q").with_service_account("sa"),
            CloudTasksConfig::new("p", "l", "").with_service_account("sa"),
        ] {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn dispatch_deadline_bounds_depend_on_mode() {
        assert!(direct().with_dispatch_deadline(10).validate().is_err());
        assert!(direct().with_dispatch_deadline(1800).validate().is_ok());
        assert!(direct().with_dispatch_deadline(3600).validate().is_err());

        let app_engine = CloudTasksConfig::new("p", "l", "q").with_app_engine(None);
        assert!(app_engine.with_dispatch_deadline(3600).validate().is_ok());
    }

    #[test]
    fn from_map_reads_all_keys() {
        let values: HashMap<String, String> = [
            ("project", "p"),
            ("location", "l"),
            ("queue", "q"),
            ("dispatch_deadline", "120"),
            ("app_engine", "true"),
            ("app_engine_service", "worker"),
            ("handler", ""),
            ("connection", "tasks"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = CloudTasksConfig::from_map(&values).unwrap();
        assert_eq!(config.dispatch_deadline(), Some(Duration::from_secs(120)));
        assert!(config.app_engine);
        assert_eq!(config.app_engine_service.as_deref(), Some("worker"));
        assert_eq!(config.handler, None);
        assert_eq!(config.connection, "tasks");
        assert_eq!(config.callback_path, DEFAULT_CALLBACK_PATH);
    }

    #[test]
    fn from_map_reports_missing_and_malformed_keys() {
        let mut values = HashMap::new();
        values.insert("project".to_string(), "p".to_string());
        assert!(CloudTasksConfig::from_map(&values).is_err());

        values.insert("location".to_string(), "l".to_string());
        values.insert("queue".to_string(), "q".to_string());
        values.insert("dispatch_deadline".to_string(), "soon".to_string());
        assert!(CloudTasksConfig::from_map(&values).is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: CloudTasksConfig = serde_json::from_str(
            r#"{"project":"p","location":"l","queue":"q","service_account_email":"sa"}"#,
        )
        .unwrap();
        assert!(!config.app_engine);
        assert_eq!(config.connection, DEFAULT_CONNECTION);
        assert_eq!(config.identity().queue_path(), "projects/p/locations/l/queues/q");
    }
}
