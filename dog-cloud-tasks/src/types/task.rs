use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

use super::TaskName;

/// HTTP headers attached to the callback request
pub type Headers = BTreeMap<String, String>;

/// HTTP method used for callbacks. Cloud Tasks callbacks are always POSTs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    #[default]
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
        }
    }
}

/// Routing hint asking App Engine to deliver to a specific service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEngineRouting {
    pub service: String,
}

/// Callback delivered through App Engine's internal routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEngineHttpRequest {
    pub relative_uri: String,
    pub http_method: HttpMethod,
    pub body: Vec<u8>,
    pub headers: Headers,
    pub app_engine_routing: Option<AppEngineRouting>,
}

/// Identity whose OIDC token Cloud Tasks mints and presents to the callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcToken {
    pub service_account_email: String,
    /// Defaults to the target URL on the remote side when unset
    pub audience: Option<String>,
}

/// Callback addressed directly by URL and authenticated with an OIDC token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub http_method: HttpMethod,
    pub body: Vec<u8>,
    pub headers: Headers,
    pub oidc_token: OidcToken,
}

/// The request a task performs when it fires. Exactly one variant per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    AppEngine(AppEngineHttpRequest),
    Http(HttpRequest),
}

impl RequestTarget {
    pub fn body(&self) -> &[u8] {
        match self {
            Self::AppEngine(req) => &req.body,
            Self::Http(req) => &req.body,
        }
    }

    pub fn headers(&self) -> &Headers {
        match self {
            Self::AppEngine(req) => &req.headers,
            Self::Http(req) => &req.headers,
        }
    }

    pub fn http_method(&self) -> HttpMethod {
        match self {
            Self::AppEngine(req) => req.http_method,
            Self::Http(req) => req.http_method,
        }
    }

    pub fn as_app_engine(&self) -> Option<&AppEngineHttpRequest> {
        match self {
            Self::AppEngine(req) => Some(req),
            Self::Http(_) => None,
        }
    }

    pub fn as_http(&self) -> Option<&HttpRequest> {
        match self {
            Self::Http(req) => Some(req),
            Self::AppEngine(_) => None,
        }
    }
}

/// A Cloud Tasks task as submitted to the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    pub target: RequestTarget,
    pub dispatch_deadline: Option<Duration>,
    pub schedule_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task that runs as soon as possible
    pub fn new(name: TaskName, target: RequestTarget) -> Self {
        Self {
            name,
            target,
            dispatch_deadline: None,
            schedule_time: None,
        }
    }

    /// Set how long the remote service waits for the callback to answer
    pub fn with_dispatch_deadline(mut self, deadline: Duration) -> Self {
        self.dispatch_deadline = Some(deadline);
        self
    }

    /// Set when the task should fire
    pub fn with_schedule_time(mut self, at: DateTime<Utc>) -> Self {
        self.schedule_time = Some(at);
        self
    }

    /// Callback body decoded as JSON
    pub fn body_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(self.target.body())
    }
}
