//! Callback URL resolution.
//!
//! Route and URL generation belong to the web layer hosting the job handler,
//! so the adapter only sees them through [`UrlGenerator`].

use crate::{QueueError, QueueResult};

/// The web layer's view of where the inbound task handler lives
pub trait UrlGenerator: Send + Sync {
    /// Path of the handler route relative to the application root
    fn handler_path(&self) -> String;

    /// Scheme and host of the current request or application, if known
    fn root_url(&self) -> Option<String>;
}

/// Fixed URLs, built from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticUrls {
    root: Option<String>,
    handler_path: String,
}

impl StaticUrls {
    pub fn new(root: Option<String>, callback_path: &str) -> Self {
        Self {
            root,
            handler_path: format!("/{}", callback_path.trim_matches('/')),
        }
    }
}

impl UrlGenerator for StaticUrls {
    fn handler_path(&self) -> String {
        self.handler_path.clone()
    }

    fn root_url(&self) -> Option<String> {
        self.root.clone()
    }
}

/// Trim trailing slashes and append `callback_path` unless it is already the suffix
pub fn normalize_handler(base: &str, callback_path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = callback_path.trim_matches('/');
    if path.is_empty() || base.ends_with(&format!("/{path}")) {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Callback URL for direct mode.
///
/// Uses the explicit handler when configured, otherwise the root URL reported
/// by `urls`. The route appended is always `urls.handler_path()`, the same
/// one App Engine mode posts to.
pub fn resolve_handler(
    explicit: Option<&str>,
    urls: &dyn UrlGenerator,
) -> QueueResult<String> {
    let base = match explicit.map(str::trim).filter(|h| !h.is_empty()) {
        Some(handler) => handler.to_string(),
        None => urls
            .root_url()
            .filter(|root| !root.trim().is_empty())
            .ok_or(QueueError::HandlerUnresolved)?,
    };
    Ok(normalize_handler(&base, &urls.handler_path()))
}
