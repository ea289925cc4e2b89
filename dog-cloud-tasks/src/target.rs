use std::fmt;
use std::sync::Arc;

use crate::handler::{resolve_handler, UrlGenerator};
use crate::payload::JobPayload;
use crate::types::{
    AppEngineHttpRequest, AppEngineRouting, Headers, HttpMethod, HttpRequest, OidcToken,
    RequestTarget,
};
use crate::{CloudTasksConfig, QueueError, QueueResult};

type HeaderFn = dyn Fn(&JobPayload) -> Headers + Send + Sync;

/// Source of the headers attached to every callback
#[derive(Clone)]
pub enum HeaderProvider {
    /// Same headers for every task
    Fixed(Headers),
    /// Headers computed from each payload
    Computed(Arc<HeaderFn>),
}

impl HeaderProvider {
    pub fn fixed(headers: Headers) -> Self {
        Self::Fixed(headers)
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&JobPayload) -> Headers + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    pub fn resolve(&self, payload: &JobPayload) -> Headers {
        match self {
            Self::Fixed(headers) => headers.clone(),
            Self::Computed(f) => f(payload),
        }
    }
}

impl Default for HeaderProvider {
    fn default() -> Self {
        Self::Fixed(Headers::new())
    }
}

impl fmt::Debug for HeaderProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(headers) => f.debug_tuple("Fixed").field(headers).finish(),
            Self::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

impl From<Headers> for HeaderProvider {
    fn from(headers: Headers) -> Self {
        Self::Fixed(headers)
    }
}

/// Builds the callback request for a payload according to the configured mode
pub struct RequestTargetBuilder<'a> {
    config: &'a CloudTasksConfig,
    urls: &'a dyn UrlGenerator,
}

impl<'a> RequestTargetBuilder<'a> {
    pub fn new(config: &'a CloudTasksConfig, urls: &'a dyn UrlGenerator) -> Self {
        Self { config, urls }
    }

    pub fn build(
        &self,
        payload: &JobPayload,
        headers: &HeaderProvider,
    ) -> QueueResult<RequestTarget> {
        let body = payload.to_vec()?;
        let headers = headers.resolve(payload);

        if self.config.app_engine {
            return Ok(RequestTarget::AppEngine(AppEngineHttpRequest {
                relative_uri: self.urls.handler_path(),
                http_method: HttpMethod::Post,
                body,
                headers,
                app_engine_routing: self
                    .config
                    .app_engine_service
                    .as_deref()
                    .filter(|service| !service.is_empty())
                    .map(|service| AppEngineRouting {
                        service: service.to_string(),
                    }),
            }));
        }

        let service_account_email = self
            .config
            .service_account_email
            .clone()
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                QueueError::configuration("service_account_email is required in direct mode")
            })?;

        Ok(RequestTarget::Http(HttpRequest {
            url: resolve_handler(self.config.handler.as_deref(), self.urls)?,
            http_method: HttpMethod::Post,
            body,
            headers,
            oidc_token: OidcToken {
                service_account_email,
                audience: None,
            },
        }))
    }
}
