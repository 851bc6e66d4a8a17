//! Fallback request engine: picks the first origin, runs the attempt under a
//! deadline and retries the other origin once when the first was unreachable.
//!
//! Rules:
//!  * `prefer_local` tries local first for this call only.
//!  * Otherwise the sticky base goes first; before first contact that is local.
//!  * Only connectivity failures (timeout, no response) move on to the other
//!    origin. An HTTP error status is an answer and is returned as-is.
//!  * Whichever origin answers becomes the sticky base.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;

use crate::credentials::CredentialStore;
use crate::error::{is_connectivity_failure, Result};
use crate::network::{Origin, Origins};
use crate::selector::BaseSelector;
use crate::timeout::{with_timeout, DEFAULT_TIMEOUT_MS};
use crate::transport::{Attempt, RawResponse, Transport};

/// Call-scoped options. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub prefer_local: bool,
    /// Per-attempt deadline; `None` uses the client default.
    pub timeout: Option<Duration>,
    pub no_auth: bool,
    /// Merged under the computed headers.
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefer_local(mut self) -> Self {
        self.prefer_local = true;
        self
    }

    pub fn no_auth(mut self) -> Self {
        self.no_auth = true;
        self
    }

    /// Zero is not a usable deadline and is treated as "use the default".
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = if ms == 0 { None } else { Some(Duration::from_millis(ms)) };
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Verb, headers and encoded body, ready to be aimed at either origin.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
    /// Attach the attempted origin's bearer token.
    pub with_auth: bool,
}

impl Outbound {
    pub fn new(method: Method) -> Self {
        Outbound {
            method,
            headers: HeaderMap::new(),
            body: None,
            with_auth: false,
        }
    }
}

pub struct FallbackEngine {
    origins: Origins,
    selector: Arc<BaseSelector>,
    credentials: CredentialStore,
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
}

impl FallbackEngine {
    pub fn new(
        origins: Origins,
        selector: Arc<BaseSelector>,
        credentials: CredentialStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        FallbackEngine {
            origins,
            selector,
            credentials,
            transport,
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.default_timeout = timeout;
        }
        self
    }

    pub fn origins(&self) -> &Origins {
        &self.origins
    }

    pub fn selector(&self) -> &BaseSelector {
        &self.selector
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Origin tried first for a call with these options.
    pub fn first_origin(&self, prefer_local: bool) -> Origin {
        if prefer_local {
            return Origin::Local;
        }
        self.selector.sticky().unwrap_or(Origin::Local)
    }

    /// Sends `outbound` to `path`, falling back to the other origin at most once.
    pub async fn fetch(
        &self,
        path: &str,
        outbound: &Outbound,
        prefer_local: bool,
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let deadline = timeout.filter(|t| !t.is_zero()).unwrap_or(self.default_timeout);
        let first = self.first_origin(prefer_local);

        match self.attempt(first, path, outbound, deadline).await {
            Ok(res) => Ok(res),
            Err(err) if is_connectivity_failure(&err) => {
                let second = first.other();
                log::warn!(
                    "{} unreachable; trying {} once: {}",
                    first.label(),
                    second.label(),
                    err
                );
                self.attempt(second, path, outbound, deadline).await
            }
            Err(err) => Err(err),
        }
    }

    async fn attempt(
        &self,
        origin: Origin,
        path: &str,
        outbound: &Outbound,
        deadline: Duration,
    ) -> Result<RawResponse> {
        let url = self.origins.join(origin, path);
        log::debug!(
            "Trying {} -> {} {} (timeout {}ms)",
            origin.label(),
            outbound.method,
            url,
            deadline.as_millis()
        );

        let mut headers = outbound.headers.clone();
        if outbound.with_auth {
            headers.extend(self.credentials.auth_header(origin));
        }
        let attempt = Attempt {
            origin,
            method: outbound.method.clone(),
            url,
            headers,
            body: outbound.body.clone(),
        };

        let res = with_timeout(self.transport.send(attempt), deadline).await?;
        self.selector.set(origin);
        Ok(res)
    }
}
