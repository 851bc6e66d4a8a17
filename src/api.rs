//! Public client for the Card Study backend: base/token accessors, JSON verb
//! helpers and the health probe. Every call goes through the fallback engine.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::engine::{FallbackEngine, Outbound, RequestOptions};
use crate::envelope::handle_json;
use crate::error::{Error, Result};
use crate::network::{Origin, Origins};
use crate::selector::BaseSelector;
use crate::storage::Storage;
use crate::transport::{RawResponse, ReqwestTransport, Transport};

const APPLICATION_JSON: &str = "application/json";

#[derive(Clone)]
pub struct ApiClient {
    engine: Arc<FallbackEngine>,
    health_path: String,
}

impl ApiClient {
    /// Builds a client from its parts. `session` holds the sticky base, `durable`
    /// holds the tokens.
    pub fn new(
        origins: Origins,
        session: Arc<dyn Storage>,
        durable: Arc<dyn Storage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let selector = Arc::new(BaseSelector::new(session));
        let credentials = CredentialStore::new(durable);
        ApiClient {
            engine: Arc::new(FallbackEngine::new(origins, selector, credentials, transport)),
            health_path: "/health".to_string(),
        }
    }

    /// Client wired from configuration with the `reqwest` transport.
    pub fn from_config(cfg: &ClientConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        let engine = FallbackEngine::new(
            cfg.origins(),
            Arc::new(BaseSelector::new(cfg.session_storage())),
            CredentialStore::new(cfg.token_storage()),
            transport,
        )
        .with_default_timeout(cfg.timeout());
        Ok(ApiClient {
            engine: Arc::new(engine),
            health_path: cfg.health_path.clone(),
        })
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    // --- Base selection ---

    pub fn active_base(&self) -> Origin {
        self.engine.selector().active()
    }

    pub fn sticky_base(&self) -> Option<Origin> {
        self.engine.selector().sticky()
    }

    pub fn force_base(&self, origin: Origin) {
        self.engine.selector().force(origin);
    }

    pub fn reset_base(&self) {
        self.engine.selector().reset();
    }

    pub fn connected_label(&self) -> &'static str {
        self.engine.selector().label()
    }

    pub fn current_base_url(&self) -> &str {
        self.engine.origins().url_for(self.active_base())
    }

    // --- Tokens ---

    pub fn get_token(&self, origin: Origin) -> Option<String> {
        self.engine.credentials().get_token(origin)
    }

    pub fn set_token(&self, token: Option<&str>, origin: Origin) {
        self.engine.credentials().set_token(token, origin);
    }

    pub fn clear_all_tokens(&self) {
        self.engine.credentials().clear_all();
    }

    pub fn auth_header(&self, origin: Origin) -> HeaderMap {
        self.engine.credentials().auth_header(origin)
    }

    // --- Requests ---

    /// Raw fallback fetch; the caller inspects the status itself.
    pub async fn fetch(&self, path: &str, method: Method, opts: &RequestOptions) -> Result<RawResponse> {
        let mut outbound = Outbound::new(method);
        outbound.headers = opts.headers.clone();
        outbound.with_auth = !opts.no_auth;
        self.engine.fetch(path, &outbound, opts.prefer_local, opts.timeout).await
    }

    pub async fn request_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: &RequestOptions,
    ) -> Result<Value> {
        let carries_body = method != Method::GET && method != Method::HEAD;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        headers.extend(opts.headers.clone());
        if carries_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        }

        let encoded = if carries_body {
            Some(match body {
                Some(b) => serde_json::to_string(b)?,
                None => "{}".to_string(),
            })
        } else {
            None
        };

        let outbound = Outbound {
            method,
            headers,
            body: encoded,
            with_auth: !opts.no_auth,
        };
        let res = self
            .engine
            .fetch(path, &outbound, opts.prefer_local, opts.timeout)
            .await?;
        handle_json(res).await
    }

    pub async fn get_json(&self, path: &str, opts: &RequestOptions) -> Result<Value> {
        self.request_json::<Value>(Method::GET, path, None, opts).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B, opts: &RequestOptions) -> Result<Value> {
        self.request_json(Method::POST, path, Some(body), opts).await
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B, opts: &RequestOptions) -> Result<Value> {
        self.request_json(Method::PUT, path, Some(body), opts).await
    }

    pub async fn patch_json<B: Serialize + ?Sized>(&self, path: &str, body: &B, opts: &RequestOptions) -> Result<Value> {
        self.request_json(Method::PATCH, path, Some(body), opts).await
    }

    pub async fn delete_json(&self, path: &str, opts: &RequestOptions) -> Result<Value> {
        self.request_json::<Value>(Method::DELETE, path, None, opts).await
    }

    /// `get_json` followed by deserialization into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, path: &str, opts: &RequestOptions) -> Result<T> {
        let v = self.get_json(path, opts).await?;
        serde_json::from_value(v).map_err(Error::from)
    }

    /// True if the health endpoint answers 2xx on either origin. Never fails.
    pub async fn ping(&self) -> bool {
        match self
            .fetch(&self.health_path, Method::GET, &RequestOptions::new().no_auth())
            .await
        {
            Ok(res) => res.is_success(),
            Err(e) => {
                log::debug!("Health probe failed: {}", e);
                false
            }
        }
    }
}
