//! Per-origin bearer token storage. Local and prod tokens never see each other.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::network::Origin;
use crate::storage::Storage;

const KEY_TOKEN_LOCAL: &str = "authToken_local";
const KEY_TOKEN_PROD: &str = "authToken_prod";

fn key_for(origin: Origin) -> &'static str {
    match origin {
        Origin::Local => KEY_TOKEN_LOCAL,
        Origin::Prod => KEY_TOKEN_PROD,
    }
}

#[derive(Clone)]
pub struct CredentialStore {
    durable: Arc<dyn Storage>,
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn Storage>) -> Self {
        CredentialStore { durable }
    }

    pub fn get_token(&self, origin: Origin) -> Option<String> {
        self.durable.get(key_for(origin)).filter(|t| !t.is_empty())
    }

    /// `None` or an empty token clears the slot.
    pub fn set_token(&self, token: Option<&str>, origin: Origin) {
        match token {
            Some(t) if !t.is_empty() => self.durable.set(key_for(origin), t),
            _ => self.durable.remove(key_for(origin)),
        }
    }

    pub fn clear_all(&self) {
        self.durable.remove(KEY_TOKEN_LOCAL);
        self.durable.remove(KEY_TOKEN_PROD);
    }

    /// `Authorization: Bearer <token>` for `origin`, or an empty map.
    pub fn auth_header(&self, origin: Origin) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(t) = self.get_token(origin) {
            match HeaderValue::from_str(&format!("Bearer {}", t)) {
                Ok(v) => {
                    h.insert(AUTHORIZATION, v);
                }
                Err(_) => log::warn!("Stored {} token is not a valid header value", origin),
            }
        }
        h
    }
}
