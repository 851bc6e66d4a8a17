//! Login state on top of the API client: tokens are stored for whichever origin
//! answered the login call.

use serde::Serialize;
use serde_json::Value;

use crate::api::ApiClient;
use crate::engine::RequestOptions;
use crate::error::{Error, Result};

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupBody<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
}

fn auth_call_options() -> RequestOptions {
    RequestOptions::new().prefer_local().no_auth()
}

pub struct UserSession {
    api: ApiClient,
}

impl UserSession {
    pub fn new(api: ApiClient) -> Self {
        UserSession { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn is_logged_in(&self) -> bool {
        self.api.get_token(self.api.active_base()).is_some()
    }

    /// Logs in, stores the token for the origin that answered and returns `/user`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value> {
        let data = self
            .api
            .post_json("/login", &LoginBody { email, password }, &auth_call_options())
            .await?;
        let token = data
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth("Login failed: missing token".to_string()))?;
        let base = self.api.active_base();
        self.api.set_token(Some(token), base);
        log::info!("Logged in against {}", base.label());
        self.api.get_json("/user", &RequestOptions::new()).await
    }

    pub async fn signup(&self, email: &str, username: &str, password: &str) -> Result<Value> {
        let data = self
            .api
            .post_json(
                "/signup",
                &SignupBody { email, username, password },
                &auth_call_options(),
            )
            .await?;
        if let Some(code) = data.get("error").and_then(Value::as_str) {
            if code == "username_exists" || code == "email_exists" {
                let msg = data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(code)
                    .to_string();
                return Err(Error::Auth(msg));
            }
        }
        self.login(email, password).await
    }

    pub fn logout(&self) {
        self.api.set_token(None, self.api.active_base());
    }

    /// The logged-in user, or `None` without a token. A rejected token is
    /// dropped; an unreachable backend is reported as an error.
    pub async fn current_user(&self) -> Result<Option<Value>> {
        if !self.is_logged_in() {
            return Ok(None);
        }
        match self.api.get_json("/user", &RequestOptions::new()).await {
            Ok(user) => Ok(Some(user)),
            Err(e @ Error::Http { .. }) => {
                log::warn!("Dropping session: {}", e);
                self.logout();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
