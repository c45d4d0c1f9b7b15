//! Login/logout against the auth service.
//!
//! Login is the one request that must not go through the shared transport: a
//! 401 here means bad credentials (shown inline, form stays editable), not an
//! expired session.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::services::error::PortalError;
use crate::services::http;
use crate::services::session::{Identity, PublicIdentity, SessionStore};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    user_role: String,
    expiry_time: String,
}

#[derive(Debug, Serialize)]
struct LogoutRequest {
    token: String,
}

pub struct AuthService {
    base_url: String,
    client: reqwest::Client,
    session: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            session,
        }
    }

    /// POST `/login`; on success the session store holds the new identity.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<PublicIdentity, PortalError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(PortalError::invalid_input(
                "username and password are required",
            ));
        }

        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_login_failure(status, &body));
        }

        let login: LoginResponse = response.json().await?;
        let identity = Identity {
            username: username.to_string(),
            role: login.user_role,
            token: login.token,
            expiry_time: login.expiry_time,
        };
        let public = PublicIdentity {
            username: identity.username.clone(),
            role: identity.role.clone(),
            expiry_time: identity.expiry_time.clone(),
        };
        self.session.sign_in(identity);

        Ok(public)
    }

    /// POST `/logout`, then clear the session regardless of the outcome.
    pub async fn logout(&self) {
        if let Some(token) = self.session.token() {
            let result = self
                .client
                .post(format!("{}/logout", self.base_url))
                .bearer_auth(&token)
                .json(&LogoutRequest { token: token.clone() })
                .send()
                .await;
            if let Err(err) = result {
                log::warn!("logout request failed: {err}");
            }
        }
        self.session.clear();
    }
}

/// Map a rejected `/login` response. 400/401 mean bad credentials and stay
/// inline (`Auth`); unlike a 401 on an authenticated request they never touch
/// the session store.
fn classify_login_failure(status: u16, body: &str) -> PortalError {
    let err = http::error_from_body(status, body);
    if status == 400 || status == 401 {
        let message = match err.message() {
            "" => "invalid credentials",
            text => text,
        };
        return PortalError::auth(message.to_string());
    }
    err
}
