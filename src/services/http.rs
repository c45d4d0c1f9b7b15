//! Shared JSON transport for the portal services.
//!
//! One `Api` per backend base URL. Every request carries the bearer token from
//! the session store when one exists; any 401 from any service invalidates the
//! session process-wide before the error is returned. No automatic retries.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::services::error::PortalError;
use crate::services::session::SessionStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const SESSION_EXPIRED_MESSAGE: &str = "session expired; sign in again";

/// Error body shape shared by the portal backends.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct Api {
    base_url: String,
    client: reqwest::Client,
    session: Arc<SessionStore>,
}

impl Api {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionStore>) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PortalError> {
        let builder = self.authorize(self.client.get(self.url(path)).query(query));
        let response = self.dispatch(builder).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T, PortalError> {
        let builder = self.authorize(self.client.post(self.url(path)).query(query).json(body));
        let response = self.dispatch(builder).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn post_no_content<B: Serialize>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<(), PortalError> {
        let builder = self.authorize(self.client.post(self.url(path)).query(query).json(body));
        self.dispatch(builder).await?;
        Ok(())
    }

    pub async fn delete_no_content(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(), PortalError> {
        let builder = self.authorize(self.client.delete(self.url(path)).query(query));
        self.dispatch(builder).await?;
        Ok(())
    }

    async fn dispatch(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, PortalError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.classify_failure(status.as_u16(), &body))
    }

    /// Map a non-2xx response to a portal error. 401 clears the session first.
    pub(crate) fn classify_failure(&self, status: u16, body: &str) -> PortalError {
        if status == 401 {
            self.session.invalidate();
            return PortalError::session_expired(SESSION_EXPIRED_MESSAGE);
        }
        error_from_body(status, body)
    }
}

pub(crate) fn error_from_body(status: u16, body: &str) -> PortalError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| match body.trim() {
            "" => format!("request failed with status {}", status),
            text => text.to_string(),
        });
    PortalError::fetch(Some(status), parsed.code, message)
}
