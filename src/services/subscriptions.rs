//! Subscription coordinator.
//!
//! The server owns subscriptions; this keeps a read-through cache for the
//! signed-in user and guards the one-subscription-per-report invariant on the
//! client side. Quota refusals are recognized by the structured error code,
//! with the legacy error-message fragment as a fallback for older backends.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::services::error::PortalError;
use crate::services::http::Api;
use crate::services::session::SessionStore;

pub(crate) const QUOTA_CODE: &str = "SUBSCRIPTION_LIMIT_EXCEEDED";
pub(crate) const QUOTA_MESSAGE_FRAGMENT: &str = "최대 구독 한도";

#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: i64,
    pub report_id: i64,
    #[serde(default)]
    pub report_name: Option<String>,
    pub subscribed_date: String,
    pub last_updated: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeRequest {
    report_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeResponse {
    subscription_id: i64,
}

/// Transport seam for the subscription service.
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<Subscription>, PortalError>;
    async fn subscribe(&self, user_id: &str, report_id: i64) -> Result<i64, PortalError>;
    async fn unsubscribe(&self, user_id: &str, subscription_id: i64) -> Result<(), PortalError>;
}

pub struct SubscriptionClient {
    api: Api,
}

impl SubscriptionClient {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SubscriptionApi for SubscriptionClient {
    async fn list(&self, user_id: &str) -> Result<Vec<Subscription>, PortalError> {
        self.api
            .get("/list", &[("userId", user_id.to_string())])
            .await
    }

    async fn subscribe(&self, user_id: &str, report_id: i64) -> Result<i64, PortalError> {
        let response: SubscribeResponse = self
            .api
            .post(
                "/subscribe",
                &[("userId", user_id.to_string())],
                &SubscribeRequest { report_id },
            )
            .await?;
        Ok(response.subscription_id)
    }

    async fn unsubscribe(&self, user_id: &str, subscription_id: i64) -> Result<(), PortalError> {
        self.api
            .delete_no_content(
                &format!("/{subscription_id}"),
                &[("userId", user_id.to_string())],
            )
            .await
    }
}

fn classify_subscribe_error(err: PortalError) -> PortalError {
    if let PortalError::Fetch { code, message, .. } = &err {
        if code.as_deref() == Some(QUOTA_CODE) || message.contains(QUOTA_MESSAGE_FRAGMENT) {
            return PortalError::quota_exceeded(
                "subscription limit reached; cancel another subscription first",
            );
        }
    }
    err
}

pub struct SubscriptionCoordinator {
    api: Arc<dyn SubscriptionApi>,
    session: Arc<SessionStore>,
    cache: Mutex<Vec<Subscription>>,
}

impl SubscriptionCoordinator {
    pub fn new(api: Arc<dyn SubscriptionApi>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            cache: Mutex::new(Vec::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn user_id(&self) -> Result<String, PortalError> {
        self.session
            .user_id()
            .ok_or_else(|| PortalError::auth("no signed-in user"))
    }

    /// Replace the cache with the server's subscription list.
    pub async fn refresh(&self) -> Result<(), PortalError> {
        let user_id = self.user_id()?;
        let list = self.api.list(&user_id).await?;
        *self.cache() = list;
        Ok(())
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.cache().clone()
    }

    /// True iff the cache holds a subscription for this report.
    pub fn is_subscribed(&self, report_id: i64) -> bool {
        self.cache().iter().any(|s| s.report_id == report_id)
    }

    pub fn subscription_for(&self, report_id: i64) -> Option<Subscription> {
        self.cache()
            .iter()
            .find(|s| s.report_id == report_id)
            .cloned()
    }

    /// Subscribe to a report and re-read the authoritative list.
    pub async fn subscribe(&self, report_id: i64) -> Result<i64, PortalError> {
        if self.is_subscribed(report_id) {
            return Err(PortalError::invalid_input(
                "already subscribed to this report",
            ));
        }
        let user_id = self.user_id()?;
        let subscription_id = self
            .api
            .subscribe(&user_id, report_id)
            .await
            .map_err(classify_subscribe_error)?;

        if let Err(err) = self.refresh().await {
            log::warn!("subscription list refresh after subscribe failed: {err}");
        }
        Ok(subscription_id)
    }

    /// Unsubscribe; the cache entry goes away only after server confirmation.
    pub async fn unsubscribe(&self, subscription_id: i64) -> Result<(), PortalError> {
        let user_id = self.user_id()?;
        self.api.unsubscribe(&user_id, subscription_id).await?;
        self.cache()
            .retain(|s| s.subscription_id != subscription_id);
        Ok(())
    }
}
