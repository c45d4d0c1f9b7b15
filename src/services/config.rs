//! Runtime configuration for the four portal services.
//!
//! Each backend is independently addressable; base URLs come from the
//! environment so deployments can point the client anywhere.

use serde::{Deserialize, Serialize};

/// Base URLs of the backend services.
#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalConfig {
    pub auth_url: String,
    pub report_url: String,
    pub subscription_url: String,
    pub ai_query_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:8080/api/auth".to_string(),
            report_url: "http://localhost:8081/api/report".to_string(),
            subscription_url: "http://localhost:8082/api/subscription".to_string(),
            ai_query_url: "http://localhost:8083/api/ai".to_string(),
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn env_url(key: &str, default: &str) -> String {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    let normalized = normalize_base_url(&raw);
    if normalized.is_empty() {
        normalize_base_url(default)
    } else {
        normalized
    }
}

/// Load portal configuration from `.env`/environment.
///
/// Reads:
/// - `AUTH_URL`
/// - `REPORT_URL`
/// - `SUBSCRIPTION_URL`
/// - `AI_QUERY_URL`
pub fn load_portal_config() -> PortalConfig {
    let _ = dotenvy::dotenv();

    let defaults = PortalConfig::default();
    PortalConfig {
        auth_url: env_url("AUTH_URL", &defaults.auth_url),
        report_url: env_url("REPORT_URL", &defaults.report_url),
        subscription_url: env_url("SUBSCRIPTION_URL", &defaults.subscription_url),
        ai_query_url: env_url("AI_QUERY_URL", &defaults.ai_query_url),
    }
}
