//! Report directory client: list, date-range filter, and detail fetch.

use serde::{Deserialize, Serialize};

use crate::services::error::PortalError;
use crate::services::http::Api;

#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub report_id: i64,
    pub report_name: String,
    pub last_updated: String,
}

/// Full report payload. `data` rows are opaque to the client and never
/// mutated locally.
#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_id: i64,
    pub report_name: String,
    pub last_updated: String,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

pub struct ReportService {
    api: Api,
}

impl ReportService {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<ReportSummary>, PortalError> {
        self.api.get("/list", &[]).await
    }

    /// GET `/filter?startDate&endDate`, dates as ISO `YYYY-MM-DD`.
    pub async fn filter(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<ReportSummary>, PortalError> {
        validate_date_range(start_date, end_date)?;
        self.api
            .get(
                "/filter",
                &[
                    ("startDate", start_date.to_string()),
                    ("endDate", end_date.to_string()),
                ],
            )
            .await
    }

    pub async fn detail(&self, report_id: i64) -> Result<Report, PortalError> {
        self.api.get(&format!("/{report_id}"), &[]).await
    }
}

fn is_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    bytes
        .iter()
        .enumerate()
        .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit())
}

// ISO dates compare correctly as strings, so the range check stays lexical.
fn validate_date_range(start_date: &str, end_date: &str) -> Result<(), PortalError> {
    if !is_iso_date(start_date) || !is_iso_date(end_date) {
        return Err(PortalError::invalid_input(
            "dates must use the YYYY-MM-DD format",
        ));
    }
    if start_date > end_date {
        return Err(PortalError::invalid_input(
            "start date must not be after end date",
        ));
    }
    Ok(())
}
