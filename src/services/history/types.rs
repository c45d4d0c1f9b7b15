use serde::{Deserialize, Serialize};

/// Entries shown per history page.
pub const HISTORY_PAGE_SIZE: u32 = 10;

/// One persisted question/answer pair. Immutable once written; independent of
/// any live conversation session.
#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub report_id: i64,
    pub report_name: String,
    pub question: String,
    pub answer: String,
    pub created_at: String,
}

#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    #[serde(default)]
    pub items: Vec<HistoryEntry>,
    #[serde(default = "default_total_pages")]
    pub total_pages: u32,
}

fn default_total_pages() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHistoryRequest {
    pub report_id: i64,
    pub user_id: String,
    pub question: String,
    pub answer: String,
}
