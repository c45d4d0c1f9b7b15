//! Persisted conversation history: transport client and paginated browser.

mod browser;
mod client;
mod types;

pub use browser::{BrowserState, HistoryBrowser};
pub use client::{HistoryApi, HistoryClient};
pub use types::{HistoryEntry, HistoryPage, SaveHistoryRequest, HISTORY_PAGE_SIZE};
