//! Paginated, read-only browser over persisted exchanges.
//!
//! Pages are one-based here and zero-based on the wire; the translation
//! happens in exactly one place (`load`). Empty results and load failures are
//! distinct states with their own user-facing messages.

use std::sync::Arc;

use crate::services::error::PortalError;
use crate::services::session::SessionStore;

use super::client::HistoryApi;
use super::types::{HistoryEntry, HISTORY_PAGE_SIZE};

pub(crate) const EMPTY_MESSAGE: &str = "대화 히스토리가 없습니다.";
pub(crate) const LOAD_FAILED_MESSAGE: &str = "대화 히스토리를 가져오는데 실패했습니다.";

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserState {
    Idle,
    Loaded(Vec<HistoryEntry>),
    Empty { message: String },
    Failed { message: String },
}

pub struct HistoryBrowser {
    api: Arc<dyn HistoryApi>,
    session: Arc<SessionStore>,
    page: u32,
    total_pages: u32,
    state: BrowserState,
    selected: Option<HistoryEntry>,
}

impl HistoryBrowser {
    pub fn new(api: Arc<dyn HistoryApi>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            page: 1,
            total_pages: 1,
            state: BrowserState::Idle,
            selected: None,
        }
    }

    /// Current page, one-based for presentation.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.clamp(1, self.total_pages.max(1));
    }

    /// Fetch the current page. UI page N issues transport page N-1.
    pub async fn load(&mut self) {
        let Some(user_id) = self.session.user_id() else {
            self.state = BrowserState::Failed {
                message: LOAD_FAILED_MESSAGE.to_string(),
            };
            return;
        };

        let transport_page = self.page - 1;
        match self
            .api
            .load_page(&user_id, transport_page, HISTORY_PAGE_SIZE)
            .await
        {
            Ok(page) => {
                self.total_pages = page.total_pages.max(1);
                // The server's page count can shrink between loads; keep the
                // current page inside the new range.
                self.set_page(self.page);
                self.state = if page.items.is_empty() {
                    BrowserState::Empty {
                        message: EMPTY_MESSAGE.to_string(),
                    }
                } else {
                    BrowserState::Loaded(page.items)
                };
            }
            Err(err) => {
                log::warn!("history page {} load failed: {err}", transport_page);
                self.state = BrowserState::Failed {
                    message: LOAD_FAILED_MESSAGE.to_string(),
                };
            }
        }
    }

    /// Two-state toggle: selecting the selected entry deselects it.
    pub fn toggle_selected(&mut self, id: i64) {
        if self.selected.as_ref().is_some_and(|s| s.id == id) {
            self.selected = None;
            return;
        }
        let BrowserState::Loaded(items) = &self.state else {
            return;
        };
        self.selected = items.iter().find(|e| e.id == id).cloned();
    }

    pub fn selected(&self) -> Option<&HistoryEntry> {
        self.selected.as_ref()
    }

    /// Hand the selected question back for re-use and close the selection.
    /// The caller feeds the text into the conversation session's pending
    /// input; nothing is auto-submitted.
    pub fn recall(&mut self) -> Option<String> {
        self.selected.take().map(|entry| entry.question)
    }
}
