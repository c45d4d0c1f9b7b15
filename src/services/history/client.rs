use async_trait::async_trait;

use crate::services::error::PortalError;
use crate::services::http::Api;

use super::types::{HistoryPage, SaveHistoryRequest};

/// Transport seam for the history log.
#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// `page` is zero-based at this boundary.
    async fn load_page(
        &self,
        user_id: &str,
        page: u32,
        size: u32,
    ) -> Result<HistoryPage, PortalError>;

    async fn save(&self, request: &SaveHistoryRequest) -> Result<(), PortalError>;
}

pub struct HistoryClient {
    api: Api,
}

impl HistoryClient {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl HistoryApi for HistoryClient {
    async fn load_page(
        &self,
        user_id: &str,
        page: u32,
        size: u32,
    ) -> Result<HistoryPage, PortalError> {
        self.api
            .get(
                "/history",
                &[
                    ("userId", user_id.to_string()),
                    ("page", page.to_string()),
                    ("size", size.to_string()),
                ],
            )
            .await
    }

    async fn save(&self, request: &SaveHistoryRequest) -> Result<(), PortalError> {
        self.api
            .post_no_content(
                "/history",
                &[("userId", request.user_id.clone())],
                request,
            )
            .await
    }
}
