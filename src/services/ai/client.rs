use async_trait::async_trait;

use crate::services::error::PortalError;
use crate::services::http::Api;

use super::types::{QueryRequest, QueryResponse, SuggestionsResponse};

/// Transport seam for the AI query service.
#[async_trait]
pub trait AiQueryApi: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, PortalError>;
    async fn suggestions(&self, report_id: i64) -> Result<Vec<String>, PortalError>;
}

pub struct AiQueryClient {
    api: Api,
}

impl AiQueryClient {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AiQueryApi for AiQueryClient {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, PortalError> {
        let request_id = uuid::Uuid::new_v4();
        log::debug!(
            "ai query {request_id}: report {}, continued = {}",
            request.report_id,
            request.conversation_id.is_some()
        );

        match self.api.post("/query", &[], request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                log::warn!("ai query {request_id} failed: {err}");
                // A forced logout keeps its global meaning; everything else
                // becomes an in-conversation error.
                match err {
                    PortalError::SessionExpired { .. } => Err(err),
                    other => Err(PortalError::ai_query(other.message().to_string())),
                }
            }
        }
    }

    async fn suggestions(&self, report_id: i64) -> Result<Vec<String>, PortalError> {
        let response: SuggestionsResponse = self
            .api
            .get("/suggestions", &[("reportId", report_id.to_string())])
            .await?;
        Ok(response.suggestions)
    }
}
