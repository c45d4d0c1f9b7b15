use serde::{Deserialize, Serialize};

/// Fixed answer shown in place of a response when the AI service fails.
pub const AI_FALLBACK_ANSWER: &str = "죄송합니다. 질문을 처리하는 중 오류가 발생했습니다.";

#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeRole {
    User,
    Ai,
    Error,
}

/// One turn of the conversation. Append-only; `pending` marks a provisional
/// user entry whose answer has not arrived yet.
#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub role: ExchangeRole,
    pub content: String,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub references: Vec<String>,
    pub pending: bool,
}

impl Exchange {
    pub(crate) fn pending_user(question: &str) -> Self {
        Self {
            role: ExchangeRole::User,
            content: question.to_string(),
            data: Vec::new(),
            references: Vec::new(),
            pending: true,
        }
    }

    pub(crate) fn ai(response: &QueryResponse) -> Self {
        Self {
            role: ExchangeRole::Ai,
            content: response.answer.clone(),
            data: response.data.clone(),
            references: response.references.clone(),
            pending: false,
        }
    }

    pub(crate) fn error() -> Self {
        Self {
            role: ExchangeRole::Error,
            content: AI_FALLBACK_ANSWER.to_string(),
            data: Vec::new(),
            references: Vec::new(),
            pending: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub question: String,
    pub report_id: i64,
    pub user_id: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestionsResponse {
    #[serde(default)]
    pub(crate) suggestions: Vec<String>,
}
