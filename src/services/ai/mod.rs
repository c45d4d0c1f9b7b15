//! AI query service: transport client, wire types, and the per-report
//! conversation session.

mod client;
mod session;
mod types;

pub use client::{AiQueryApi, AiQueryClient};
pub use session::AiConversationSession;
pub use types::{
    Exchange, ExchangeRole, QueryRequest, QueryResponse, AI_FALLBACK_ANSWER,
};
