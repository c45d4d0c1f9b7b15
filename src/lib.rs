//! Client library for the report portal: authentication, report catalog,
//! subscriptions, downloads, conversation history, and the AI query session.
//!
//! Everything here is presentation-facing state and transport. Each backing
//! service gets its own thin REST client over a shared [`services::http::Api`],
//! and the stateful pieces (conversation session, history browser,
//! subscription coordinator) sit on top of trait seams so they can be driven
//! without a network.

pub mod services;

pub use services::ai::{AiConversationSession, AiQueryClient, Exchange, ExchangeRole};
pub use services::auth::AuthService;
pub use services::config::{load_portal_config, PortalConfig};
pub use services::download::{DownloadClient, DownloadService};
pub use services::error::PortalError;
pub use services::history::{HistoryBrowser, HistoryClient, HistoryEntry};
pub use services::http::Api;
pub use services::reports::{Report, ReportService, ReportSummary};
pub use services::session::{Identity, PublicIdentity, SessionStore};
pub use services::subscriptions::{Subscription, SubscriptionClient, SubscriptionCoordinator};
