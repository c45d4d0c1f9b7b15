use serde::{Deserialize, Serialize};

/// Portal-wide error taxonomy.
///
/// Every failure is terminal for its own operation; nothing here triggers an
/// automatic retry. `SessionExpired` is the only globally-scoped kind: it is
/// raised after the session store has already been invalidated.
#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PortalError {
    /// Invalid credentials or no signed-in user. Recoverable inline.
    Auth { message: String },
    /// Any service answered 401; the token and identity are already cleared.
    SessionExpired { message: String },
    /// Network failure or a non-2xx response outside the cases below.
    Fetch {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
    /// The server refused a new subscription because the user is at the limit.
    QuotaExceeded { message: String },
    /// The AI query service failed; surfaced inside the conversation.
    AiQuery { message: String },
    /// Client-side validation rejected the input before any request was made.
    InvalidInput { message: String },
}

impl PortalError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::SessionExpired {
            message: message.into(),
        }
    }

    pub fn fetch(status: Option<u16>, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
        }
    }

    pub fn ai_query(message: impl Into<String>) -> Self {
        Self::AiQuery {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Auth { message }
            | Self::SessionExpired { message }
            | Self::Fetch { message, .. }
            | Self::QuotaExceeded { message }
            | Self::AiQuery { message }
            | Self::InvalidInput { message } => message,
        }
    }

    /// HTTP status attached to the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => *status,
            Self::SessionExpired { .. } => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch {
            status: err.status().map(|s| s.as_u16()),
            code: None,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth { message } => write!(f, "Auth: {}", message),
            Self::SessionExpired { message } => write!(f, "SessionExpired: {}", message),
            Self::Fetch {
                status, message, ..
            } => match status {
                Some(status) => write!(f, "Fetch ({}): {}", status, message),
                None => write!(f, "Fetch: {}", message),
            },
            Self::QuotaExceeded { message } => write!(f, "QuotaExceeded: {}", message),
            Self::AiQuery { message } => write!(f, "AiQuery: {}", message),
            Self::InvalidInput { message } => write!(f, "InvalidInput: {}", message),
        }
    }
}

impl std::error::Error for PortalError {}
