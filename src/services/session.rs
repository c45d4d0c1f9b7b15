//! Session store: the authenticated identity and bearer token.
//!
//! This is the only mutable state shared across service clients. It is only
//! ever swapped whole or cleared, never partially updated. Consumers that need
//! to react to a forced logout (any 401 anywhere) register an expiry observer
//! instead of polling storage.

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Signed-in user as returned by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub username: String,
    pub role: String,
    pub token: String,
    pub expiry_time: String,
}

/// Identity view safe to hand to a frontend (token omitted).
#[cfg_attr(feature = "typegen", derive(specta::Type))]
#[cfg_attr(feature = "typegen", specta(rename_all = "camelCase"))]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub username: String,
    pub role: String,
    pub expiry_time: String,
}

type ExpiryListener = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct SessionStore {
    // NOTE: Token reads happen on every outgoing request; arc-swap keeps them
    // lock-free. The listener list is only touched at registration and expiry.
    identity: ArcSwapOption<Identity>,
    listeners: Mutex<Vec<ExpiryListener>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, identity: Identity) {
        self.identity.store(Some(Arc::new(identity)));
    }

    pub fn identity(&self) -> Option<Arc<Identity>> {
        self.identity.load_full()
    }

    pub fn public_identity(&self) -> Option<PublicIdentity> {
        self.identity().map(|id| PublicIdentity {
            username: id.username.clone(),
            role: id.role.clone(),
            expiry_time: id.expiry_time.clone(),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.identity().map(|id| id.token.clone())
    }

    /// User id carried on subscription/AI/history requests.
    pub fn user_id(&self) -> Option<String> {
        self.identity().map(|id| id.username.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.load().is_some()
    }

    /// Clear the session without treating it as an expiry (explicit logout).
    pub fn clear(&self) {
        self.identity.store(None);
    }

    /// Forced logout: clear the identity and notify expiry observers.
    ///
    /// Idempotent; observers fire only when there was a session to invalidate.
    pub fn invalidate(&self) {
        let previous = self.identity.swap(None);
        if previous.is_none() {
            return;
        }
        let listeners = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::warn!("session listener lock poisoned; skipping expiry notifications");
                return;
            }
        };
        for listener in listeners.iter() {
            listener();
        }
    }

    /// Register a callback invoked when the session is invalidated by a 401.
    pub fn on_expired(&self, listener: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }
}
