//! crates/ub_reader_core/src/auth.rs
//!
//! Mocked multi-provider sign-in. No provider is contacted: a sign-in derives a stable
//! user from the provider and e-mail address. `AuthService` keeps the signed-in reader
//! of a single client; `SessionStore` keeps server-side sessions for many.

use crate::domain::{AuthProvider, AuthSession, User};
use crate::kv::storage_key;
use crate::ports::{KeyValueStore, PortError, PortResult, StorageService};
use crate::storage::CollectionStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

/// Collection holding server-side sessions.
pub const SESSIONS: &str = "sessions";

/// Resolves a sign-in to a user. Providers other than e-mail fall back to a demo
/// address when none is given.
pub fn authenticate(provider: AuthProvider, email: Option<&str>) -> PortResult<User> {
    let email = match (provider, email.map(str::trim).filter(|e| !e.is_empty())) {
        (_, Some(email)) => email.to_lowercase(),
        (AuthProvider::Email, None) => {
            return Err(PortError::Invalid("an e-mail address is required".to_string()))
        }
        (provider, None) => format!("reader@{}.example", provider.as_str()),
    };
    let Some((local, domain)) = email.split_once('@') else {
        return Err(PortError::Invalid(format!("'{}' is not an e-mail address", email)));
    };
    if local.is_empty() || domain.is_empty() {
        return Err(PortError::Invalid(format!("'{}' is not an e-mail address", email)));
    }

    Ok(User {
        id: format!("{}:{}", provider.as_str(), email),
        provider,
        display_name: display_name(local),
        email,
    })
}

fn display_name(local: &str) -> String {
    local
        .split(['.', '_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

//=========================================================================================
// Client-side Sign-in State
//=========================================================================================

pub struct AuthService {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    state: watch::Sender<Option<User>>,
}

impl AuthService {
    /// Restores the signed-in user persisted under `ub-reader:auth`, if any.
    pub async fn create(kv: Arc<dyn KeyValueStore>) -> PortResult<Self> {
        let key = storage_key("auth");
        let user = match kv.get(&key).await? {
            Some(raw) => serde_json::from_str::<User>(&raw)
                .map_err(|e| warn!("Discarding unreadable sign-in state: {}", e))
                .ok(),
            None => None,
        };
        let (state, _) = watch::channel(user);
        Ok(Self { kv, key, state })
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.state.subscribe()
    }

    pub async fn sign_in(&self, provider: AuthProvider, email: Option<&str>) -> PortResult<User> {
        let user = authenticate(provider, email)?;
        let raw = serde_json::to_string(&user).map_err(|e| PortError::Invalid(e.to_string()))?;
        self.kv.set(&self.key, &raw).await?;
        info!("Signed in {} via {}", user.email, provider.as_str());
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    pub async fn sign_out(&self) -> PortResult<()> {
        self.kv.remove(&self.key).await?;
        if let Some(user) = self.state.send_replace(None) {
            info!("Signed out {}", user.email);
        }
        Ok(())
    }
}

//=========================================================================================
// Server-side Sessions
//=========================================================================================

pub struct SessionStore {
    sessions: CollectionStore<AuthSession>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            sessions: CollectionStore::new(kv, SESSIONS),
            ttl,
        }
    }

    /// Signs a user in and opens a session for them.
    pub async fn login(&self, provider: AuthProvider, email: Option<&str>) -> PortResult<AuthSession> {
        let user = authenticate(provider, email)?;
        self.open(user, Utc::now()).await
    }

    pub async fn open(&self, user: User, now: DateTime<Utc>) -> PortResult<AuthSession> {
        let session = AuthSession {
            id: Uuid::new_v4().to_string(),
            user,
            expires_at: now + self.ttl,
        };
        info!("Opened session for {}", session.user.email);
        self.sessions.add_item(session).await
    }

    /// The user behind a session id. Unknown and expired sessions are unauthorized;
    /// an expired one is also removed.
    pub async fn resolve(&self, session_id: &str, now: DateTime<Utc>) -> PortResult<User> {
        let session = self
            .sessions
            .get_item(session_id)
            .await?
            .ok_or(PortError::Unauthorized)?;
        if session.expires_at <= now {
            self.sessions.delete_items(&[session.id]).await?;
            return Err(PortError::Unauthorized);
        }
        Ok(session.user)
    }

    /// Ends a session; closing an unknown one is not an error.
    pub async fn close(&self, session_id: &str) -> PortResult<()> {
        self.sessions.delete_items(&[session_id.to_string()]).await
    }

    /// Drops every expired session and returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<usize> {
        let expired: Vec<String> = self
            .sessions
            .get_all_items()
            .await?
            .into_iter()
            .filter(|s| s.expires_at <= now)
            .map(|s| s.id)
            .collect();
        self.sessions.delete_items(&expired).await?;
        Ok(expired.len())
    }
}
