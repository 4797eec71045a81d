//! # Expiring Key/Value Store
//!
//! Short-lived state such as one-time login codes keyed by email and
//! session tokens. Entries vanish after their TTL; nothing survives a
//! process restart with the in-memory store.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  put("ravi@x.in", "482913", 10m)   one-time code                 │
//! │  take("ravi@x.in")                 → Some("482913"), then gone   │
//! │                                                                  │
//! │  issue(session, 12h) → "6f1c…"     session token (uuid v4)       │
//! │  get("6f1c…")                      → Some(session) until expiry  │
//! │                                                                  │
//! │  purge_expired()                   drops everything past expiry  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Time comes from an injected [`Clock`]. [`TokioClock`] follows
//! `tokio::time`, so a paused test runtime controls expiry.
//!
//! [`StaffSessions`] runs staff sign-in over two such stores: a one-time code
//! for an email found in the staff directory, exchanged for a session token.
//! Sending the code to the user is left to the caller.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use helio_core::Credential;

use crate::config::SessionSettings;
use crate::error::{StoreError, StoreResult};
use crate::repository::CredentialRepository;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// `tokio::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[async_trait]
pub trait TtlStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Stores `value` under `key`, replacing any previous entry.
    async fn put(&self, key: &str, value: V, ttl: Duration);

    /// The live value under `key`.
    async fn get(&self, key: &str) -> Option<V>;

    /// Removes and returns the live value under `key`.
    async fn take(&self, key: &str) -> Option<V>;

    /// Drops expired entries and returns how many were dropped.
    async fn purge_expired(&self) -> usize;
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct InMemoryTtlStore<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V> Default for InMemoryTtlStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InMemoryTtlStore<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(TokioClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        InMemoryTtlStore {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<V> InMemoryTtlStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Stores `value` under a fresh random token and returns the token.
    pub async fn issue(&self, value: V, ttl: Duration) -> String {
        let token = Uuid::new_v4().to_string();
        self.put(&token, value, ttl).await;
        token
    }
}

#[async_trait]
impl<V> TtlStore<V> for InMemoryTtlStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn put(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
    }

    async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    async fn take(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let entry = self.entries.write().await.remove(key)?;
        (now < entry.expires_at).then_some(entry.value)
    }

    async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, remaining = entries.len(), "expired entries purged");
        }
        purged
    }
}

// =============================================================================
// Staff Sign-in
// =============================================================================

/// Six decimal digits from a fresh v4 uuid.
fn login_code() -> String {
    format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000)
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct StaffSessions {
    directory: CredentialRepository,
    codes: Arc<dyn TtlStore<String>>,
    sessions: Arc<dyn TtlStore<Credential>>,
    settings: SessionSettings,
}

impl StaffSessions {
    pub fn new(
        directory: CredentialRepository,
        codes: Arc<dyn TtlStore<String>>,
        sessions: Arc<dyn TtlStore<Credential>>,
        settings: SessionSettings,
    ) -> Self {
        StaffSessions {
            directory,
            codes,
            sessions,
            settings,
        }
    }

    /// Issues a code for a listed staff email, replacing any pending one.
    pub async fn request_code(&self, email: &str) -> StoreResult<String> {
        let key = email_key(email);
        if self.directory.find(&key).await?.is_none() {
            warn!(email = %key, "sign-in code requested for unknown email");
            return Err(StoreError::Auth {
                key,
                reason: "not in the staff directory".to_string(),
            });
        }

        let code = login_code();
        self.codes.put(&key, code.clone(), self.settings.code_ttl()).await;
        debug!(email = %key, "sign-in code issued");
        Ok(code)
    }

    /// Exchanges a matching code for a session token. The code is spent on
    /// success; a wrong code leaves it pending.
    pub async fn verify_code(&self, email: &str, code: &str) -> StoreResult<String> {
        let key = email_key(email);
        let rejected = |reason: &str| StoreError::Auth {
            key: key.clone(),
            reason: reason.to_string(),
        };

        match self.codes.get(&key).await {
            Some(expected) if expected == code.trim() => {}
            Some(_) => return Err(rejected("code does not match")),
            None => return Err(rejected("no pending code")),
        }
        if self.codes.take(&key).await.is_none() {
            return Err(rejected("code already used"));
        }

        // Role changes made since the code was issued apply to the session.
        let staff = self
            .directory
            .find(&key)
            .await?
            .ok_or_else(|| rejected("not in the staff directory"))?;

        let token = Uuid::new_v4().to_string();
        self.sessions.put(&token, staff, self.settings.session_ttl()).await;
        info!(email = %key, "staff signed in");
        Ok(token)
    }

    /// The staff member behind a live session token.
    pub async fn resolve(&self, token: &str) -> Option<Credential> {
        self.sessions.get(token).await
    }

    /// Ends a session; false when it had already expired or never existed.
    pub async fn sign_out(&self, token: &str) -> bool {
        self.sessions.take(token).await.is_some()
    }

    /// Drops expired codes and sessions.
    pub async fn purge_expired(&self) -> usize {
        self.codes.purge_expired().await + self.sessions.purge_expired().await
    }
}
