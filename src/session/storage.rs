// Session storage backends

use super::error::StoreError;
use super::token::{generate_token, redact};
use super::types::{DEFAULT_TOKEN_BYTES, Session, SessionStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Trait for session storage backends
///
/// Every session handed out or taken in is an owned copy; the backend keeps
/// the only canonical record.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Create and store a new pending session that lives for `ttl`
    async fn create_session(&self, ttl: Duration) -> Result<Session, StoreError>;

    /// Get a snapshot of a session by token
    async fn get_session(&self, token: &str) -> Result<Session, StoreError>;

    /// Replace the stored copy of an existing session
    ///
    /// Compare-and-set: the write only lands while the stored status is still
    /// `expected`, the status the caller's snapshot was read with. Never
    /// creates a missing entry and never replaces a stored offer or answer.
    async fn update_session(
        &self,
        session: Session,
        expected: SessionStatus,
    ) -> Result<(), StoreError>;

    /// Remove a session. Removing an unknown token is not an error.
    async fn delete_session(&self, token: &str);

    /// Remove every session past its expiry, returning how many were removed
    async fn cleanup_expired_sessions(&self) -> usize;

    /// Sessions with a live handshake (offer stored, not expired)
    async fn active_session_count(&self) -> usize;

    /// All stored entries, including expired ones the sweep has not removed yet
    async fn session_count(&self) -> usize;
}

/// In-memory session storage implementation
pub struct MemorySessionStorage {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    token_bytes: usize,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::with_token_bytes(DEFAULT_TOKEN_BYTES)
    }

    pub fn with_token_bytes(token_bytes: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            token_bytes,
        }
    }

    /// Store a session under its token, refusing to overwrite an existing entry
    async fn insert_new(&self, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.token) {
            return Err(StoreError::TokenCollision);
        }
        sessions.insert(session.token.clone(), session);
        Ok(())
    }
}

impl Default for MemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn create_session(&self, ttl: Duration) -> Result<Session, StoreError> {
        let token = generate_token(self.token_bytes)?;
        let session = Session::new(token, ttl);

        self.insert_new(session.clone()).await?;

        debug!(
            "Created session {} (expires at {})",
            redact(&session.token),
            session.expires_at
        );

        Ok(session)
    }

    async fn get_session(&self, token: &str) -> Result<Session, StoreError> {
        let sessions = self.sessions.read().await;
        sessions.get(token).cloned().ok_or(StoreError::SessionNotFound)
    }

    async fn update_session(
        &self,
        session: Session,
        expected: SessionStatus,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;

        let stored = sessions
            .get_mut(&session.token)
            .ok_or(StoreError::SessionNotFound)?;

        if stored.is_expired() {
            return Err(StoreError::SessionExpired);
        }

        let found = stored.stored_status();
        if found != expected {
            return Err(StoreError::StatusChanged { expected, found });
        }

        if stored.offer().is_some() && stored.offer() != session.offer() {
            return Err(StoreError::WriteOnce { field: "offer" });
        }

        if stored.answer().is_some() && stored.answer() != session.answer() {
            return Err(StoreError::WriteOnce { field: "answer" });
        }

        *stored = session;
        Ok(())
    }

    async fn delete_session(&self, token: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(token).is_some() {
            debug!("Deleted session {}", redact(token));
        }
    }

    async fn cleanup_expired_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();

        let expired_tokens: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| session.is_expired_at(now))
            .map(|(token, _)| token.clone())
            .collect();

        let count = expired_tokens.len();

        for token in &expired_tokens {
            sessions.remove(token);
        }

        if count > 0 {
            let redacted: Vec<String> = expired_tokens.iter().map(|t| redact(t)).collect();
            info!(
                "Cleaned up {} expired sessions: {:?} (remaining: {})",
                count,
                redacted,
                sessions.len()
            );
        }

        count
    }

    async fn active_session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        let now = Utc::now();
        sessions.values().filter(|s| s.is_active_at(now)).count()
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
