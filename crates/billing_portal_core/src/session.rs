//! crates/billing_portal_core/src/session.rs
//!
//! Turns a validated login into a persisted session and hands out read-only
//! snapshots of it. This is the only place sessions are created or destroyed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::ScopeSet;
use crate::domain::{now_millis, PersistedSession, Session};
use crate::ports::{PortError, PortResult, SessionRepository};
use crate::token_store::TokenStore;

pub struct SessionManager {
    repository: Arc<dyn SessionRepository>,
    tokens: Arc<TokenStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(repository: Arc<dyn SessionRepository>, ttl: Duration) -> Self {
        let tokens = Arc::new(TokenStore::new(repository.clone()));
        Self {
            repository,
            tokens,
            ttl,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Persists a freshly authenticated user and returns the new session id.
    pub async fn establish(&self, session: Session) -> PortResult<(String, Arc<Session>)> {
        if session.access_token.trim().is_empty() {
            return Err(PortError::Validation(
                "login response did not carry an access token".to_string(),
            ));
        }

        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let record = PersistedSession {
            session_id: session_id.clone(),
            session,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.repository.save(&record).await?;
        self.tokens
            .prime(&session_id, record.session.token_entry())
            .await;

        info!(
            user_id = record.session.user_id,
            discom_id = record.session.discom_id,
            "Session established."
        );
        Ok((session_id, Arc::new(record.session)))
    }

    /// Loads the session behind `session_id`.
    ///
    /// A session past its lifetime, or whose access token has expired, is
    /// destroyed on the spot.
    pub async fn current_user(&self, session_id: &str) -> PortResult<Arc<Session>> {
        let record = self
            .repository
            .load(session_id)
            .await?
            .ok_or(PortError::Unauthorized)?;

        if record.is_past_lifetime(Utc::now()) {
            self.destroy(session_id).await?;
            return Err(PortError::Unauthorized);
        }
        if record.session.token_entry().is_expired(now_millis()) {
            warn!(user_id = record.session.user_id, "Access token expired, dropping session.");
            self.destroy(session_id).await?;
            return Err(PortError::TokenExpired);
        }

        Ok(Arc::new(record.session))
    }

    pub async fn logout(&self, session_id: &str) -> PortResult<()> {
        self.destroy(session_id).await?;
        info!("Session logged out.");
        Ok(())
    }

    /// Deletes every persisted session past its lifetime, then drops cached
    /// tokens that are expired or belong to sessions no longer stored.
    pub async fn purge_expired(&self) -> PortResult<u64> {
        let purged = self.repository.purge_expired(Utc::now()).await?;
        let evicted = self.tokens.evict_stale(now_millis()).await?;
        debug!(purged, evicted, "Expired sessions purged.");
        Ok(purged)
    }

    async fn destroy(&self, session_id: &str) -> PortResult<()> {
        self.tokens.clear_cache(session_id).await;
        self.repository.delete(session_id).await
    }
}

/// Scope view of a session. Never `None` for a live session; an empty list
/// simply grants nothing beyond public pages.
pub fn session_scopes(session: &Session) -> ScopeSet {
    ScopeSet::new(&session.scopes)
}
