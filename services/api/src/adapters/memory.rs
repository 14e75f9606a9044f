//! services/api/src/adapters/memory.rs
//!
//! Process-local `SessionRepository`, used when no database is configured.
//! Sessions do not survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use billing_portal_core::domain::PersistedSession;
use billing_portal_core::ports::{PortResult, SessionRepository};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: RwLock<HashMap<String, PersistedSession>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn save(&self, session: &PersistedSession) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> PortResult<Option<PersistedSession>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> PortResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_past_lifetime(now));
        Ok((before - sessions.len()) as u64)
    }
}
