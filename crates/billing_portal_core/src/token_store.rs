//! crates/billing_portal_core/src/token_store.rs
//!
//! In-memory cache of access tokens in front of the session repository.
//! The store never talks to the network; refreshing an expired token or
//! re-authenticating is left to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{now_millis, TokenCacheEntry};
use crate::ports::{PortError, PortResult, SessionRepository};

pub struct TokenStore {
    repository: Arc<dyn SessionRepository>,
    cache: RwLock<HashMap<String, Arc<TokenCacheEntry>>>,
}

impl TokenStore {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self {
            repository,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached token for `session_id` if it is still valid, otherwise
    /// reloads it from the repository.
    ///
    /// Fails with `TokenExpired` when the persisted token is expired (or has no
    /// expiry) and with `Unauthorized` when the session does not exist.
    pub async fn get_access_token(&self, session_id: &str) -> PortResult<String> {
        let now = now_millis();

        let cached = self.cache.read().await.get(session_id).cloned();
        if let Some(entry) = cached {
            if !entry.is_expired(now) {
                return Ok(entry.access_token.clone());
            }
            debug!("Cached access token expired, reloading from storage.");
            self.cache.write().await.remove(session_id);
        }

        let persisted = self
            .repository
            .load(session_id)
            .await?
            .ok_or(PortError::Unauthorized)?;
        let entry = persisted.session.token_entry();
        if entry.is_expired(now) {
            return Err(PortError::TokenExpired);
        }

        let token = entry.access_token.clone();
        self.cache
            .write()
            .await
            .insert(session_id.to_string(), Arc::new(entry));
        Ok(token)
    }

    /// Seeds the cache right after a login so the first call skips storage.
    pub async fn prime(&self, session_id: &str, entry: TokenCacheEntry) {
        self.cache
            .write()
            .await
            .insert(session_id.to_string(), Arc::new(entry));
    }

    /// Drops the cached token. Persisted storage is left alone.
    pub async fn clear_cache(&self, session_id: &str) {
        self.cache.write().await.remove(session_id);
    }

    pub async fn clear_all(&self) {
        self.cache.write().await.clear();
    }

    /// Drops entries whose token has expired or whose session no longer
    /// exists in storage. Returns how many entries were evicted.
    pub async fn evict_stale(&self, now_millis: i64) -> PortResult<usize> {
        let candidates: Vec<(String, bool)> = self
            .cache
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.is_expired(now_millis)))
            .collect();

        let mut stale = Vec::new();
        for (session_id, expired) in candidates {
            if expired || self.repository.load(&session_id).await?.is_none() {
                stale.push(session_id);
            }
        }

        let mut cache = self.cache.write().await;
        for session_id in &stale {
            cache.remove(session_id);
        }
        if !stale.is_empty() {
            debug!(evicted = stale.len(), "Evicted stale access tokens.");
        }
        Ok(stale.len())
    }

    #[cfg(test)]
    pub(crate) async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }
}
