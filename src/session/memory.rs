//! In-process session store with sliding expiry.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::session::{SessionStore, StoreError};

#[derive(Debug, Clone)]
struct SessionEntry {
    value: String,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// A thread-safe session store backed by a concurrent map.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current expiry deadline for `key`, if stored.
    pub fn expires_at(&self, key: &str) -> Option<Instant> {
        self.inner.get(key).map(|r| r.value().expires_at)
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        // remove_if keeps the check-and-delete atomic for this key
        if self
            .inner
            .remove_if(key, |_, entry| !entry.is_live(now))
            .is_some()
        {
            tracing::debug!("Session expired on lookup");
            return Ok(None);
        }
        Ok(self.inner.get(key).map(|r| r.value().value.clone()))
    }

    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        self.inner.insert(
            key.to_string(),
            SessionEntry {
                value: value.unwrap_or_default().to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key);
        Ok(())
    }

    async fn update_expire(&self, key: &str) -> Result<(), StoreError> {
        if let Some(mut entry) = self.inner.get_mut(key) {
            entry.expires_at = Instant::now() + self.ttl;
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        Ok(before.saturating_sub(self.inner.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemorySessionStore::new(Duration::from_secs(60));

        store.set("tok", Some("alice")).await.unwrap();
        assert_eq!(store.get("tok").await.unwrap().as_deref(), Some("alice"));

        store.remove("tok").await.unwrap();
        assert_eq!(store.get("tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_without_value_is_still_present() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.set("tok", None).await.unwrap();
        assert!(store.get("tok").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = MemorySessionStore::new(Duration::from_secs(10));
        store.set("tok", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(store.get("tok").await.unwrap(), None);
        assert!(store.is_empty(), "expired entry should be dropped on lookup");
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_expire_slides_window() {
        let store = MemorySessionStore::new(Duration::from_secs(10));
        store.set("tok", None).await.unwrap();
        let first = store.expires_at("tok").unwrap();

        tokio::time::advance(Duration::from_secs(8)).await;
        store.update_expire("tok").await.unwrap();
        let second = store.expires_at("tok").unwrap();
        assert!(second > first);

        // Past the original deadline but inside the extended one
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(store.get("tok").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemorySessionStore::new(Duration::from_secs(10));
        store.set("old", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        store.set("new", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.expires_at("new").is_some());
    }

    #[tokio::test]
    async fn test_update_expire_on_missing_key_is_noop() {
        let store = MemorySessionStore::new(Duration::from_secs(10));
        store.update_expire("ghost").await.unwrap();
        assert!(store.is_empty());
    }
}
