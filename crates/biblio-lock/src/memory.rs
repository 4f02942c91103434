// In-process shared store
// Expiring key/value entries in a DashMap, shareable between coordinators via Arc

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::store::SharedStore;

/// A stored value with its expiry deadline
pub(crate) struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory shared store using DashMap
///
/// Every coordinator holding a clone of the same `Arc<MemorySharedStore>` sees the
/// same keyspace, which is how tests model several process instances.
pub struct MemorySharedStore {
    pub(crate) entries: Arc<DashMap<String, StoredValue>>,
    cleanup_handle: Option<JoinHandle<()>>,
}

impl Default for MemorySharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySharedStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            cleanup_handle: None,
        }
    }

    /// Start a background task that drops expired entries.
    ///
    /// Expiry is already enforced on access; the sweep only bounds memory.
    pub fn with_cleanup(mut self, interval: Duration) -> Self {
        let entries = self.entries.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let before = entries.len();
                entries.retain(|_, stored| !stored.is_expired());
                let removed = before.saturating_sub(entries.len());
                if removed > 0 {
                    debug!(count = removed, "Cleaned up expired shared store entries");
                }
            }
        });

        info!(
            interval_ms = interval.as_millis() as u64,
            "MemorySharedStore initialized with background expiry task"
        );

        self.cleanup_handle = Some(handle);
        self
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for MemorySharedStore {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl SharedStore for MemorySharedStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool> {
        // The entry guard holds the shard write lock, so check and insert are atomic
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(StoredValue::new(value, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> anyhow::Result<bool> {
        let removed = self.entries.remove_if(key, |_, stored| {
            !stored.is_expired() && stored.value == expected
        });
        Ok(removed.is_some())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .entries
            .get(key)
            .filter(|stored| !stored.is_expired())
            .map(|stored| stored.value.clone()))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_if_absent_only_once() {
        let store = MemorySharedStore::new();

        assert!(store.set_if_absent("k", "a", LONG).await.unwrap());
        assert!(!store.set_if_absent("k", "b", LONG).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_compare_and_delete_requires_match() {
        let store = MemorySharedStore::new();
        store.set_if_absent("k", "a", LONG).await.unwrap();

        assert!(!store.compare_and_delete("k", "b").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("a"));

        assert!(store.compare_and_delete("k", "a").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_compare_and_delete_missing_key() {
        let store = MemorySharedStore::new();
        assert!(!store.compare_and_delete("missing", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_is_replaceable() {
        let store = MemorySharedStore::new();

        assert!(store.set_if_absent("k", "a", Duration::ZERO).await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.set_if_absent("k", "b", LONG).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_deleted_by_stale_owner() {
        let store = MemorySharedStore::new();

        store.set_if_absent("k", "a", Duration::ZERO).await.unwrap();
        assert!(!store.compare_and_delete("k", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_background_cleanup_removes_expired() {
        let store = MemorySharedStore::new().with_cleanup(Duration::from_millis(10));

        store
            .set_if_absent("k", "a", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.entries.is_empty());
        assert!(store.is_empty());
    }
}
