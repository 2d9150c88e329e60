//! TTL cache store over a persistence backend.
//!
//! Every operation takes the same async mutex before touching the backend,
//! so loads, stores, invalidations and sweeps from any number of tasks are
//! applied in a single total order. Failures never reach the caller: a
//! broken backend or an unreadable payload is reported as a miss.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::sweeper::{self, SweeperHandle};
use super::{CacheBackend, CacheConfig, CacheEntry};

/// Shared handle to a TTL cache.
///
/// Cloning is cheap and every clone talks to the same backend.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Mutex<Arc<dyn CacheBackend>>,
    ttl: Duration,
}

impl CacheStore {
    /// Create a store over `backend` using the TTL from `config`.
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        debug!("Cache store created (ttl: {:?})", config.ttl);
        Self {
            inner: Arc::new(StoreInner {
                backend: Mutex::new(backend),
                ttl: config.ttl,
            }),
        }
    }

    /// The TTL applied to every entry.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Load and decode the value stored under `key`.
    ///
    /// Returns `None` if there is no entry, the entry is older than the TTL
    /// (it is deleted on the way out), the payload does not decode as `T`,
    /// or the backend fails.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.inner.backend.lock().await;

        let entry = match backend.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache load failed for '{}': {}", key, e);
                return None;
            }
        };

        if entry.is_expired(Utc::now(), self.inner.ttl) {
            debug!("Cache entry '{}' expired", key);
            if let Err(e) = backend.delete(key).await {
                warn!("Failed to delete expired cache entry '{}': {}", key, e);
            }
            return None;
        }

        match serde_json::from_slice(&entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Cache entry '{}' could not be decoded: {}", key, e);
                None
            }
        }
    }

    /// Serialize `value` and store it under `key`, stamped with the current
    /// time. Replaces any existing entry.
    pub async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize cache value for '{}': {}", key, e);
                return;
            }
        };

        let backend = self.inner.backend.lock().await;
        // Stamp under the lock so timestamps follow the store order
        let entry = CacheEntry::new(key, bytes);

        if let Err(e) = backend.upsert(entry).await {
            warn!("Cache store failed for '{}': {}", key, e);
        }
    }

    /// Delete every entry whose key starts with `prefix`.
    pub async fn invalidate(&self, prefix: &str) -> u64 {
        let backend = self.inner.backend.lock().await;
        match backend.delete_prefix(prefix).await {
            Ok(removed) => {
                debug!("Invalidated {} cache entries with prefix '{}'", removed, prefix);
                removed
            }
            Err(e) => {
                warn!("Cache invalidation failed for prefix '{}': {}", prefix, e);
                0
            }
        }
    }

    /// Delete every entry.
    pub async fn invalidate_all(&self) -> u64 {
        let backend = self.inner.backend.lock().await;
        match backend.clear().await {
            Ok(removed) => {
                debug!("Invalidated all {} cache entries", removed);
                removed
            }
            Err(e) => {
                warn!("Failed to clear cache: {}", e);
                0
            }
        }
    }

    /// Delete every entry older than the TTL. Returns how many were removed.
    pub async fn sweep_expired(&self) -> u64 {
        // A TTL too large for chrono can never expire anything
        let Ok(ttl) = TimeDelta::from_std(self.inner.ttl) else {
            return 0;
        };

        let backend = self.inner.backend.lock().await;
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return 0;
        };

        match backend.delete_older_than(cutoff).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Cache sweep failed: {}", e);
                0
            }
        }
    }

    /// Number of stored entries, or zero if the backend cannot tell.
    pub async fn len(&self) -> u64 {
        let backend = self.inner.backend.lock().await;
        backend.len().await.unwrap_or_else(|e| {
            warn!("Failed to count cache entries: {}", e);
            0
        })
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawn the background sweeper.
    ///
    /// The sweeper runs until the returned handle is stopped or dropped.
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self, interval: Duration) -> SweeperHandle {
        sweeper::spawn(self.clone(), interval)
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use chrono::DateTime;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Listing {
        city: String,
        count: u32,
    }

    fn listing(city: &str, count: u32) -> Listing {
        Listing {
            city: city.to_string(),
            count,
        }
    }

    fn store_with_ttl(secs: u64) -> (CacheStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = CacheStore::new(
            backend.clone(),
            &CacheConfig::with_ttl(Duration::from_secs(secs)),
        );
        (store, backend)
    }

    /// Rewrite the entry's timestamp as if it had been stored `secs` ago.
    async fn backdate(backend: &MemoryBackend, key: &str, secs: i64) {
        let entry = backend.get(key).await.unwrap().unwrap();
        let stamped = Utc::now() - TimeDelta::seconds(secs);
        backend
            .upsert(CacheEntry::at(key, entry.value, stamped))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let (store, _) = store_with_ttl(60);
        let value = listing("Vienna", 3);

        store.store("searchApartments|city=Vienna", &value).await;
        let loaded: Option<Listing> = store.load("searchApartments|city=Vienna").await;

        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn test_missing_key_is_miss() {
        let (store, _) = store_with_ttl(60);
        assert_eq!(store.load::<Listing>("nothing|").await, None);
    }

    #[tokio::test]
    async fn test_ttl_scenario() {
        let (store, backend) = store_with_ttl(5);
        let key = "searchApartments|city=Vienna";
        store.store(key, &listing("Vienna", 1)).await;

        backdate(&backend, key, 4).await;
        assert_eq!(store.load::<Listing>(key).await, Some(listing("Vienna", 1)));

        backdate(&backend, key, 6).await;
        assert_eq!(store.load::<Listing>(key).await, None);
        assert!(backend.get(key).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_miss() {
        let (store, backend) = store_with_ttl(60);
        backend
            .upsert(CacheEntry::new("k", b"not json".to_vec()))
            .await
            .unwrap();

        assert_eq!(store.load::<Listing>("k").await, None);

        // Valid JSON of the wrong shape is a miss too
        store.store("k", &42_u32).await;
        assert_eq!(store.load::<Listing>("k").await, None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (store, _) = store_with_ttl(60);
        store.store("k", &listing("A", 1)).await;
        store.store("k", &listing("B", 2)).await;

        assert_eq!(store.load::<Listing>("k").await, Some(listing("B", 2)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_resets_timestamp() {
        let (store, backend) = store_with_ttl(5);
        store.store("k", &listing("A", 1)).await;
        backdate(&backend, "k", 10).await;

        store.store("k", &listing("A", 2)).await;
        assert_eq!(store.load::<Listing>("k").await, Some(listing("A", 2)));
    }

    #[tokio::test]
    async fn test_concurrent_stores_single_entry() {
        let (store, _) = store_with_ttl(60);
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.store("shared", &listing("X", i)).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.len().await, 1);
        let loaded = store.load::<Listing>("shared").await.unwrap();
        assert!(loaded.count < 16);
    }

    #[tokio::test]
    async fn test_invalidate_prefix() {
        let (store, backend) = store_with_ttl(60);
        store.store("searchApartments|city=A", &1).await;
        store.store("searchApartments|city=B", &2).await;
        store.store("bookingsByUser|userId=u", &3).await;

        assert_eq!(store.invalidate("searchApartments").await, 2);
        assert_eq!(backend.keys(), vec!["bookingsByUser|userId=u".to_string()]);
        assert_eq!(store.load::<i32>("bookingsByUser|userId=u").await, Some(3));
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let (store, _) = store_with_ttl(60);
        store.store("a|", &1).await;
        store.store("b|", &2).await;

        assert_eq!(store.invalidate_all().await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (store, backend) = store_with_ttl(5);
        store.store("old", &1).await;
        store.store("fresh", &2).await;
        backdate(&backend, "old", 6).await;

        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(backend.keys(), vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_sweep_with_nothing_expired() {
        let (store, backend) = store_with_ttl(5);
        store.store("a", &1).await;
        store.store("b", &2).await;
        backdate(&backend, "b", 4).await;

        assert_eq!(store.sweep_expired().await, 0);
        assert_eq!(backend.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>> {
            bail!("storage offline")
        }
        async fn upsert(&self, _entry: CacheEntry) -> Result<()> {
            bail!("storage offline")
        }
        async fn delete(&self, _key: &str) -> Result<bool> {
            bail!("storage offline")
        }
        async fn delete_prefix(&self, _prefix: &str) -> Result<u64> {
            bail!("storage offline")
        }
        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
            bail!("storage offline")
        }
        async fn clear(&self) -> Result<u64> {
            bail!("storage offline")
        }
        async fn len(&self) -> Result<u64> {
            bail!("storage offline")
        }
    }

    #[tokio::test]
    async fn test_backend_failures_are_swallowed() {
        let store = CacheStore::new(Arc::new(FailingBackend), &CacheConfig::default());

        store.store("k", &1).await;
        assert_eq!(store.load::<i32>("k").await, None);
        assert_eq!(store.invalidate("k").await, 0);
        assert_eq!(store.invalidate_all().await, 0);
        assert_eq!(store.sweep_expired().await, 0);
        assert_eq!(store.len().await, 0);
    }
}
