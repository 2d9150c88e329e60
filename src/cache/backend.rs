//! Persistence backends for the cache store.
//!
//! A backend only moves entries in and out of storage. TTL decisions and
//! serialization belong to [`CacheStore`](super::CacheStore), which is also
//! the only caller: nothing else should touch a backend directly.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::CacheEntry;

/// Storage for cache entries, keyed by a unique string.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get the entry stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Insert the entry, replacing any existing entry with the same key.
    async fn upsert(&self, entry: CacheEntry) -> Result<()>;

    /// Delete the entry stored under `key`. Returns `true` if one existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every entry whose key starts with `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    /// Delete every entry stamped strictly before `cutoff`.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Delete every entry.
    async fn clear(&self) -> Result<u64>;

    /// Number of stored entries.
    async fn len(&self) -> Result<u64>;
}

/// Process-local backend.
///
/// Entries live as long as the backend does; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<()> {
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - self.entries.len()) as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.timestamp >= cutoff);
        Ok((before - self.entries.len()) as u64)
    }

    async fn clear(&self) -> Result<u64> {
        let removed = self.entries.len() as u64;
        self.entries.clear();
        Ok(removed)
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.entries.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn test_upsert_replaces() {
        let backend = MemoryBackend::new();
        backend.upsert(CacheEntry::new("a", b"1".to_vec())).await.unwrap();
        backend.upsert(CacheEntry::new("a", b"2".to_vec())).await.unwrap();

        assert_eq!(backend.len().await.unwrap(), 1);
        let entry = backend.get("a").await.unwrap().unwrap();
        assert_eq!(entry.value, b"2".to_vec());
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let backend = MemoryBackend::new();
        for key in ["search|a", "search|b", "details|a"] {
            backend.upsert(CacheEntry::new(key, Vec::new())).await.unwrap();
        }

        assert_eq!(backend.delete_prefix("search|").await.unwrap(), 2);
        assert_eq!(backend.keys(), vec!["details|a".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let backend = MemoryBackend::new();
        let now = Utc::now();
        backend
            .upsert(CacheEntry::at("old", Vec::new(), now - TimeDelta::seconds(60)))
            .await
            .unwrap();
        backend.upsert(CacheEntry::at("new", Vec::new(), now)).await.unwrap();

        assert_eq!(backend.delete_older_than(now - TimeDelta::seconds(30)).await.unwrap(), 1);
        assert_eq!(backend.keys(), vec!["new".to_string()]);
    }

    #[tokio::test]
    async fn test_clear() {
        let backend = MemoryBackend::new();
        backend.upsert(CacheEntry::new("a", Vec::new())).await.unwrap();
        backend.upsert(CacheEntry::new("b", Vec::new())).await.unwrap();

        assert_eq!(backend.clear().await.unwrap(), 2);
        assert!(!backend.delete("a").await.unwrap());
        assert_eq!(backend.len().await.unwrap(), 0);
    }
}
