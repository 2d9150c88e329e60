//! Cache entry repository.
//!
//! Persists cache entries in the `api_cache` collection, one document per
//! key, enforced by a unique index.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Binary, Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use tracing::debug;

use crate::cache::{CacheBackend, CacheEntry};
use crate::database::Database;

/// Collection holding cache entries.
pub const CACHE_COLLECTION: &str = "api_cache";

/// MongoDB-backed storage for the cache store.
pub struct CacheEntryRepository {
    collection: Collection<Document>,
}

impl CacheEntryRepository {
    /// Open the repository and make sure the unique `key` index exists.
    pub async fn new(db: &Database) -> Result<Self> {
        let collection = db.documents(CACHE_COLLECTION);

        let index = IndexModel::builder()
            .keys(doc! { "key": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(index).await?;
        debug!("Ensured unique key index on {}", CACHE_COLLECTION);

        Ok(Self { collection })
    }
}

fn to_bson_datetime(ts: DateTime<Utc>) -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_millis(ts.timestamp_millis())
}

/// Keys starting with `prefix`, matched literally. The anchored regex can
/// use the `key` index.
pub(crate) fn prefix_filter(prefix: &str) -> Document {
    doc! { "key": { "$regex": format!("^{}", regex::escape(prefix)) } }
}

/// Encode an entry as a `{key, value, timestamp}` document.
pub(crate) fn entry_to_document(entry: &CacheEntry) -> Document {
    doc! {
        "key": entry.key.as_str(),
        "value": Binary {
            subtype: BinarySubtype::Generic,
            bytes: entry.value.clone(),
        },
        "timestamp": to_bson_datetime(entry.timestamp),
    }
}

/// Decode a stored document back into an entry.
pub(crate) fn entry_from_document(doc: &Document) -> Result<CacheEntry> {
    let key = doc.get_str("key")?;
    let value = doc.get_binary_generic("value")?.clone();
    let millis = doc.get_datetime("timestamp")?.timestamp_millis();
    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow!("timestamp out of range for cache entry '{}'", key))?;

    Ok(CacheEntry::at(key, value, timestamp))
}

#[async_trait]
impl CacheBackend for CacheEntryRepository {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let filter = doc! { "key": key };
        match self.collection.find_one(filter).await? {
            Some(doc) => Ok(Some(entry_from_document(&doc)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<()> {
        let filter = doc! { "key": entry.key.as_str() };
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.collection
            .replace_one(filter, entry_to_document(&entry))
            .with_options(options)
            .await?;

        debug!("Saved cache entry {}", entry.key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "key": key }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let result = self.collection.delete_many(prefix_filter(prefix)).await?;
        Ok(result.deleted_count)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let filter = doc! { "timestamp": { "$lt": to_bson_datetime(cutoff) } };
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn clear(&self) -> Result<u64> {
        let result = self.collection.delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}
