//! Cache module - persistent TTL cache for API responses.
//!
//! ## Architecture
//!
//! - `CacheStore` - Serialized owner of all entries; TTL on read, prefix
//!   and full invalidation, periodic sweep
//! - `CacheBackend` - Where entries live (`MemoryBackend`, or the MongoDB
//!   repository in `database`)
//! - `key` - Canonical `operation|name=value|...` keys
//!
//! ## Usage
//!
//! ```rust
//! # async fn demo() {
//! use std::sync::Arc;
//! use rentcache::cache::{CacheConfig, CacheStore, KeyArgs, MemoryBackend};
//!
//! let store = CacheStore::new(Arc::new(MemoryBackend::new()), &CacheConfig::default());
//! let key = KeyArgs::new().arg("userId", "u-1").build("bookingsByUser");
//!
//! store.store(&key, &vec![1, 2, 3]).await;
//! let cached: Option<Vec<i32>> = store.load(&key).await;
//! # }
//! ```

mod backend;
mod config;
mod entry;
pub mod key;
mod store;
mod sweeper;

pub use backend::{CacheBackend, MemoryBackend};
pub use config::{CacheConfig, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
pub use entry::CacheEntry;
pub use key::{KeyArg, KeyArgs, build_key};
pub use store::CacheStore;
pub use sweeper::SweeperHandle;
