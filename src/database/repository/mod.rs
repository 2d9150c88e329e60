//! Repository module - MongoDB data access.

mod cache_entry_repository;

pub use cache_entry_repository::{CACHE_COLLECTION, CacheEntryRepository};
