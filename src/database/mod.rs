//! Database module exports.

mod mongo;
mod repository;

pub use mongo::Database;
pub use repository::{CACHE_COLLECTION, CacheEntryRepository};
