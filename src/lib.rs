//! rentcache - rental-booking client with a TTL response cache.
//!
//! ## Architecture
//!
//! - `api` - Booking API trait, HTTP and stub clients, caching decorator
//! - `cache` - Key codec, cache store, backends and the sweeper
//! - `config` - Environment configuration
//! - `context` - Application context (client, cache, session)
//! - `database` - MongoDB-backed cache persistence

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod database;

pub use context::AppContext;
