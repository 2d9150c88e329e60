//! Application context.
//!
//! Owns the booking API (cached or not), the cache sweeper and the
//! per-user session. Built once at startup and passed to whoever needs it.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{
    BookingApi, CacheInvalidator, CachedBookingApi, HttpBookingApi, StubBookingApi,
    WriteOperation,
};
use crate::cache::{CacheBackend, CacheConfig, CacheStore, MemoryBackend, SweeperHandle};
use crate::config::{ApiMode, CacheBackendKind, Config};
use crate::database::{CacheEntryRepository, Database};

/// Default number of search results per page.
pub const DEFAULT_PAGE_SIZE: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Editing the filter
    #[default]
    Builder,
    /// Showing results
    Results,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub city: Option<String>,
    pub rooms: Option<i64>,
    pub beds: Option<i64>,
}

/// State of the apartment search screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
    pub mode: SearchMode,
    pub filter: SearchFilter,
    pub page_size: usize,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            filter: SearchFilter::default(),
            page_size: DEFAULT_PAGE_SIZE,
            price_min: None,
            price_max: None,
        }
    }
}

/// Per-user state. Empty `user_id` means nobody is logged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub search: SearchSession,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        !self.user_id.is_empty()
    }
}

pub struct AppContext {
    api: Arc<dyn BookingApi>,
    invalidator: Option<CacheInvalidator>,
    cache: Option<CacheStore>,
    sweeper: Mutex<Option<SweeperHandle>>,
    session: RwLock<Session>,
}

impl AppContext {
    /// Build the client, the cache backend and the decorator from `config`,
    /// and start the sweeper.
    ///
    /// A cache backend that fails to initialise is logged and skipped; the
    /// context then talks to the uncached client.
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let client: Arc<dyn BookingApi> = match config.api_mode {
            ApiMode::Stub => {
                info!("Using stub booking API (delay {:?})", config.stub_delay);
                Arc::new(StubBookingApi::new(config.stub_delay))
            }
            ApiMode::Http => {
                info!(
                    "Using HTTP booking API (auth {}, booking {})",
                    config.auth_base_url, config.booking_base_url
                );
                Arc::new(HttpBookingApi::new(
                    config.auth_base_url.clone(),
                    config.booking_base_url.clone(),
                )?)
            }
        };

        let backend = match open_backend(config).await {
            Ok(backend) => backend,
            Err(e) => {
                warn!("Cache backend unavailable, continuing without cache: {e:#}");
                None
            }
        };

        Ok(Self::with_backend(client, backend, &config.cache))
    }

    /// Assemble a context from an existing client and an optional backend.
    pub fn with_backend(
        client: Arc<dyn BookingApi>,
        backend: Option<Arc<dyn CacheBackend>>,
        cache_config: &CacheConfig,
    ) -> Self {
        let Some(backend) = backend else {
            info!("Caching disabled");
            return Self {
                api: client,
                invalidator: None,
                cache: None,
                sweeper: Mutex::new(None),
                session: RwLock::new(Session::default()),
            };
        };

        let store = CacheStore::new(backend, cache_config);
        let cached = CachedBookingApi::new(client, store.clone());
        let sweeper = store.start_sweeper(cache_config.sweep_interval);
        info!(
            "Response cache ready (ttl {:?}, sweep every {:?})",
            cache_config.ttl, cache_config.sweep_interval
        );

        Self {
            invalidator: Some(cached.invalidator()),
            api: Arc::new(cached),
            cache: Some(store),
            sweeper: Mutex::new(Some(sweeper)),
            session: RwLock::new(Session::default()),
        }
    }

    /// The booking API, cached when a backend is configured.
    pub fn api(&self) -> &Arc<dyn BookingApi> {
        &self.api
    }

    pub fn invalidator(&self) -> Option<&CacheInvalidator> {
        self.invalidator.as_ref()
    }

    /// The response cache, if any.
    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    pub fn session(&self) -> &RwLock<Session> {
        &self.session
    }

    /// Drop cached reads made stale by a successful `operation`.
    ///
    /// Returns the number of removed entries; 0 when caching is off.
    pub async fn after_write(&self, operation: WriteOperation) -> u64 {
        match &self.invalidator {
            Some(invalidator) => invalidator.after_write(operation).await,
            None => 0,
        }
    }

    /// Stop the background sweeper. Safe to call more than once.
    pub async fn shutdown(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
            info!("Cache sweeper stopped");
        }
    }
}

async fn open_backend(config: &Config) -> anyhow::Result<Option<Arc<dyn CacheBackend>>> {
    match config.cache_backend {
        CacheBackendKind::Off => Ok(None),
        CacheBackendKind::Memory => Ok(Some(Arc::new(MemoryBackend::new()))),
        CacheBackendKind::Mongodb => {
            let uri = config
                .mongodb_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("MONGODB_URI is not set"))?;

            info!("Connecting to MongoDB...");
            let db = Database::connect(uri, &config.mongodb_database).await?;
            let repo = CacheEntryRepository::new(&db).await?;
            info!("MongoDB cache backend ready");
            Ok(Some(Arc::new(repo)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApartmentUpdate;
    use crate::api::DEMO_OWNER_2;

    fn stub_config(backend: CacheBackendKind) -> Config {
        Config {
            cache_backend: backend,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_build_with_memory_cache() {
        let ctx = AppContext::build(&stub_config(CacheBackendKind::Memory))
            .await
            .unwrap();
        assert!(ctx.invalidator().is_some());

        let cache = ctx.cache().unwrap();
        ctx.api().search_apartments(Some("Prague"), None, None).await.unwrap();
        ctx.api().apartments_by_owner(DEMO_OWNER_2).await.unwrap();
        assert_eq!(cache.len().await, 2);

        ctx.shutdown().await;
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_without_cache() {
        let ctx = AppContext::build(&stub_config(CacheBackendKind::Off))
            .await
            .unwrap();
        assert!(ctx.invalidator().is_none());
        assert!(ctx.cache().is_none());
        assert_eq!(ctx.after_write(WriteOperation::BookApartment).await, 0);

        let list = ctx.api().search_apartments(None, None, None).await.unwrap();
        assert_eq!(list.count, 4);
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_after_write_refreshes_reads() {
        let ctx = AppContext::build(&stub_config(CacheBackendKind::Memory))
            .await
            .unwrap();
        let api = ctx.api();

        let before = api.search_apartments(Some("Prague"), None, None).await.unwrap();
        let prague = &before.apartments[0];
        assert_eq!(prague.price, 130.0);

        let update = ApartmentUpdate {
            owner_id: DEMO_OWNER_2.to_string(),
            price: Some(99.0),
            info: None,
        };
        api.update_apartment(&prague.id, &update).await.unwrap();

        // Still served from cache until invalidated
        let stale = api.search_apartments(Some("Prague"), None, None).await.unwrap();
        assert_eq!(stale.apartments[0].price, 130.0);

        let removed = ctx.after_write(WriteOperation::UpdateApartment).await;
        assert_eq!(removed, 1);

        let fresh = api.search_apartments(Some("Prague"), None, None).await.unwrap();
        assert_eq!(fresh.apartments[0].price, 99.0);
        ctx.shutdown().await;
    }

    #[test]
    fn test_session_defaults() {
        let session = Session::default();
        assert!(!session.is_logged_in());
        assert_eq!(session.search.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(session.search.mode, SearchMode::Builder);
    }

    #[tokio::test]
    async fn test_session_is_shared() {
        let ctx = AppContext::with_backend(
            Arc::new(StubBookingApi::default()),
            None,
            &CacheConfig::default(),
        );
        {
            let mut session = ctx.session().write();
            session.user_id = "u1".to_string();
            session.search.filter.city = Some("Vienna".to_string());
        }
        let session = ctx.session().read();
        assert!(session.is_logged_in());
        assert_eq!(session.search.filter.city.as_deref(), Some("Vienna"));
    }
}
