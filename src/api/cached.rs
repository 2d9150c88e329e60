//! Caching decorator over a [`BookingApi`].
//!
//! Reads in [`CacheableOperation`] are answered from the cache store when a
//! fresh entry exists; everything else goes straight to the wrapped client.
//! The decorator never invalidates on its own: after a successful write the
//! caller invalidates the affected families, usually via
//! [`CacheInvalidator::after_write`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    ApartmentCreate, ApartmentDetails, ApartmentUpdate, ApartmentsList, ApiResult, Booking,
    BookingApi, BookingCreate, BookingsList, CacheableOperation, LoginSuccess, MediumApartment,
    OwnerApartments, WriteOperation,
};
use crate::cache::key::operation_prefix;
use crate::cache::{CacheStore, KeyArgs};

/// A [`BookingApi`] that caches the allowlisted reads of `C`.
pub struct CachedBookingApi<C: ?Sized> {
    client: Arc<C>,
    cache: CacheStore,
}

impl<C: BookingApi + ?Sized> CachedBookingApi<C> {
    pub fn new(client: Arc<C>, cache: CacheStore) -> Self {
        Self { client, cache }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &Arc<C> {
        &self.client
    }

    /// Handle for invalidating this decorator's cache.
    pub fn invalidator(&self) -> CacheInvalidator {
        CacheInvalidator {
            cache: self.cache.clone(),
        }
    }

    /// Drop every cached `searchApartments` result.
    pub async fn invalidate_search(&self) {
        self.invalidator().invalidate_search().await;
    }

    /// Drop every cached `apartmentDetails` result.
    pub async fn invalidate_apartment_details(&self) {
        self.invalidator().invalidate_apartment_details().await;
    }

    /// Drop every cached `apartmentsByOwner` result.
    pub async fn invalidate_owner_apartments(&self) {
        self.invalidator().invalidate_owner_apartments().await;
    }

    /// Drop every cached `bookingsByUser` result.
    pub async fn invalidate_bookings(&self) {
        self.invalidator().invalidate_bookings().await;
    }

    /// Drop the whole cache.
    pub async fn invalidate_all(&self) {
        self.invalidator().invalidate_all().await;
    }

    async fn cached_call<T, F, Fut>(
        &self,
        operation: CacheableOperation,
        args: KeyArgs,
        fetch: F,
    ) -> ApiResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ApiResult<T>> + Send,
    {
        let key = args.build(operation.name());

        if let Some(saved) = self.cache.load::<T>(&key).await {
            debug!("Cache hit: {}", key);
            return Ok(saved);
        }

        debug!("Cache miss: {}", key);
        let fresh = fetch().await?;
        self.cache.store(&key, &fresh).await;

        Ok(fresh)
    }
}

#[async_trait]
impl<C: BookingApi + ?Sized> BookingApi for CachedBookingApi<C> {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginSuccess> {
        self.client.login(email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> ApiResult<()> {
        self.client.register(email, password).await
    }

    async fn search_apartments(
        &self,
        city: Option<&str>,
        rooms: Option<i64>,
        beds: Option<i64>,
    ) -> ApiResult<ApartmentsList> {
        let args = KeyArgs::new()
            .arg("city", city)
            .arg("rooms", rooms)
            .arg("beds", beds);

        self.cached_call(CacheableOperation::SearchApartments, args, || {
            self.client.search_apartments(city, rooms, beds)
        })
        .await
    }

    async fn apartment_details(&self, id: &str) -> ApiResult<ApartmentDetails> {
        let args = KeyArgs::new().arg("id", id);

        self.cached_call(CacheableOperation::ApartmentDetails, args, || {
            self.client.apartment_details(id)
        })
        .await
    }

    async fn apartments_by_owner(&self, owner_id: &str) -> ApiResult<OwnerApartments> {
        let args = KeyArgs::new().arg("ownerId", owner_id);

        self.cached_call(CacheableOperation::ApartmentsByOwner, args, || {
            self.client.apartments_by_owner(owner_id)
        })
        .await
    }

    async fn bookings_by_user(&self, user_id: &str) -> ApiResult<BookingsList> {
        let args = KeyArgs::new().arg("userId", user_id);

        self.cached_call(CacheableOperation::BookingsByUser, args, || {
            self.client.bookings_by_user(user_id)
        })
        .await
    }

    async fn create_apartment(&self, apartment: &ApartmentCreate) -> ApiResult<MediumApartment> {
        self.client.create_apartment(apartment).await
    }

    async fn update_apartment(&self, id: &str, update: &ApartmentUpdate) -> ApiResult<()> {
        self.client.update_apartment(id, update).await
    }

    async fn book_apartment(&self, booking: &BookingCreate) -> ApiResult<Booking> {
        self.client.book_apartment(booking).await
    }
}

/// Cheap, clonable handle for invalidating cached reads.
///
/// Lets code that only holds an `Arc<dyn BookingApi>` still honour the
/// invalidation protocol.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    cache: CacheStore,
}

impl CacheInvalidator {
    /// Drop every cached result of `operation`, whatever its arguments.
    pub async fn invalidate(&self, operation: CacheableOperation) -> u64 {
        self.cache.invalidate(&operation_prefix(operation.name())).await
    }

    pub async fn invalidate_search(&self) -> u64 {
        self.invalidate(CacheableOperation::SearchApartments).await
    }

    pub async fn invalidate_apartment_details(&self) -> u64 {
        self.invalidate(CacheableOperation::ApartmentDetails).await
    }

    pub async fn invalidate_owner_apartments(&self) -> u64 {
        self.invalidate(CacheableOperation::ApartmentsByOwner).await
    }

    pub async fn invalidate_bookings(&self) -> u64 {
        self.invalidate(CacheableOperation::BookingsByUser).await
    }

    pub async fn invalidate_all(&self) -> u64 {
        self.cache.invalidate_all().await
    }

    /// Invalidate every family affected by a successful `operation`.
    pub async fn after_write(&self, operation: WriteOperation) -> u64 {
        let mut removed = 0;
        for family in operation.affected_families() {
            removed += self.invalidate(*family).await;
        }
        debug!("Invalidated {} entries after {:?}", removed, operation);
        removed
    }
}
