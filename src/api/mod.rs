//! Booking API - the remote data-access surface and its implementations.
//!
//! - `BookingApi` - The operations the app can perform
//! - `HttpBookingApi` - Talks to the auth and booking services
//! - `StubBookingApi` - In-memory demo server
//! - `CachedBookingApi` - TTL cache in front of any of the above

mod cached;
mod error;
mod http;
pub mod models;
mod operations;
mod stub;

use async_trait::async_trait;

pub use cached::{CacheInvalidator, CachedBookingApi};
pub use error::ApiError;
pub use http::HttpBookingApi;
pub use models::*;
pub use operations::{CacheableOperation, WriteOperation};
pub use stub::{DEMO_OWNER_1, DEMO_OWNER_2, StubBookingApi};

/// Result of a booking API call.
pub type ApiResult<T> = Result<T, ApiError>;

/// Remote operations of the rental-booking service.
#[async_trait]
pub trait BookingApi: Send + Sync {
    // Auth
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginSuccess>;
    async fn register(&self, email: &str, password: &str) -> ApiResult<()>;

    // Reads
    async fn search_apartments(
        &self,
        city: Option<&str>,
        rooms: Option<i64>,
        beds: Option<i64>,
    ) -> ApiResult<ApartmentsList>;
    async fn apartment_details(&self, id: &str) -> ApiResult<ApartmentDetails>;
    async fn apartments_by_owner(&self, owner_id: &str) -> ApiResult<OwnerApartments>;
    async fn bookings_by_user(&self, user_id: &str) -> ApiResult<BookingsList>;

    // Create / update
    async fn create_apartment(&self, apartment: &ApartmentCreate) -> ApiResult<MediumApartment>;
    async fn update_apartment(&self, id: &str, update: &ApartmentUpdate) -> ApiResult<()>;
    async fn book_apartment(&self, booking: &BookingCreate) -> ApiResult<Booking>;
}
