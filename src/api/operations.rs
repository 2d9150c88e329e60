//! Operation names and the write → invalidation mapping.

use std::fmt;

/// Read operations whose results may be served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheableOperation {
    SearchApartments,
    ApartmentDetails,
    ApartmentsByOwner,
    BookingsByUser,
}

impl CacheableOperation {
    pub const ALL: [CacheableOperation; 4] = [
        CacheableOperation::SearchApartments,
        CacheableOperation::ApartmentDetails,
        CacheableOperation::ApartmentsByOwner,
        CacheableOperation::BookingsByUser,
    ];

    /// Name used as the first segment of cache keys.
    pub fn name(self) -> &'static str {
        match self {
            CacheableOperation::SearchApartments => "searchApartments",
            CacheableOperation::ApartmentDetails => "apartmentDetails",
            CacheableOperation::ApartmentsByOwner => "apartmentsByOwner",
            CacheableOperation::BookingsByUser => "bookingsByUser",
        }
    }
}

impl fmt::Display for CacheableOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations that are never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOperation {
    Login,
    Register,
    CreateApartment,
    UpdateApartment,
    BookApartment,
}

impl WriteOperation {
    /// Cached read families whose results can change after this operation
    /// succeeds.
    pub fn affected_families(self) -> &'static [CacheableOperation] {
        use CacheableOperation::*;

        match self {
            WriteOperation::Login | WriteOperation::Register => &[],
            WriteOperation::CreateApartment | WriteOperation::UpdateApartment => {
                &[ApartmentsByOwner, ApartmentDetails, SearchApartments]
            }
            // Owners see bookings on their listings
            WriteOperation::BookApartment => &[BookingsByUser, ApartmentDetails, ApartmentsByOwner],
        }
    }
}
