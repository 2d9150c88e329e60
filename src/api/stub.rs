//! In-memory stand-in for the booking services.
//!
//! Seeded with a handful of apartments and bookings so the app can run
//! without a backend. State lives as long as the stub does.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{
    ApartmentCreate, ApartmentDetails, ApartmentInfo, ApartmentUpdate, ApartmentsList, ApiError,
    ApiResult, Booking, BookingApi, BookingCreate, BookingRange, BookingsList, FullApartment,
    LoginSuccess, MediumApartment, OwnerApartments, ShortApartment, ShortBooking,
};

/// Owner of one seeded apartment; also the guest on the seeded bookings.
pub const DEMO_OWNER_1: &str = "11111111-1111-1111-1111-111111111111";
/// Owner of three seeded apartments.
pub const DEMO_OWNER_2: &str = "22222222-2222-2222-2222-222222222222";

const MIN_PASSWORD_LEN: usize = 4;

struct StubUser {
    id: String,
    password: String,
}

struct StubApartment {
    id: String,
    owner_id: String,
    address: String,
    price: f64,
    info: ApartmentInfo,
}

struct StubBooking {
    id: String,
    ap_id: String,
    user_id: String,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

#[derive(Default)]
struct StubState {
    // email (normalized) -> user
    accounts: HashMap<String, StubUser>,
    apartments: Vec<StubApartment>,
    bookings: Vec<StubBooking>,
}

/// Demo implementation of [`BookingApi`] backed by in-memory data.
pub struct StubBookingApi {
    delay: Duration,
    state: Mutex<StubState>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn info(pairs: &[(&str, &str)]) -> ApartmentInfo {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn seed_time(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

/// City part of an address: everything before the first comma.
fn address_city(address: &str) -> &str {
    address.split(',').next().unwrap_or_default().trim()
}

/// Numeric value of `info[field]`, or -1 when missing or not a number.
fn info_number(info: &ApartmentInfo, field: &str) -> i64 {
    info.get(field)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(-1)
}

fn validate_info(info: &ApartmentInfo) -> ApiResult<()> {
    for field in ["rooms", "beds"] {
        if info.contains_key(field) && info_number(info, field) < 0 {
            return Err(ApiError::bad_request(
                "invalid request form, beds & rooms must be positive integers",
            ));
        }
    }
    Ok(())
}

impl StubBookingApi {
    /// Create a stub that waits `delay` before answering each call.
    pub fn new(delay: Duration) -> Self {
        let apartments = vec![
            StubApartment {
                id: new_id(),
                owner_id: DEMO_OWNER_2.to_string(),
                address: "Budapest, Andrássy út 10".to_string(),
                price: 75.0,
                info: info(&[
                    ("rooms", "2"),
                    ("beds", "2"),
                    ("wifi", "yes"),
                    ("text_desc", "Cozy flat near city center, perfect for weekend trips."),
                ]),
            },
            StubApartment {
                id: new_id(),
                owner_id: DEMO_OWNER_1.to_string(),
                address: "Budapest, Bartók Béla út 5".to_string(),
                price: 55.0,
                info: info(&[
                    ("rooms", "1"),
                    ("beds", "1"),
                    ("wifi", "yes"),
                    ("text_desc", "Small budget studio, great for solo travellers."),
                ]),
            },
            StubApartment {
                id: new_id(),
                owner_id: DEMO_OWNER_2.to_string(),
                address: "Vienna, Mariahilfer Straße 20".to_string(),
                price: 110.0,
                info: info(&[
                    ("rooms", "2"),
                    ("beds", "3"),
                    ("balcony", "yes"),
                    ("text_desc", "Spacious apartment in Vienna shopping district."),
                ]),
            },
            StubApartment {
                id: new_id(),
                owner_id: DEMO_OWNER_2.to_string(),
                address: "Prague, Karlova 8".to_string(),
                price: 130.0,
                info: info(&[
                    ("rooms", "3"),
                    ("beds", "4"),
                    ("view", "Old Town"),
                    ("text_desc", "Old Town flat with a beautiful view."),
                ]),
            },
        ];

        let bookings = vec![
            StubBooking {
                id: new_id(),
                ap_id: apartments[0].id.clone(),
                user_id: DEMO_OWNER_1.to_string(),
                from: seed_time(2025, 12, 1, 15),
                to: seed_time(2025, 12, 7, 11),
            },
            StubBooking {
                id: new_id(),
                ap_id: apartments[2].id.clone(),
                user_id: DEMO_OWNER_1.to_string(),
                from: seed_time(2025, 12, 12, 10),
                to: seed_time(2025, 12, 15, 9),
            },
        ];

        Self {
            delay,
            state: Mutex::new(StubState {
                apartments,
                bookings,
                ..Default::default()
            }),
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for StubBookingApi {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl BookingApi for StubBookingApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginSuccess> {
        self.pause().await;
        let state = self.state.lock();

        match state.accounts.get(&normalize_email(email)) {
            Some(user) if user.password == password => Ok(LoginSuccess {
                status: "logged_in".to_string(),
                user_id: user.id.clone(),
            }),
            _ => Err(ApiError::bad_request("invalid credentials")),
        }
    }

    async fn register(&self, email: &str, password: &str) -> ApiResult<()> {
        self.pause().await;
        let email = normalize_email(email);

        if !is_valid_email(&email) {
            return Err(ApiError::bad_request("invalid email"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::bad_request("invalid password length"));
        }

        let mut state = self.state.lock();
        if state.accounts.contains_key(&email) {
            return Err(ApiError::conflict("email already in use"));
        }

        debug!("Stub registered {}", email);
        state.accounts.insert(
            email,
            StubUser {
                id: new_id(),
                password: password.to_string(),
            },
        );
        Ok(())
    }

    async fn search_apartments(
        &self,
        city: Option<&str>,
        rooms: Option<i64>,
        beds: Option<i64>,
    ) -> ApiResult<ApartmentsList> {
        self.pause().await;
        let state = self.state.lock();

        let city = city.map(str::trim).filter(|c| !c.is_empty()).map(str::to_lowercase);

        let apartments: Vec<ShortApartment> = state
            .apartments
            .iter()
            .filter(|ap| {
                city.as_ref()
                    .is_none_or(|c| address_city(&ap.address).to_lowercase() == *c)
            })
            .filter(|ap| rooms.is_none_or(|r| info_number(&ap.info, "rooms") == r))
            .filter(|ap| beds.is_none_or(|b| info_number(&ap.info, "beds") == b))
            .map(|ap| ShortApartment {
                id: ap.id.clone(),
                owner_id: ap.owner_id.clone(),
                address: ap.address.clone(),
                price: ap.price,
            })
            .collect();

        Ok(ApartmentsList {
            count: apartments.len(),
            apartments,
        })
    }

    async fn apartment_details(&self, id: &str) -> ApiResult<ApartmentDetails> {
        self.pause().await;
        let state = self.state.lock();

        let ap = state
            .apartments
            .iter()
            .find(|ap| ap.id == id)
            .ok_or_else(|| ApiError::bad_request("apartment not found"))?;

        let bookings = state
            .bookings
            .iter()
            .filter(|b| b.ap_id == ap.id)
            .map(|b| BookingRange {
                from: b.from,
                to: b.to,
            })
            .collect();

        Ok(ApartmentDetails {
            apartment: MediumApartment {
                id: ap.id.clone(),
                owner_id: ap.owner_id.clone(),
                address: ap.address.clone(),
                price: ap.price,
                info: ap.info.clone(),
            },
            bookings,
        })
    }

    async fn apartments_by_owner(&self, owner_id: &str) -> ApiResult<OwnerApartments> {
        self.pause().await;
        let state = self.state.lock();

        let apartments: Vec<FullApartment> = state
            .apartments
            .iter()
            .filter(|ap| ap.owner_id == owner_id)
            .map(|ap| FullApartment {
                id: ap.id.clone(),
                owner_id: ap.owner_id.clone(),
                address: ap.address.clone(),
                price: ap.price,
                info: ap.info.clone(),
                bookings: state
                    .bookings
                    .iter()
                    .filter(|b| b.ap_id == ap.id)
                    .map(|b| ShortBooking {
                        id: b.id.clone(),
                        user_id: b.user_id.clone(),
                        time_from: b.from,
                        time_to: b.to,
                    })
                    .collect(),
            })
            .collect();

        Ok(OwnerApartments {
            count: apartments.len(),
            apartments,
        })
    }

    async fn bookings_by_user(&self, user_id: &str) -> ApiResult<BookingsList> {
        self.pause().await;
        let state = self.state.lock();

        let bookings: Vec<Booking> = state
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| Booking {
                id: b.id.clone(),
                user_id: b.user_id.clone(),
                ap_id: b.ap_id.clone(),
                address: state
                    .apartments
                    .iter()
                    .find(|ap| ap.id == b.ap_id)
                    .map_or_else(|| "Unknown address".to_string(), |ap| ap.address.clone()),
                time_from: b.from,
                time_to: b.to,
            })
            .collect();

        Ok(BookingsList {
            count: bookings.len(),
            bookings,
        })
    }

    async fn create_apartment(&self, apartment: &ApartmentCreate) -> ApiResult<MediumApartment> {
        self.pause().await;
        let mut state = self.state.lock();

        if state.apartments.iter().any(|ap| ap.address == apartment.address) {
            return Err(ApiError::conflict(
                "apartment with this address is already registered",
            ));
        }

        let info = apartment.info.clone().unwrap_or_default();
        validate_info(&info)?;

        let created = StubApartment {
            id: new_id(),
            owner_id: apartment.owner_id.clone(),
            address: apartment.address.clone(),
            price: apartment.price,
            info,
        };
        let response = MediumApartment {
            id: created.id.clone(),
            owner_id: created.owner_id.clone(),
            address: created.address.clone(),
            price: created.price,
            info: created.info.clone(),
        };

        debug!("Stub created apartment {}", created.id);
        state.apartments.push(created);
        Ok(response)
    }

    async fn update_apartment(&self, id: &str, update: &ApartmentUpdate) -> ApiResult<()> {
        self.pause().await;
        let mut state = self.state.lock();

        let ap = state
            .apartments
            .iter_mut()
            .find(|ap| ap.id == id)
            .ok_or_else(|| ApiError::bad_request("apartment not found"))?;

        if ap.owner_id != update.owner_id {
            return Err(ApiError::bad_request("forbidden request"));
        }
        if let Some(info) = &update.info {
            validate_info(info)?;
        }

        if let Some(price) = update.price {
            ap.price = price;
        }
        if let Some(info) = &update.info {
            ap.info = info.clone();
        }
        Ok(())
    }

    async fn book_apartment(&self, booking: &BookingCreate) -> ApiResult<Booking> {
        self.pause().await;
        let mut state = self.state.lock();

        let address = state
            .apartments
            .iter()
            .find(|ap| ap.id == booking.apartment_id)
            .map(|ap| ap.address.clone())
            .ok_or_else(|| ApiError::bad_request("apartment not found"))?;

        let created = StubBooking {
            id: new_id(),
            ap_id: booking.apartment_id.clone(),
            user_id: booking.user_id.clone(),
            from: booking.time_from,
            to: booking.time_to,
        };
        let response = Booking {
            id: created.id.clone(),
            user_id: created.user_id.clone(),
            ap_id: created.ap_id.clone(),
            address,
            time_from: created.from,
            time_to: created.to,
        };

        state.bookings.push(created);
        Ok(response)
    }
}
