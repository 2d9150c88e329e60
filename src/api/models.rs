//! Wire models for the booking API.
//!
//! Field names follow the server's snake_case JSON; dates are RFC 3339.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Free-form apartment attributes (`rooms`, `beds`, `wifi`, `text_desc`, ...).
pub type ApartmentInfo = BTreeMap<String, String>;

/// Body of `POST auth/login` and `POST auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSuccess {
    /// Always `"logged_in"`.
    pub status: String,
    pub user_id: String,
}

// Response primitives

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortApartment {
    pub id: String,
    pub owner_id: String,
    pub address: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediumApartment {
    pub id: String,
    pub owner_id: String,
    pub address: String,
    pub price: f64,
    pub info: ApartmentInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortBooking {
    pub id: String,
    pub user_id: String,
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullApartment {
    pub id: String,
    pub owner_id: String,
    pub address: String,
    pub price: f64,
    pub info: ApartmentInfo,
    pub bookings: Vec<ShortBooking>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub ap_id: String,
    pub address: String,
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
}

// Top-level responses

/// `GET apartments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentsList {
    pub count: usize,
    pub apartments: Vec<ShortApartment>,
}

/// `GET apartments/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentDetails {
    pub apartment: MediumApartment,
    /// The server sends `null` when there are no bookings.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bookings: Vec<BookingRange>,
}

/// `GET owners/{id}/apartments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerApartments {
    pub count: usize,
    pub apartments: Vec<FullApartment>,
}

/// `GET users/{id}/bookings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingsList {
    pub count: usize,
    pub bookings: Vec<Booking>,
}

// Create / update bodies

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentCreate {
    pub owner_id: String,
    pub address: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ApartmentInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentUpdate {
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ApartmentInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingCreate {
    pub user_id: String,
    pub apartment_id: String,
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
