//! HTTP implementation of the booking API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{
    ApartmentCreate, ApartmentDetails, ApartmentUpdate, ApartmentsList, ApiError, ApiResult,
    Booking, BookingApi, BookingCreate, BookingsList, Credentials, LoginSuccess, MediumApartment,
    OwnerApartments,
};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Error body returned by both services.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for the auth and booking services.
#[derive(Debug, Clone)]
pub struct HttpBookingApi {
    http: Client,
    auth_base: Url,
    booking_base: Url,
}

impl HttpBookingApi {
    /// Create a client for the given service base URLs.
    pub fn new(auth_base: Url, booking_base: Url) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            auth_base,
            booking_base,
        })
    }

    fn auth_url(&self, segments: &[&str]) -> ApiResult<Url> {
        with_segments(&self.auth_base, segments)
    }

    fn booking_url(&self, segments: &[&str]) -> ApiResult<Url> {
        with_segments(&self.booking_base, segments)
    }

    async fn send(&self, request: RequestBuilder, label: &str) -> ApiResult<Response> {
        debug!("{}", label);
        Ok(request.send().await?)
    }

    /// Decode a successful response, or map the status to an error.
    async fn read<T: DeserializeOwned>(response: Response, expected: u16) -> ApiResult<T> {
        let status = response.status().as_u16();
        if status != expected {
            return Err(Self::error_for(status, response).await);
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Check the status of a response without a body.
    async fn expect_status(response: Response, expected: u16) -> ApiResult<()> {
        let status = response.status().as_u16();
        if status != expected {
            return Err(Self::error_for(status, response).await);
        }
        Ok(())
    }

    async fn error_for(status: u16, response: Response) -> ApiError {
        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        ApiError::from_status(status, message)
    }
}

/// Append `segments` to the base path, percent-encoding each one.
fn with_segments(base: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::Transport(format!("base URL '{base}' cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `apartments?city&rooms&beds`, leaving out unset filters and an empty city.
fn search_url(mut url: Url, city: Option<&str>, rooms: Option<i64>, beds: Option<i64>) -> Url {
    let mut query = Vec::new();
    if let Some(city) = city.filter(|c| !c.is_empty()) {
        query.push(("city", city.to_string()));
    }
    if let Some(rooms) = rooms {
        query.push(("rooms", rooms.to_string()));
    }
    if let Some(beds) = beds {
        query.push(("beds", beds.to_string()));
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    url
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginSuccess> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(self.auth_url(&["auth", "login"])?).json(&body);
        let response = self.send(request, "POST /auth/login").await?;
        Self::read(response, 200).await
    }

    async fn register(&self, email: &str, password: &str) -> ApiResult<()> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(self.auth_url(&["auth", "register"])?).json(&body);
        let response = self.send(request, "POST /auth/register").await?;
        Self::expect_status(response, 201).await
    }

    async fn search_apartments(
        &self,
        city: Option<&str>,
        rooms: Option<i64>,
        beds: Option<i64>,
    ) -> ApiResult<ApartmentsList> {
        let url = search_url(self.booking_url(&["apartments"])?, city, rooms, beds);
        let response = self.send(self.http.get(url), "GET /apartments").await?;
        Self::read(response, 200).await
    }

    async fn apartment_details(&self, id: &str) -> ApiResult<ApartmentDetails> {
        let url = self.booking_url(&["apartments", id])?;
        let response = self.send(self.http.get(url), &format!("GET /apartments/{id}")).await?;
        Self::read(response, 200).await
    }

    async fn apartments_by_owner(&self, owner_id: &str) -> ApiResult<OwnerApartments> {
        let url = self.booking_url(&["owners", owner_id, "apartments"])?;
        let label = format!("GET /owners/{owner_id}/apartments");
        let response = self.send(self.http.get(url), &label).await?;
        Self::read(response, 200).await
    }

    async fn bookings_by_user(&self, user_id: &str) -> ApiResult<BookingsList> {
        let url = self.booking_url(&["users", user_id, "bookings"])?;
        let label = format!("GET /users/{user_id}/bookings");
        let response = self.send(self.http.get(url), &label).await?;
        Self::read(response, 200).await
    }

    async fn create_apartment(&self, apartment: &ApartmentCreate) -> ApiResult<MediumApartment> {
        let request = self.http.post(self.booking_url(&["apartments"])?).json(apartment);
        let response = self.send(request, "POST /apartments").await?;
        Self::read(response, 201).await
    }

    async fn update_apartment(&self, id: &str, update: &ApartmentUpdate) -> ApiResult<()> {
        let request = self
            .http
            .patch(self.booking_url(&["apartments", id])?)
            .json(update);
        let response = self.send(request, &format!("PATCH /apartments/{id}")).await?;
        Self::expect_status(response, 200).await
    }

    async fn book_apartment(&self, booking: &BookingCreate) -> ApiResult<Booking> {
        let request = self.http.post(self.booking_url(&["book"])?).json(booking);
        let response = self.send(request, "POST /book").await?;
        Self::read(response, 200).await
    }
}
