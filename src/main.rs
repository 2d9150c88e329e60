//! rentcache - demo walkthrough against the booking API.
//!
//! Builds the application context from the environment, runs a short
//! session (register, log in, search, book) through the cached client and
//! shuts down.

use std::time::Instant;

use chrono::{TimeDelta, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rentcache::AppContext;
use rentcache::api::{ApiError, BookingCreate, WriteOperation};
use rentcache::config::Config;
use rentcache::context::SearchMode;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const DEMO_EMAIL: &str = "demo@rentcache.dev";
const DEMO_PASSWORD: &str = "demo1234";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rentcache=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting rentcache...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("API mode: {:?}, cache backend: {:?}", config.api_mode, config.cache_backend);

    let ctx = AppContext::build(&config).await?;

    tokio::select! {
        result = walkthrough(&ctx) => {
            if let Err(e) = result {
                warn!("Walkthrough failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    ctx.shutdown().await;
    info!("Bye");
    Ok(())
}

async fn walkthrough(ctx: &AppContext) -> Result<(), ApiError> {
    let api = ctx.api();

    match api.register(DEMO_EMAIL, DEMO_PASSWORD).await {
        Ok(()) => info!("Registered {}", DEMO_EMAIL),
        Err(ApiError::Conflict { .. }) => info!("{} already registered", DEMO_EMAIL),
        Err(e) => return Err(e),
    }

    let login = api.login(DEMO_EMAIL, DEMO_PASSWORD).await?;
    ctx.session().write().user_id = login.user_id.clone();
    info!("Logged in as {}", login.user_id);

    let filter = {
        let mut session = ctx.session().write();
        session.search.filter.city = Some("Budapest".to_string());
        session.search.mode = SearchMode::Results;
        session.search.filter.clone()
    };

    // Second search should come from the cache
    for attempt in 1..=2 {
        let started = Instant::now();
        let list = api
            .search_apartments(filter.city.as_deref(), filter.rooms, filter.beds)
            .await?;
        info!(
            "Search #{}: {} apartments in {:?}",
            attempt,
            list.count,
            started.elapsed()
        );
    }

    let list = api
        .search_apartments(filter.city.as_deref(), filter.rooms, filter.beds)
        .await?;
    let Some(first) = list.apartments.first() else {
        info!("No apartments found, nothing to book");
        return Ok(());
    };

    let details = api.apartment_details(&first.id).await?;
    info!(
        "{} ({} per night) has {} booking(s)",
        details.apartment.address,
        details.apartment.price,
        details.bookings.len()
    );

    let from = Utc::now() + TimeDelta::days(30);
    let booking = api
        .book_apartment(&BookingCreate {
            user_id: login.user_id.clone(),
            apartment_id: first.id.clone(),
            time_from: from,
            time_to: from + TimeDelta::days(3),
        })
        .await?;
    info!("Booked {} ({})", booking.address, booking.id);

    let removed = ctx.after_write(WriteOperation::BookApartment).await;
    info!("Invalidated {} cached entries", removed);

    let mine = api.bookings_by_user(&login.user_id).await?;
    info!("{} has {} booking(s)", DEMO_EMAIL, mine.count);

    Ok(())
}
