//! MongoDB connection used by the persistent cache backend.

use std::time::Duration;

use anyhow::Context;
use mongodb::bson::{Document, doc};
use mongodb::{Client, Collection, options::ClientOptions};
use tracing::info;

/// How long to wait for a reachable server before giving up.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the cache database.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB and ping it.
    ///
    /// # Errors
    /// Returns error if the URI is invalid or no server answers within
    /// the selection timeout.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .context("Invalid MONGODB_URI")?;
        options.app_name = Some("rentcache".to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);

        let client = Client::with_options(options)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB did not answer ping")?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Untyped collection; cache documents are encoded by hand.
    pub fn documents(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}
