use std::time::Duration;

use anyhow::{Context, Result};
use mongodb::bson::{doc, Document};
use mongodb::options::{Acknowledgment, ClientOptions, WriteConcern};
use mongodb::{Client, Collection, Database};
use tracing::info;

use crate::config::MongoConfig;

/// MongoDB client wrapper.
///
/// The driver defers all I/O until the first operation, so `connect` issues
/// a ping to make an unreachable database a startup error instead of a
/// failure on the first insert.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
}

impl MongoClient {
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        info!(
            url = %config.url,
            database = %config.database,
            "Connecting to MongoDB"
        );

        let mut options = ClientOptions::parse(&config.url)
            .await
            .context("Failed to parse MongoDB connection URL")?;
        options.app_name = Some("citysense-bridge".to_string());
        options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));
        options.write_concern = Some(parse_write_concern(&config.write_concern)?);

        let client =
            Client::with_options(options).context("Failed to create MongoDB client")?;
        let database = client.database(&config.database);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to reach MongoDB")?;

        info!("Successfully connected to MongoDB");

        Ok(Self { client, database })
    }

    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// Tear down the connection pool. In-flight operations are allowed to
    /// complete first.
    pub async fn shutdown(self) {
        info!("Closing MongoDB connection");
        self.client.shutdown().await;
    }
}

/// Parse a write-concern level: `"majority"` or a positive node count.
pub(crate) fn parse_write_concern(level: &str) -> Result<WriteConcern> {
    let acknowledgment = match level.trim() {
        "majority" => Acknowledgment::Majority,
        other => {
            let nodes: u32 = other.parse().with_context(|| {
                format!(
                    "Invalid write concern '{}': expected \"majority\" or a node count",
                    other
                )
            })?;
            Acknowledgment::Nodes(nodes)
        }
    };

    Ok(WriteConcern::builder().w(acknowledgment).build())
}
