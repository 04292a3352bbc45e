use anyhow::Context;
use async_trait::async_trait;
use citysense_domain::{IngestResult, SensorReading, SensorReadingStore};
use futures::TryStreamExt;
use mongodb::bson::{doc, to_document, Document};
use mongodb::Collection;
use tracing::debug;

use crate::client::MongoClient;

/// MongoDB-backed reading store: one document appended per ingested reading.
#[derive(Clone)]
pub struct MongoReadingStore {
    collection: Collection<Document>,
}

impl MongoReadingStore {
    pub fn new(client: &MongoClient, collection: &str) -> Self {
        Self {
            collection: client.collection(collection),
        }
    }

    /// Newest-first readback of persisted readings, the dashboard's
    /// last-N query. Insertion order is approximated by `_id`.
    pub async fn find_recent(&self, limit: i64) -> anyhow::Result<Vec<Document>> {
        let documents: Vec<Document> = self
            .collection
            .find(doc! {})
            .sort(doc! { "_id": -1 })
            .limit(limit)
            .await
            .context("Failed to query recent sensor readings")?
            .try_collect()
            .await
            .context("Failed to drain recent sensor readings cursor")?;

        Ok(documents)
    }
}

fn reading_to_document(reading: &SensorReading) -> anyhow::Result<Document> {
    to_document(reading).context("Failed to convert sensor reading to BSON")
}

#[async_trait]
impl SensorReadingStore for MongoReadingStore {
    async fn insert_reading(&self, reading: SensorReading) -> IngestResult<()> {
        let document = reading_to_document(&reading)?;

        debug!(
            collection = self.collection.name(),
            field_count = document.len(),
            "Inserting sensor reading"
        );

        self.collection
            .insert_one(document)
            .await
            .context("Failed to insert sensor reading")?;

        Ok(())
    }
}
