use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{IngestError, IngestResult};
use crate::reading::{format_receipt_timestamp, SensorReading, TIMESTAMP_KEY};
use crate::repository::SensorReadingStore;

/// Per-message entry point the transport layer drives.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReadingIngestor: Send + Sync {
    /// Run one raw payload through decode, parse, stamp and persist.
    async fn ingest(&self, payload: &[u8]) -> IngestResult<()>;
}

/// Executes the ingestion pipeline for a single message: decode the payload
/// as UTF-8, parse it as a JSON object, stamp the server receipt time under
/// [`TIMESTAMP_KEY`] and hand the result to the store as one document.
///
/// The service owns the store and clock handles so the transport stays a
/// thin event loop and tests can swap in fakes.
pub struct IngestService {
    store: Arc<dyn SensorReadingStore>,
    clock: Arc<dyn Clock>,
}

impl IngestService {
    pub fn new(store: Arc<dyn SensorReadingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl ReadingIngestor for IngestService {
    async fn ingest(&self, payload: &[u8]) -> IngestResult<()> {
        let text = std::str::from_utf8(payload)?;
        let value: serde_json::Value = serde_json::from_str(text)?;

        let mut reading: SensorReading = match value {
            serde_json::Value::Object(fields) => fields,
            other => return Err(IngestError::PayloadNotObject(json_type_name(&other))),
        };

        // Server receipt time, never device time. Overwrites any value the
        // device sent under the reserved key.
        let received_at = self.clock.now_utc();
        reading.insert(
            TIMESTAMP_KEY.to_string(),
            serde_json::Value::String(format_receipt_timestamp(received_at)),
        );

        let field_count = reading.len();
        debug!(field_count, "Stamped sensor reading");

        self.store.insert_reading(reading).await?;

        info!(field_count, "Successfully ingested sensor reading");

        Ok(())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
