use async_trait::async_trait;

use crate::error::IngestResult;
use crate::reading::SensorReading;

/// Storage seam for persisted sensor readings.
///
/// Implementations append one document per reading. There is no update or
/// delete path: a reading's lifecycle ends when the insert returns.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SensorReadingStore: Send + Sync {
    async fn insert_reading(&self, reading: SensorReading) -> IngestResult<()>;
}
