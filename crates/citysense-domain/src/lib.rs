pub mod clock;
pub mod error;
pub mod ingest_service;
pub mod reading;
pub mod repository;

pub use clock::{Clock, SystemClock};
pub use error::{IngestError, IngestResult};
pub use ingest_service::{IngestService, ReadingIngestor};
pub use reading::{
    format_receipt_timestamp, SensorReading, RECEIPT_TIMESTAMP_FORMAT, TIMESTAMP_KEY,
};
pub use repository::SensorReadingStore;

#[cfg(any(test, feature = "testing"))]
pub use clock::MockClock;
#[cfg(any(test, feature = "testing"))]
pub use ingest_service::MockReadingIngestor;
#[cfg(any(test, feature = "testing"))]
pub use repository::MockSensorReadingStore;
