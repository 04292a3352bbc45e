use thiserror::Error;

/// Failures the per-message ingestion pipeline can produce.
///
/// None of these are allowed to stop the ingress loop: the transport layer
/// logs them and keeps polling. `PayloadNotJson` gets its own fixed
/// diagnostic line; every other variant is reported through the generic
/// processing-error branch.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Payload is not valid UTF-8: {0}")]
    PayloadNotUtf8(#[from] std::str::Utf8Error),

    #[error("Payload is not valid JSON: {0}")]
    PayloadNotJson(#[from] serde_json::Error),

    #[error("Payload is valid JSON but not an object, got {0}")]
    PayloadNotObject(&'static str),

    #[error("Failed to persist sensor reading: {0}")]
    Store(#[from] anyhow::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;
