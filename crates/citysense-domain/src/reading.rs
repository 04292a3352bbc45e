use chrono::{DateTime, Utc};

/// Reserved document key for the server-side receipt timestamp.
///
/// The pipeline always writes this key with the bridge's own wall-clock
/// time, overwriting any value the device reported under the same name.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Receipt timestamps are UTC with microsecond precision and a literal
/// trailing `Z`, e.g. `2024-01-01T00:00:00.000000Z`.
pub const RECEIPT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// A parsed sensor reading: the field map a device published, stamped with
/// [`TIMESTAMP_KEY`] before persistence. Field names and value types are
/// entirely device-defined; the bridge does no schema validation.
pub type SensorReading = serde_json::Map<String, serde_json::Value>;

/// Render a receipt timestamp in the fixed storage format.
pub fn format_receipt_timestamp(at: DateTime<Utc>) -> String {
    at.format(RECEIPT_TIMESTAMP_FORMAT).to_string()
}
