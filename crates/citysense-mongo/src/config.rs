use serde::{Deserialize, Serialize};

/// Connection settings for the sensor reading store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    pub url: String,
    pub database: String,
    pub collection: String,
    /// Acknowledgment level for reading inserts: `"majority"` or a node
    /// count such as `"1"`. Explicit so durability is a configuration
    /// decision rather than a driver default.
    pub write_concern: String,
    /// Startup budget for server selection, in seconds. Connection failures
    /// surface within this window because the client pings on connect.
    pub server_selection_timeout_secs: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017/".to_string(),
            database: "smart_city_env".to_string(),
            collection: "sensor_readings".to_string(),
            write_concern: "1".to_string(),
            server_selection_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MongoConfig::default();

        assert_eq!(config.url, "mongodb://localhost:27017/");
        assert_eq!(config.database, "smart_city_env");
        assert_eq!(config.collection, "sensor_readings");
        assert_eq!(config.write_concern, "1");
        assert_eq!(config.server_selection_timeout_secs, 30);
    }
}
