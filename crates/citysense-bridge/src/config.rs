use citysense_mongo::MongoConfig;
use citysense_mqtt::MqttConfig;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BridgeConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON instead of the human-readable format
    #[serde(default = "default_log_json")]
    pub log_json: bool,

    // MQTT configuration
    /// MQTT broker hostname
    #[serde(default = "default_mqtt_broker_host")]
    pub mqtt_broker_host: String,

    /// MQTT broker port
    #[serde(default = "default_mqtt_broker_port")]
    pub mqtt_broker_port: u16,

    /// Topic carrying sensor readings
    #[serde(default = "default_mqtt_topic")]
    pub mqtt_topic: String,

    /// MQTT keepalive interval in seconds
    #[serde(default = "default_mqtt_keepalive_secs")]
    pub mqtt_keepalive_secs: u64,

    /// MQTT client identifier
    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,

    // MongoDB configuration
    /// MongoDB connection URL
    #[serde(default = "default_mongo_url")]
    pub mongo_url: String,

    /// Database holding sensor readings
    #[serde(default = "default_mongo_database")]
    pub mongo_database: String,

    /// Collection holding sensor readings
    #[serde(default = "default_mongo_collection")]
    pub mongo_collection: String,

    /// Write concern for inserts: "majority" or a node count
    #[serde(default = "default_mongo_write_concern")]
    pub mongo_write_concern: String,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Budget for shutdown cleanup in seconds
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_json() -> bool {
    false
}

// MQTT defaults
fn default_mqtt_broker_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_broker_port() -> u16 {
    1883
}

fn default_mqtt_topic() -> String {
    "iot".to_string()
}

fn default_mqtt_keepalive_secs() -> u64 {
    60
}

fn default_mqtt_client_id() -> String {
    "citysense-bridge".to_string()
}

// MongoDB defaults
fn default_mongo_url() -> String {
    "mongodb://localhost:27017/".to_string()
}

fn default_mongo_database() -> String {
    "smart_city_env".to_string()
}

fn default_mongo_collection() -> String {
    "sensor_readings".to_string()
}

fn default_mongo_write_concern() -> String {
    "1".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("CITYSENSE"))
            .build()?
            .try_deserialize()
    }

    pub fn mqtt_config(&self) -> MqttConfig {
        MqttConfig {
            broker_host: self.mqtt_broker_host.clone(),
            broker_port: self.mqtt_broker_port,
            topic: self.mqtt_topic.clone(),
            keepalive_secs: self.mqtt_keepalive_secs,
            client_id: self.mqtt_client_id.clone(),
        }
    }

    pub fn mongo_config(&self) -> MongoConfig {
        MongoConfig {
            url: self.mongo_url.clone(),
            database: self.mongo_database.clone(),
            collection: self.mongo_collection.clone(),
            write_concern: self.mongo_write_concern.clone(),
            server_selection_timeout_secs: self.startup_timeout_secs,
        }
    }
}
