use serde::{Deserialize, Serialize};

/// Broker and subscription settings for the MQTT ingress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub topic: String,
    pub keepalive_secs: u64,
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            topic: "iot".to_string(),
            keepalive_secs: 60,
            client_id: "citysense-bridge".to_string(),
        }
    }
}
