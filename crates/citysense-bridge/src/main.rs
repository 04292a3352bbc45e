mod config;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use citysense_domain::{IngestService, ReadingIngestor, SystemClock};
use citysense_mongo::{MongoClient, MongoReadingStore};
use citysense_mqtt::run_mqtt_ingress;
use citysense_runner::Runner;
use config::BridgeConfig;
use telemetry::{init_telemetry, TelemetryConfig};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match BridgeConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
        log_json: config.log_json,
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(
        broker = %config.mqtt_broker_host,
        topic = %config.mqtt_topic,
        database = %config.mongo_database,
        collection = %config.mongo_collection,
        "Starting citysense-bridge"
    );
    debug!("Configuration: {:?}", config);

    // MongoDB must be reachable before any message is accepted
    let mongo_client = match MongoClient::connect(&config.mongo_config()).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize MongoDB: {:#}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(MongoReadingStore::new(
        &mongo_client,
        &config.mongo_collection,
    ));
    let ingestor: Arc<dyn ReadingIngestor> =
        Arc::new(IngestService::new(store, Arc::new(SystemClock)));

    let mqtt_config = config.mqtt_config();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    let result = Runner::new()
        .with_named_process("mqtt_ingress", move |token| {
            run_mqtt_ingress(mqtt_config, ingestor, token)
        })
        .with_closer(move || async move {
            mongo_client.shutdown().await;
            Ok(())
        })
        .with_closer_timeout(shutdown_timeout)
        .run()
        .await;

    if let Err(e) = result {
        error!("Bridge exited with error: {:#}", e);
        std::process::exit(1);
    }

    info!("Bridge stopped");
}
