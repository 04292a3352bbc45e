use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use citysense_domain::{IngestError, ReadingIngestor};
use rumqttc::{
    AsyncClient, ConnAck, ConnectReturnCode, ConnectionError, Event, MqttOptions, Packet, Publish,
    QoS,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;

/// What the connect-completion handler does with a CONNACK reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Reason code 0: subscribe to the configured topic.
    Subscribe,
    /// Any other code: log it and stay connected but idle.
    StayIdle,
}

/// Binary branch on the CONNACK reason code, not a state machine.
pub fn handshake_action(code: ConnectReturnCode) -> HandshakeAction {
    match code {
        ConnectReturnCode::Success => HandshakeAction::Subscribe,
        _ => HandshakeAction::StayIdle,
    }
}

/// Run the MQTT ingress loop until the cancellation token fires.
///
/// Failures before the first broker handshake are startup errors and
/// returned to the caller. After that, event-loop errors are logged and
/// polling continues. Each PUBLISH is handed to the ingestor inline and
/// awaited before the next poll, so messages are processed one at a time
/// in delivery order.
pub async fn run_mqtt_ingress(
    config: MqttConfig,
    ingestor: Arc<dyn ReadingIngestor>,
    cancellation_token: CancellationToken,
) -> Result<()> {
    let mut mqtt_options = MqttOptions::new(
        &config.client_id,
        &config.broker_host,
        config.broker_port,
    );
    mqtt_options.set_keep_alive(Duration::from_secs(config.keepalive_secs));
    mqtt_options.set_clean_session(true);

    let (client, mut event_loop) = AsyncClient::new(mqtt_options, 100);

    info!(
        broker = %config.broker_host,
        port = config.broker_port,
        topic = %config.topic,
        "Starting MQTT ingress"
    );

    let mut handshake_done = false;

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Shutdown requested, disconnecting from MQTT broker");
                let _ = client.disconnect().await;
                return Ok(());
            }
            event = event_loop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        handshake_done = true;
                        handle_connack(&client, &config.topic, ack).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        handle_publish(ingestor.as_ref(), &publish).await;
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        debug!("Subscription acknowledged by broker");
                    }
                    Ok(_) => {}
                    Err(ConnectionError::ConnectionRefused(code)) => {
                        // The broker accepted the socket but rejected the
                        // session. Stay up and idle; the next poll retries
                        // the handshake.
                        handshake_done = true;
                        warn!(code = ?code, "Broker rejected connection");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    Err(e) if !handshake_done => {
                        return Err(anyhow::Error::new(e)
                            .context("Failed to connect to MQTT broker"));
                    }
                    Err(e) => {
                        error!(error = %e, "MQTT event loop error");
                        // Continue polling despite transient errors.
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

async fn handle_connack(client: &AsyncClient, topic: &str, ack: ConnAck) {
    match handshake_action(ack.code) {
        HandshakeAction::Subscribe => {
            info!("Connected to MQTT broker");
            match client.subscribe(topic, QoS::AtMostOnce).await {
                Ok(()) => info!(topic, "Subscribed to sensor topic"),
                Err(e) => error!(error = %e, topic, "Failed to issue subscribe request"),
            }
        }
        HandshakeAction::StayIdle => {
            warn!(code = ?ack.code, "Broker rejected connection, staying idle");
        }
    }
}

/// Process one inbound message. Never returns an error: bad payloads are
/// logged and the event loop moves on.
async fn handle_publish(ingestor: &dyn ReadingIngestor, publish: &Publish) {
    debug!(
        topic = %publish.topic,
        payload_size = publish.payload.len(),
        "Received message"
    );

    match ingestor.ingest(&publish.payload).await {
        Ok(()) => {}
        Err(IngestError::PayloadNotJson(_)) => {
            warn!(topic = %publish.topic, "Received data was not valid JSON");
        }
        Err(e) => {
            error!(topic = %publish.topic, error = %e, "Failed to process message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citysense_domain::MockReadingIngestor;

    #[test]
    fn test_handshake_action_success_subscribes() {
        assert_eq!(
            handshake_action(ConnectReturnCode::Success),
            HandshakeAction::Subscribe
        );
    }

    #[test]
    fn test_handshake_action_rejection_stays_idle() {
        assert_eq!(
            handshake_action(ConnectReturnCode::ServiceUnavailable),
            HandshakeAction::StayIdle
        );
        assert_eq!(
            handshake_action(ConnectReturnCode::NotAuthorized),
            HandshakeAction::StayIdle
        );
        assert_eq!(
            handshake_action(ConnectReturnCode::BadClientId),
            HandshakeAction::StayIdle
        );
    }

    #[tokio::test]
    async fn test_handle_publish_forwards_payload_to_ingestor() {
        // Arrange
        let mut ingestor = MockReadingIngestor::new();
        ingestor
            .expect_ingest()
            .withf(|payload: &[u8]| payload == br#"{"temp": 31.2}"#.as_slice())
            .times(1)
            .returning(|_| Ok(()));
        let publish = Publish::new("iot", QoS::AtMostOnce, br#"{"temp": 31.2}"#.to_vec());

        // Act
        handle_publish(&ingestor, &publish).await;
    }

    #[tokio::test]
    async fn test_handle_publish_swallows_parse_failures() {
        // Arrange
        let mut ingestor = MockReadingIngestor::new();
        ingestor.expect_ingest().times(1).returning(|_| {
            Err(IngestError::PayloadNotJson(
                serde_json::from_str::<serde_json::Value>("not-json").unwrap_err(),
            ))
        });
        let publish = Publish::new("iot", QoS::AtMostOnce, b"not-json".to_vec());

        // Act: must not panic or propagate.
        handle_publish(&ingestor, &publish).await;
    }

    #[tokio::test]
    async fn test_handle_publish_swallows_store_failures() {
        // Arrange
        let mut ingestor = MockReadingIngestor::new();
        ingestor
            .expect_ingest()
            .times(1)
            .returning(|_| Err(IngestError::Store(anyhow::anyhow!("insert failed"))));
        let publish = Publish::new("iot", QoS::AtMostOnce, br#"{"temp": 1}"#.to_vec());

        // Act: must not panic or propagate.
        handle_publish(&ingestor, &publish).await;
    }

    #[tokio::test]
    async fn test_run_returns_ok_when_cancelled_before_connect() {
        // Arrange
        let token = CancellationToken::new();
        token.cancel();
        let mut ingestor = MockReadingIngestor::new();
        ingestor.expect_ingest().times(0);

        // Act
        let result =
            run_mqtt_ingress(MqttConfig::default(), Arc::new(ingestor), token).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_fails_fast_when_broker_unreachable() {
        // Arrange
        let config = MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1,
            ..MqttConfig::default()
        };
        let mut ingestor = MockReadingIngestor::new();
        ingestor.expect_ingest().times(0);

        // Act
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            run_mqtt_ingress(config, Arc::new(ingestor), CancellationToken::new()),
        )
        .await;

        // Assert
        assert!(result.expect("Connect should fail before the timeout").is_err());
    }
}
