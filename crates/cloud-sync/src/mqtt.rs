//! MQTT transport

use crate::{SyncError, TelemetrySink};
use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, ClientError, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;
use wellness::SessionSnapshot;

/// MQTT broker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    /// Client identifier; also names the topic
    pub client_id: String,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "wellness-monitor".to_string(),
            keep_alive_secs: 30,
        }
    }
}

impl MqttConfig {
    pub fn topic(&self) -> String {
        format!("sessions/{}/snapshots", self.client_id)
    }
}

/// Envelope published on the snapshot topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub message_id: Uuid,
    pub client_id: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot: SessionSnapshot,
}

impl SnapshotMessage {
    pub fn new(client_id: &str, snapshot: SessionSnapshot) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            client_id: client_id.to_string(),
            timestamp: Utc::now(),
            snapshot,
        }
    }
}

/// Publishes snapshots to an MQTT broker.
///
/// A snapshot is only handed to the client while the broker session is up;
/// otherwise the publish fails at once instead of waiting in the request
/// channel.
pub struct MqttTelemetrySink {
    client: AsyncClient,
    client_id: String,
    topic: String,
    connected: Arc<AtomicBool>,
}

impl MqttTelemetrySink {
    /// Create the client and spawn its event loop
    pub async fn connect(config: MqttConfig) -> Result<Self, SyncError> {
        if config.client_id.is_empty() {
            return Err(SyncError::Connection("empty MQTT client id".into()));
        }

        let mut options = MqttOptions::new(
            config.client_id.clone(),
            &config.broker_host,
            config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let connected = Arc::new(AtomicBool::new(false));

        let link = Arc::clone(&connected);
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!("MQTT connected: {:?}", ack.code);
                        link.store(true, Ordering::Release);
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        link.store(false, Ordering::Release);
                    }
                    Ok(Event::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                    }
                    Err(e) => {
                        link.store(false, Ordering::Release);
                        error!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    _ => {}
                }
            }
        });

        let topic = config.topic();
        info!("MQTT telemetry to {}:{} on {}", config.broker_host, config.broker_port, topic);
        Ok(Self {
            client,
            client_id: config.client_id,
            topic,
            connected,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the broker has acknowledged the connection
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl TelemetrySink for MqttTelemetrySink {
    async fn publish(&self, snapshot: SessionSnapshot) -> Result<(), SyncError> {
        if !self.is_connected() {
            return Err(SyncError::Connection("MQTT broker not connected".into()));
        }

        let message = SnapshotMessage::new(&self.client_id, snapshot);
        let payload =
            serde_json::to_vec(&message).map_err(|e| SyncError::Serialization(e.to_string()))?;

        // never wait on a full request channel
        self.client
            .try_publish(&self.topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| match e {
                ClientError::TryRequest(_) => SyncError::Publish("MQTT request queue full".into()),
                other => SyncError::Publish(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic() {
        let config = MqttConfig {
            client_id: "desk-7".into(),
            ..Default::default()
        };
        assert_eq!(config.topic(), "sessions/desk-7/snapshots");
    }

    #[test]
    fn test_message_envelope() {
        let snapshot = SessionSnapshot {
            blinks: 5,
            emotion: "Sad".into(),
            keys: 1,
            mouse: 2,
            current_ear: 0.3,
            session_avg_ear: 0.28,
        };
        let message = SnapshotMessage::new("desk-7", snapshot.clone());
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["client_id"], "desk-7");
        assert_eq!(json["snapshot"]["blinks"], 5);
        assert_eq!(json["snapshot"]["emotion"], "Sad");
    }

    #[tokio::test]
    async fn test_unreachable_broker_fails_fast() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let sink = MqttTelemetrySink::connect(MqttConfig {
            broker_host: "127.0.0.1".into(),
            broker_port: port,
            ..Default::default()
        })
        .await
        .unwrap();

        let snapshot = SessionSnapshot {
            blinks: 1,
            emotion: "Neutral".into(),
            keys: 0,
            mouse: 0,
            current_ear: 0.3,
            session_avg_ear: 0.3,
        };
        // more than the request channel holds
        for _ in 0..15 {
            let result = tokio::time::timeout(Duration::from_secs(1), sink.publish(snapshot.clone()))
                .await
                .expect("publish must not block");
            assert!(matches!(result, Err(SyncError::Connection(_))));
        }
        assert!(!sink.is_connected());
    }

    #[tokio::test]
    async fn test_empty_client_id_rejected() {
        let config = MqttConfig {
            client_id: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            MqttTelemetrySink::connect(config).await,
            Err(SyncError::Connection(_))
        ));
    }
}
