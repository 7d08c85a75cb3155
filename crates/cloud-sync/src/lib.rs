//! Cloud Synchronization Module
//!
//! Pushes session snapshots to the server on a fixed timer:
//! - HTTP `POST /api/update_session` (default), inside a server session
//!   opened with `POST /api/sessions` and closed with `GET /generate_report`
//! - MQTT publish on `sessions/{client_id}/snapshots`
//! - Calibration lookup at startup
//!
//! Delivery is best effort. A failed push is reported to the caller and
//! never retried or queued.

mod http;
mod mqtt;
mod sink;

pub use http::{fetch_calibration, Calibration, HttpTelemetrySink, RemoteSession, ReportSummary};
pub use mqtt::{MqttConfig, MqttTelemetrySink, SnapshotMessage};
pub use sink::{MemorySink, TelemetryClient, TelemetrySink};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Cloud sync error types
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Server rejected snapshot: status {0}")]
    Rejected(u16),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Http(e.to_string())
    }
}

/// Telemetry transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Http,
    Mqtt,
    /// Snapshots are computed but not sent
    Disabled,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub transport: Transport,
    /// Server base URL for the HTTP transport and calibration lookup
    pub server_url: String,
    /// Push period (seconds)
    pub interval_secs: u64,
    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,
    pub mqtt: MqttConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Http,
            server_url: "http://127.0.0.1:5000".to_string(),
            interval_secs: 4,
            timeout_ms: 2000,
            mqtt: MqttConfig::default(),
        }
    }
}

impl TelemetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(4));
        assert_eq!(config.transport, Transport::Http);
    }

    #[test]
    fn test_transport_deserialize() {
        let config: TelemetryConfig =
            serde_json::from_str(r#"{"transport": "mqtt", "interval_secs": 0}"#).unwrap();
        assert_eq!(config.transport, Transport::Mqtt);
        // zero would spin the timer
        assert_eq!(config.interval(), Duration::from_secs(1));
    }
}
