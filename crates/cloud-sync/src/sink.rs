//! Telemetry sink abstraction

use crate::{HttpTelemetrySink, MqttTelemetrySink, ReportSummary, SyncError, TelemetryConfig, Transport};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wellness::SessionSnapshot;

/// Destination for session snapshots
pub trait TelemetrySink {
    /// Push one snapshot; errors are for the caller to log
    fn publish(&self, snapshot: SessionSnapshot) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Open an upstream session before the first snapshot.
    ///
    /// Returns the server's session id when the transport has one.
    fn open_session(&self) -> impl Future<Output = Result<Option<i64>, SyncError>> + Send {
        async { Ok(None) }
    }

    /// Close the upstream session after the last snapshot and collect its report
    fn close_session(&self) -> impl Future<Output = Result<Option<ReportSummary>, SyncError>> + Send {
        async { Ok(None) }
    }
}

/// Sink chosen from configuration
pub enum TelemetryClient {
    Http(HttpTelemetrySink),
    Mqtt(MqttTelemetrySink),
    Disabled,
}

impl TelemetryClient {
    /// Build the configured sink, connecting to the broker if needed
    pub async fn from_config(config: &TelemetryConfig) -> Result<Self, SyncError> {
        match config.transport {
            Transport::Http => Ok(Self::Http(HttpTelemetrySink::new(
                &config.server_url,
                config.timeout(),
            )?)),
            Transport::Mqtt => Ok(Self::Mqtt(MqttTelemetrySink::connect(config.mqtt.clone()).await?)),
            Transport::Disabled => Ok(Self::Disabled),
        }
    }
}

impl TelemetrySink for TelemetryClient {
    async fn publish(&self, snapshot: SessionSnapshot) -> Result<(), SyncError> {
        match self {
            Self::Http(sink) => sink.publish(snapshot).await,
            Self::Mqtt(sink) => sink.publish(snapshot).await,
            Self::Disabled => Ok(()),
        }
    }

    async fn open_session(&self) -> Result<Option<i64>, SyncError> {
        match self {
            Self::Http(sink) => sink.open_session().await,
            Self::Mqtt(_) | Self::Disabled => Ok(None),
        }
    }

    async fn close_session(&self) -> Result<Option<ReportSummary>, SyncError> {
        match self {
            Self::Http(sink) => sink.close_session().await,
            Self::Mqtt(_) | Self::Disabled => Ok(None),
        }
    }
}

/// Keeps published snapshots in memory; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    published: Arc<Mutex<Vec<SessionSnapshot>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every publish fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<SessionSnapshot> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Sessions opened so far
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far
    pub fn sessions_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl TelemetrySink for MemorySink {
    async fn publish(&self, snapshot: SessionSnapshot) -> Result<(), SyncError> {
        if self.failing {
            return Err(SyncError::Connection("sink offline".into()));
        }
        self.published
            .lock()
            .map_err(|e| SyncError::Publish(format!("Lock error: {}", e)))?
            .push(snapshot);
        Ok(())
    }

    async fn open_session(&self) -> Result<Option<i64>, SyncError> {
        if self.failing {
            return Err(SyncError::Connection("sink offline".into()));
        }
        let id = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(id as i64))
    }

    async fn close_session(&self) -> Result<Option<ReportSummary>, SyncError> {
        if self.failing {
            return Err(SyncError::Connection("sink offline".into()));
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(blinks: u64) -> SessionSnapshot {
        SessionSnapshot {
            blinks,
            emotion: "Neutral".into(),
            keys: 0,
            mouse: 0,
            current_ear: 0.0,
            session_avg_ear: 0.0,
        }
    }

    #[tokio::test]
    async fn test_memory_sink_shared_record() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        handle.publish(snapshot(3)).await.unwrap();
        assert_eq!(sink.published(), vec![snapshot(3)]);
    }

    #[tokio::test]
    async fn test_failing_sink() {
        let sink = MemorySink::failing();
        assert!(sink.publish(snapshot(1)).await.is_err());
        assert!(sink.published().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_client_accepts_everything() {
        let config = TelemetryConfig {
            transport: Transport::Disabled,
            ..Default::default()
        };
        let client = TelemetryClient::from_config(&config).await.unwrap();
        assert!(client.publish(snapshot(1)).await.is_ok());
        assert_eq!(client.open_session().await.unwrap(), None);
        assert!(client.close_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_sink_session_counts() {
        let sink = MemorySink::new();
        assert_eq!(sink.open_session().await.unwrap(), Some(1));
        sink.close_session().await.unwrap();
        assert_eq!((sink.sessions_opened(), sink.sessions_closed()), (1, 1));

        let offline = MemorySink::failing();
        assert!(offline.open_session().await.is_err());
        assert!(offline.close_session().await.is_err());
    }
}
