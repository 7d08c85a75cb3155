//! HTTP transport

use crate::{SyncError, TelemetrySink};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use wellness::SessionSnapshot;

/// Session opened on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RemoteSession {
    pub id: i64,
}

/// Headline figures of the report the server builds when a session closes
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportSummary {
    pub session_id: i64,
    pub duration_minutes: f64,
    pub total_blinks: i64,
    pub blink_rate: f64,
    pub dominant_emotion: String,
}

/// Posts snapshots to `{server}/api/update_session`.
///
/// The server only accepts snapshots for its current session, which
/// `start_session` opens and `generate_report` closes.
#[derive(Debug, Clone)]
pub struct HttpTelemetrySink {
    client: reqwest::Client,
    base_url: String,
    endpoint: String,
}

impl HttpTelemetrySink {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = server_url.trim_end_matches('/').to_string();
        let endpoint = format!("{}/api/update_session", base_url);
        info!("HTTP telemetry endpoint: {}", endpoint);
        Ok(Self {
            client,
            base_url,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `POST /api/sessions`: open a session and make it the server's current one
    pub async fn start_session(&self) -> Result<RemoteSession, SyncError> {
        let response = self
            .client
            .post(format!("{}/api/sessions", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Rejected(status.as_u16()));
        }

        let session: RemoteSession = response.json().await?;
        info!("Server session {} started", session.id);
        Ok(session)
    }

    /// `GET /generate_report`: end the current session and fetch its report
    pub async fn generate_report(&self) -> Result<ReportSummary, SyncError> {
        let response = self
            .client
            .get(format!("{}/generate_report", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Rejected(status.as_u16()));
        }

        let report: ReportSummary = response.json().await?;
        info!(
            "Server report for session {}: {:.2} min, {} blinks",
            report.session_id, report.duration_minutes, report.total_blinks
        );
        Ok(report)
    }
}

impl TelemetrySink for HttpTelemetrySink {
    async fn publish(&self, snapshot: SessionSnapshot) -> Result<(), SyncError> {
        let response = self.client.post(&self.endpoint).json(&snapshot).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Rejected(status.as_u16()));
        }
        debug!("Snapshot accepted (blinks={})", snapshot.blinks);
        Ok(())
    }

    async fn open_session(&self) -> Result<Option<i64>, SyncError> {
        self.start_session().await.map(|session| Some(session.id))
    }

    async fn close_session(&self) -> Result<Option<ReportSummary>, SyncError> {
        self.generate_report().await.map(Some)
    }
}

/// Stored blink calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub threshold: f64,
    pub is_calibrated: bool,
}

/// Ask the server for the user's calibrated EAR threshold
pub async fn fetch_calibration(server_url: &str, timeout: Duration) -> Result<Calibration, SyncError> {
    let url = format!("{}/api/calibration", server_url.trim_end_matches('/'));
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::Rejected(status.as_u16()));
    }

    let calibration: Calibration = response.json().await?;
    debug!("Calibration from server: {:?}", calibration);
    Ok(calibration)
}
