//! Stored record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Threshold used until the user calibrates
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.26;

/// One monitoring session and its summary counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSession {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_blinks: i64,
    pub keyboard_activity: i64,
    pub mouse_activity: i64,
    pub avg_ear: f64,
    /// Serialized report, stored when the session ends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

impl MonitoringSession {
    pub fn new(id: i64, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            total_blinks: 0,
            keyboard_activity: 0,
            mouse_activity: 0,
            avg_ear: 0.0,
            report: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}

/// One telemetry snapshot logged against a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDataPoint {
    pub session_id: i64,
    pub timestamp: DateTime<Utc>,
    pub blink_count_snapshot: i64,
    pub detected_emotion: String,
    pub ear_value: f64,
}

/// Values carried by one session update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub blinks: i64,
    pub keys: i64,
    pub mouse: i64,
    pub emotion: String,
    pub current_ear: f64,
    pub session_avg_ear: f64,
}

/// Per-user blink calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub threshold: f64,
    pub is_calibrated: bool,
}

impl Default for CalibrationRecord {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_EAR_THRESHOLD,
            is_calibrated: false,
        }
    }
}
