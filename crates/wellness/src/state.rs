//! Session state tracking
//!
//! All counters of one monitoring session. Created at session start, read by
//! the telemetry sink, never reset implicitly.

use crate::ear::EarAccumulator;
use crate::input::InputTracker;
use serde::{Deserialize, Serialize};

/// Label shown before the first emotion reading
pub const DEFAULT_EMOTION: &str = "Neutral";

/// Telemetry payload pushed to the session endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub blinks: u64,
    pub emotion: String,
    pub keys: u64,
    /// Rounded cumulative pointer travel
    pub mouse: u64,
    pub current_ear: f64,
    pub session_avg_ear: f64,
}

/// Mutable session counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Completed blinks
    pub blink_count: u64,

    /// Most recent frame-level EAR (0 before the first face)
    pub current_ear: f64,

    /// Running EAR sum for the session average
    pub ear: EarAccumulator,

    /// Current emotion label
    pub emotion: String,

    /// Keyboard and pointer activity
    pub input: InputTracker,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            blink_count: 0,
            current_ear: 0.0,
            ear: EarAccumulator::default(),
            emotion: DEFAULT_EMOTION.to_string(),
            input: InputTracker::default(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the frame-level EAR of a detected face
    pub fn record_ear(&mut self, ear: f64) {
        self.current_ear = ear;
        self.ear.push(ear);
    }

    pub fn record_blink(&mut self) {
        self.blink_count += 1;
    }

    pub fn set_emotion(&mut self, label: impl Into<String>) {
        self.emotion = label.into();
    }

    /// Session-average EAR (0 before any sample)
    pub fn session_avg_ear(&self) -> f64 {
        self.ear.average()
    }

    /// Aggregate the counters into a telemetry payload
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            blinks: self.blink_count,
            emotion: self.emotion.clone(),
            keys: self.input.key_presses(),
            mouse: self.input.pointer_distance().round() as u64,
            current_ear: self.current_ear,
            session_avg_ear: self.session_avg_ear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let state = SessionState::new();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.blinks, 0);
        assert_eq!(snapshot.emotion, "Neutral");
        assert_eq!(snapshot.session_avg_ear, 0.0);
        assert_eq!(snapshot.current_ear, 0.0);
    }

    #[test]
    fn test_snapshot_aggregates() {
        let mut state = SessionState::new();
        for ear in [0.30, 0.20, 0.25] {
            state.record_ear(ear);
        }
        state.record_blink();
        state.set_emotion("Happy");
        state.input.record_key_press();
        state.input.record_pointer(0.0, 10.0);
        state.input.record_pointer(0.0, 12.6);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.blinks, 1);
        assert_eq!(snapshot.emotion, "Happy");
        assert_eq!(snapshot.keys, 1);
        assert_eq!(snapshot.mouse, 3);
        assert_eq!(snapshot.current_ear, 0.25);
        assert!((snapshot.session_avg_ear - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = SessionSnapshot {
            blinks: 4,
            emotion: "Sad".into(),
            keys: 12,
            mouse: 300,
            current_ear: 0.28,
            session_avg_ear: 0.27,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "blinks": 4,
                "emotion": "Sad",
                "keys": 12,
                "mouse": 300,
                "current_ear": 0.28,
                "session_avg_ear": 0.27
            })
        );
    }
}
