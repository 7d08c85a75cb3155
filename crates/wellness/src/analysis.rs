//! Frame analysis results and alerts

use crate::blink::{BlinkState, BlinkTransition};
use crate::ear::FrameEar;
use crate::ergonomics::{AlertFlags, FaceMeasurements};
use serde::{Deserialize, Serialize};

/// Wellness alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellnessAlert {
    /// Nose tip low in the frame (slouching)
    Posture,

    /// Face too wide in the frame (too close to the screen)
    Distance,

    /// Room too dark
    Light,
}

impl WellnessAlert {
    pub const ALL: [WellnessAlert; 3] = [
        WellnessAlert::Posture,
        WellnessAlert::Distance,
        WellnessAlert::Light,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WellnessAlert::Posture => "posture",
            WellnessAlert::Distance => "distance",
            WellnessAlert::Light => "light",
        }
    }

    /// Notification title
    pub fn title(&self) -> &'static str {
        match self {
            WellnessAlert::Posture => "Poor Posture Detected",
            WellnessAlert::Distance => "Too Close to Screen",
            WellnessAlert::Light => "Low Light Detected",
        }
    }

    /// Notification body
    pub fn message(&self) -> &'static str {
        match self {
            WellnessAlert::Posture => "You are slouching! Please sit up straight.",
            WellnessAlert::Distance => "Please lean back to protect your eyes.",
            WellnessAlert::Light => "Please turn on a light to reduce eye strain.",
        }
    }
}

/// Complete result of processing one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Whether the landmark provider returned a face
    pub face_detected: bool,

    /// EAR of this frame (face present and eyes not degenerate)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<FrameEar>,

    /// Posture/distance inputs (face present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<FaceMeasurements>,

    /// Sampled brightness, if the light check ran on this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,

    /// Blink state after this frame
    pub blink_state: BlinkState,

    /// Blink state change caused by this frame
    pub blink: BlinkTransition,

    /// Overlay flags after this frame
    pub flags: AlertFlags,

    /// Alerts evaluated and raised on this frame (notification candidates)
    pub raised: Vec<WellnessAlert>,
}

impl FrameAnalysis {
    /// Check if any alert was raised on this frame
    pub fn has_alerts(&self) -> bool {
        !self.raised.is_empty()
    }

    pub fn blinked(&self) -> bool {
        self.blink == BlinkTransition::Blink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_names() {
        let names: Vec<&str> = WellnessAlert::ALL.iter().map(|a| a.as_str()).collect();
        assert_eq!(names, ["posture", "distance", "light"]);
        assert_eq!(serde_json::to_string(&WellnessAlert::Light).unwrap(), "\"light\"");
    }

    #[test]
    fn test_default_analysis() {
        let analysis = FrameAnalysis::default();
        assert!(!analysis.has_alerts());
        assert!(!analysis.blinked());
        assert_eq!(analysis.blink_state, BlinkState::Open);
    }
}
