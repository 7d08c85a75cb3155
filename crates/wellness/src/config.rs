//! Wellness configuration

use crate::WellnessError;
use serde::{Deserialize, Serialize};

/// Default EAR below which the eyes count as closed
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.26;

/// Light sampling schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSamplingConfig {
    /// Sample at most once every N frames
    pub every_n_frames: u32,
    /// And at least this many milliseconds apart
    pub min_interval_ms: u64,
}

impl Default for LightSamplingConfig {
    fn default() -> Self {
        Self {
            every_n_frames: 20, // ~5% of frames
            min_interval_ms: 0,
        }
    }
}

/// Wellness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WellnessConfig {
    /// EAR below this value is a closed eye
    pub ear_threshold: f64,

    /// Nose-tip vertical position above which the user is slouching
    pub posture_threshold_y: f64,

    /// Cheek-to-cheek span above which the user is too close
    pub distance_threshold: f64,

    /// Sampled brightness (0-255) below which the room is too dark
    pub light_threshold: f64,

    /// Light check schedule
    pub light_sampling: LightSamplingConfig,

    /// Consecutive contrary evaluations before an alert flag flips (0 = none)
    pub hold_evaluations: u32,
}

impl Default for WellnessConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            posture_threshold_y: 0.7,
            distance_threshold: 0.4,
            light_threshold: 40.0,
            light_sampling: LightSamplingConfig::default(),
            hold_evaluations: 0,
        }
    }
}

impl WellnessConfig {
    /// Create strict config (alerts trip earlier)
    pub fn strict() -> Self {
        Self {
            posture_threshold_y: 0.65,
            distance_threshold: 0.35,
            light_threshold: 60.0,
            ..Default::default()
        }
    }

    /// Create lenient config (alerts trip later, with a short hold)
    pub fn lenient() -> Self {
        Self {
            posture_threshold_y: 0.75,
            distance_threshold: 0.45,
            light_threshold: 25.0,
            hold_evaluations: 3,
            ..Default::default()
        }
    }

    /// Reject thresholds that can never behave sensibly
    pub fn validate(&self) -> Result<(), WellnessError> {
        if !(self.ear_threshold.is_finite() && self.ear_threshold > 0.0) {
            return Err(WellnessError::Config(format!(
                "ear_threshold must be positive, got {}",
                self.ear_threshold
            )));
        }
        for (name, value) in [
            ("posture_threshold_y", self.posture_threshold_y),
            ("distance_threshold", self.distance_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(WellnessError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=255.0).contains(&self.light_threshold) {
            return Err(WellnessError::Config(format!(
                "light_threshold must be within [0, 255], got {}",
                self.light_threshold
            )));
        }
        if self.light_sampling.every_n_frames == 0 {
            return Err(WellnessError::Config(
                "light_sampling.every_n_frames must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
