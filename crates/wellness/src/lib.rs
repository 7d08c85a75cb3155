//! Screen Wellness Analysis
//!
//! Per-frame user state analysis on face-mesh landmarks:
//! - Eye aspect ratio and blink counting
//! - Posture (nose-tip height) and distance (face width) checks
//! - Ambient light check on a sampled pixel
//! - Session counters and the telemetry snapshot

pub mod analysis;
pub mod blink;
pub mod breathing;
pub mod config;
pub mod ear;
pub mod ergonomics;
pub mod input;
pub mod state;

pub use analysis::{FrameAnalysis, WellnessAlert};
pub use blink::{BlinkDetector, BlinkState, BlinkTransition};
pub use config::{LightSamplingConfig, WellnessConfig, DEFAULT_EAR_THRESHOLD};
pub use ear::{compute_ear, eye_aspect_ratio, EarAccumulator, FrameEar};
pub use ergonomics::{AlertFlags, ThresholdEngine};
pub use state::{SessionSnapshot, SessionState};

use camera_capture::VideoFrame;
use face_mesh::LandmarkSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Wellness error types
#[derive(Error, Debug)]
pub enum WellnessError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Wellness analysis module
pub struct WellnessEngine {
    blink: BlinkDetector,
    thresholds: ThresholdEngine,
    session: SessionState,
}

impl WellnessEngine {
    /// Create a new engine with configuration
    pub fn new(config: WellnessConfig) -> Result<Self, WellnessError> {
        config.validate()?;
        info!(
            "Creating wellness engine (ear_threshold={}, hold={})",
            config.ear_threshold, config.hold_evaluations
        );
        Ok(Self {
            blink: BlinkDetector::new(config.ear_threshold),
            thresholds: ThresholdEngine::new(&config),
            session: SessionState::new(),
        })
    }

    /// Analyze one frame and the landmarks found in it
    pub fn process_frame(
        &mut self,
        frame: &VideoFrame,
        face: Option<&LandmarkSet>,
        now: Instant,
    ) -> FrameAnalysis {
        let mut raised = Vec::new();

        // Light runs with or without a face
        let brightness = self.thresholds.evaluate_light(frame, now);
        if brightness.is_some() && self.thresholds.flags().light {
            raised.push(WellnessAlert::Light);
        }

        let Some(landmarks) = face else {
            return FrameAnalysis {
                face_detected: false,
                brightness,
                blink_state: self.blink.state(),
                flags: self.thresholds.flags(),
                raised,
                ..Default::default()
            };
        };

        let measurements = self.thresholds.evaluate_face(landmarks);
        let flags = self.thresholds.flags();
        if flags.posture {
            raised.push(WellnessAlert::Posture);
        }
        if flags.distance {
            raised.push(WellnessAlert::Distance);
        }

        let ear = FrameEar::from_landmarks(landmarks);
        let blink = match ear {
            Some(reading) => {
                self.session.record_ear(reading.mean);
                let transition = self.blink.update(reading.mean);
                if transition == BlinkTransition::Blink {
                    self.session.record_blink();
                    debug!("Blink count now {}", self.session.blink_count);
                }
                transition
            }
            None => {
                debug!("Degenerate eye landmarks on frame {}", frame.sequence);
                BlinkTransition::None
            }
        };

        FrameAnalysis {
            face_detected: true,
            ear,
            measurements: Some(measurements),
            brightness,
            blink_state: self.blink.state(),
            blink,
            flags,
            raised,
        }
    }

    /// Apply a calibrated EAR threshold
    pub fn set_ear_threshold(&mut self, threshold: f64) {
        info!("EAR threshold set to {}", threshold);
        self.blink.set_threshold(threshold);
    }

    pub fn ear_threshold(&self) -> f64 {
        self.blink.threshold()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    /// Current telemetry payload
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }
}
