//! Posture, distance and lighting checks
//!
//! Each check compares one scalar against a fixed threshold. Without a hold
//! the flag follows the raw comparison every evaluation.

use crate::config::{LightSamplingConfig, WellnessConfig};
use camera_capture::VideoFrame;
use face_mesh::LandmarkSet;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Slouching: nose tip strictly below the posture line
pub fn posture_alert(nose_y: f64, threshold: f64) -> bool {
    nose_y > threshold
}

/// Too close: cheek span strictly wider than the threshold
pub fn distance_alert(face_width: f64, threshold: f64) -> bool {
    face_width > threshold
}

/// Too dark: sampled brightness strictly below the threshold
pub fn light_alert(brightness: f64, threshold: f64) -> bool {
    brightness < threshold
}

/// Horizontal span between the cheek extremes
pub fn face_width(landmarks: &LandmarkSet) -> f64 {
    (landmarks.left_cheek().x - landmarks.right_cheek().x).abs()
}

/// Current alert flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFlags {
    pub posture: bool,
    pub distance: bool,
    pub light: bool,
}

impl AlertFlags {
    pub fn any(&self) -> bool {
        self.posture || self.distance || self.light
    }
}

/// Face-derived measurements of one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceMeasurements {
    pub nose_y: f64,
    pub face_width: f64,
}

/// Boolean flag that only flips after `hold` consecutive contrary readings
#[derive(Debug, Clone, Default)]
pub struct DebouncedFlag {
    active: bool,
    pending: u32,
    hold: u32,
}

impl DebouncedFlag {
    pub fn new(hold: u32) -> Self {
        Self {
            active: false,
            pending: 0,
            hold,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed a raw reading, returning the (possibly unchanged) flag
    pub fn update(&mut self, raw: bool) -> bool {
        if raw == self.active {
            self.pending = 0;
        } else {
            self.pending += 1;
            if self.pending >= self.hold.max(1) {
                self.active = raw;
                self.pending = 0;
            }
        }
        self.active
    }
}

/// Decides which frames get a light check
#[derive(Debug, Clone)]
pub struct LightSampler {
    every_n_frames: u32,
    min_interval: Duration,
    frames_since: Option<u32>,
    last_sample: Option<Instant>,
}

impl LightSampler {
    pub fn new(config: &LightSamplingConfig) -> Self {
        Self {
            every_n_frames: config.every_n_frames.max(1),
            min_interval: Duration::from_millis(config.min_interval_ms),
            frames_since: None,
            last_sample: None,
        }
    }

    /// Called once per frame; the first frame is always sampled
    pub fn should_sample(&mut self, now: Instant) -> bool {
        let due_by_frames = self
            .frames_since
            .map_or(true, |n| n + 1 >= self.every_n_frames);
        let due_by_time = self
            .last_sample
            .map_or(true, |last| now.saturating_duration_since(last) >= self.min_interval);

        if due_by_frames && due_by_time {
            self.frames_since = Some(0);
            self.last_sample = Some(now);
            true
        } else {
            self.frames_since = Some(self.frames_since.map_or(0, |n| n.saturating_add(1)));
            false
        }
    }
}

/// Threshold engine for the three ergonomic checks
#[derive(Debug, Clone)]
pub struct ThresholdEngine {
    posture_threshold_y: f64,
    distance_threshold: f64,
    light_threshold: f64,
    posture: DebouncedFlag,
    distance: DebouncedFlag,
    light: DebouncedFlag,
    sampler: LightSampler,
}

impl ThresholdEngine {
    pub fn new(config: &WellnessConfig) -> Self {
        Self {
            posture_threshold_y: config.posture_threshold_y,
            distance_threshold: config.distance_threshold,
            light_threshold: config.light_threshold,
            posture: DebouncedFlag::new(config.hold_evaluations),
            distance: DebouncedFlag::new(config.hold_evaluations),
            light: DebouncedFlag::new(config.hold_evaluations),
            sampler: LightSampler::new(&config.light_sampling),
        }
    }

    /// Posture and distance for a detected face
    pub fn evaluate_face(&mut self, landmarks: &LandmarkSet) -> FaceMeasurements {
        let measurements = FaceMeasurements {
            nose_y: landmarks.nose_tip().y,
            face_width: face_width(landmarks),
        };
        self.posture
            .update(posture_alert(measurements.nose_y, self.posture_threshold_y));
        self.distance
            .update(distance_alert(measurements.face_width, self.distance_threshold));
        measurements
    }

    /// Light check on a sampled frame; `None` when this frame is not sampled
    pub fn evaluate_light(&mut self, frame: &VideoFrame, now: Instant) -> Option<f64> {
        if !self.sampler.should_sample(now) {
            return None;
        }
        let brightness = frame.brightness_at(frame.width / 2, frame.height / 2)?;
        self.light.update(light_alert(brightness, self.light_threshold));
        Some(brightness)
    }

    pub fn flags(&self) -> AlertFlags {
        AlertFlags {
            posture: self.posture.is_active(),
            distance: self.distance.is_active(),
            light: self.light.is_active(),
        }
    }
}
