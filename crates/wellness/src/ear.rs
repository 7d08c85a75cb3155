//! Eye aspect ratio (EAR)
//!
//! EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|), computed per eye on normalized
//! image-plane coordinates. The frame-level EAR is the mean of both eyes.

use face_mesh::{EyeIndices, Landmark, LandmarkSet, LEFT_EYE, RIGHT_EYE};
use serde::{Deserialize, Serialize};

/// Horizontal spans shorter than this are treated as degenerate
pub const MIN_EYE_WIDTH: f64 = 1e-6;

/// EAR of six contour points; `None` when the eye corners coincide
pub fn eye_aspect_ratio(points: &[Landmark; 6]) -> Option<f64> {
    let [p1, p2, p3, p4, p5, p6] = points;
    let horizontal = p1.distance(p4);
    if horizontal < MIN_EYE_WIDTH {
        return None;
    }
    Some((p2.distance(p6) + p3.distance(p5)) / (2.0 * horizontal))
}

/// EAR of one eye of a landmark set
pub fn compute_ear(landmarks: &LandmarkSet, eye: EyeIndices) -> Option<f64> {
    eye_aspect_ratio(&landmarks.eye(eye))
}

/// Per-frame EAR reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameEar {
    pub left: f64,
    pub right: f64,
    /// Arithmetic mean of both eyes
    pub mean: f64,
}

impl FrameEar {
    /// Both eyes of a face; `None` if either eye is degenerate
    pub fn from_landmarks(landmarks: &LandmarkSet) -> Option<Self> {
        let left = compute_ear(landmarks, LEFT_EYE)?;
        let right = compute_ear(landmarks, RIGHT_EYE)?;
        Some(Self {
            left,
            right,
            mean: (left + right) / 2.0,
        })
    }
}

/// Running EAR sum over the whole session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EarAccumulator {
    sum: f64,
    count: u64,
}

impl EarAccumulator {
    pub fn push(&mut self, ear: f64) {
        self.sum += ear;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of all samples, 0 when there are none
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }
}
