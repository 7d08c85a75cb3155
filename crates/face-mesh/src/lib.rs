//! Face Mesh Landmarks
//!
//! Types for the dense facial landmark sets produced by an external
//! face-mesh model, plus the provider seam the monitor consumes:
//! - Normalized landmark points and the fixed model index space
//! - `LandmarkProvider` trait (one optional face per frame)
//! - Replay of recorded landmark streams (JSON lines)
//! - Synthetic faces with controllable eye openness, posture and distance

pub mod landmarks;
pub mod provider;
pub mod synthetic;

pub use landmarks::{
    EyeIndices, Landmark, LandmarkSet, LEFT_CHEEK, LEFT_EYE, MESH_POINT_COUNT, NOSE_TIP,
    RIGHT_CHEEK, RIGHT_EYE,
};
pub use provider::{FixedLandmarkProvider, LandmarkProvider, ReplayLandmarkProvider};
pub use synthetic::SyntheticFace;

use thiserror::Error;

/// Face mesh error types
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Landmark set too small: expected at least {expected} points, got {actual}")]
    TooFewPoints { expected: usize, actual: usize },

    #[error("Invalid landmark on line {line}: {reason}")]
    InvalidLandmark { line: usize, reason: String },

    #[error("Failed to read landmark stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("Landmark model failed: {0}")]
    Model(String),
}
