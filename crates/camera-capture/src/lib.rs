//! Camera Capture Library for the Wellness Monitor
//!
//! Provides the frame types and frame sources that feed the landmark and
//! emotion models. Supports:
//! - Synthetic camera (constant fill, adjustable brightness) for demos and tests
//! - Image sequence replay from a directory of stills

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageSequenceSource, SyntheticCamera};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Invalid frame geometry: {width}x{height} with {len} bytes")]
    Geometry { width: u32, height: u32, len: usize },

    #[error("Source exhausted")]
    Exhausted,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl CameraConfig {
    /// Time between two frames at the configured rate
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.fps.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        let config = CameraConfig::default();
        assert_eq!(config.frame_interval(), Duration::from_micros(33_333));

        let zero = CameraConfig { fps: 0, ..Default::default() };
        assert_eq!(zero.frame_interval(), Duration::from_secs(1));
    }
}
