//! Blink state machine
//!
//! Two states, Open (initial) and Closed. A single sample below the threshold
//! closes the eye; the first sample at or above it reopens the eye and
//! completes one blink. Repeated samples on the same side change nothing.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Eye state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlinkState {
    #[default]
    Open,
    Closed,
}

/// Result of feeding one EAR sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlinkTransition {
    /// No state change
    #[default]
    None,
    /// Open -> Closed
    Closed,
    /// Closed -> Open, one completed blink
    Blink,
}

/// Threshold blink detector
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    threshold: f64,
    state: BlinkState,
}

impl BlinkDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: BlinkState::Open,
        }
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    /// Feed one frame-level EAR sample
    pub fn update(&mut self, ear: f64) -> BlinkTransition {
        match (self.state, ear < self.threshold) {
            (BlinkState::Open, true) => {
                self.state = BlinkState::Closed;
                BlinkTransition::Closed
            }
            (BlinkState::Closed, false) => {
                self.state = BlinkState::Open;
                debug!("Blink completed (ear={:.3})", ear);
                BlinkTransition::Blink
            }
            _ => BlinkTransition::None,
        }
    }
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EAR_THRESHOLD)
    }
}
