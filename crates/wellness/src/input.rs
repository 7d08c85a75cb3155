//! Keyboard and pointer activity counters

use serde::{Deserialize, Serialize};

/// Interaction counters for the session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputTracker {
    key_presses: u64,
    pointer_distance: f64,
    #[serde(skip)]
    last_pointer: Option<(f64, f64)>,
}

impl InputTracker {
    pub fn record_key_press(&mut self) {
        self.key_presses += 1;
    }

    /// Accumulate travel from the previous pointer position.
    ///
    /// The first position only sets the origin. Non-finite coordinates are
    /// ignored and leave the origin where it was.
    pub fn record_pointer(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        if let Some((last_x, last_y)) = self.last_pointer {
            let step = (x - last_x).hypot(y - last_y);
            if step.is_finite() {
                self.pointer_distance += step;
            }
        }
        self.last_pointer = Some((x, y));
    }

    pub fn key_presses(&self) -> u64 {
        self.key_presses
    }

    /// Cumulative pointer travel in pixels
    pub fn pointer_distance(&self) -> f64 {
        self.pointer_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_travel() {
        let mut input = InputTracker::default();
        input.record_pointer(100.0, 100.0);
        assert_eq!(input.pointer_distance(), 0.0);
        input.record_pointer(103.0, 104.0);
        input.record_pointer(103.0, 110.0);
        assert!((input.pointer_distance() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_pointer_ignored() {
        let mut input = InputTracker::default();
        input.record_pointer(0.0, 0.0);
        input.record_pointer(f64::NAN, 0.0);
        input.record_pointer(0.0, f64::INFINITY);
        input.record_pointer(f64::NEG_INFINITY, f64::NAN);
        assert_eq!(input.pointer_distance(), 0.0);

        input.record_pointer(3.0, 4.0);
        assert!((input.pointer_distance() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_key_presses() {
        let mut input = InputTracker::default();
        for _ in 0..3 {
            input.record_key_press();
        }
        assert_eq!(input.key_presses(), 3);
    }
}
