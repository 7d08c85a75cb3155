//! Guided breathing cycle

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Length of one breathing cycle
pub const CYCLE: Duration = Duration::from_secs(10);

const HOLD_AT: Duration = Duration::from_secs(4);
const EXHALE_AT: Duration = Duration::from_secs(6);

/// Breathing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreathPhase {
    Inhale,
    Hold,
    Exhale,
}

impl BreathPhase {
    /// Prompt text
    pub fn prompt(&self) -> &'static str {
        match self {
            BreathPhase::Inhale => "Inhale... (Expand)",
            BreathPhase::Hold => "Hold...",
            BreathPhase::Exhale => "Exhale... (Relax)",
        }
    }
}

/// Phase after `elapsed` time in the routine: 4s in, 2s hold, 4s out
pub fn phase_at(elapsed: Duration) -> BreathPhase {
    let offset = Duration::from_nanos((elapsed.as_nanos() % CYCLE.as_nanos()) as u64);
    if offset < HOLD_AT {
        BreathPhase::Inhale
    } else if offset < EXHALE_AT {
        BreathPhase::Hold
    } else {
        BreathPhase::Exhale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(phase_at(Duration::ZERO), BreathPhase::Inhale);
        assert_eq!(phase_at(Duration::from_millis(3999)), BreathPhase::Inhale);
        assert_eq!(phase_at(Duration::from_secs(4)), BreathPhase::Hold);
        assert_eq!(phase_at(Duration::from_secs(6)), BreathPhase::Exhale);
        assert_eq!(phase_at(Duration::from_millis(9999)), BreathPhase::Exhale);
    }

    #[test]
    fn test_phase_repeats() {
        assert_eq!(phase_at(Duration::from_secs(10)), BreathPhase::Inhale);
        assert_eq!(phase_at(Duration::from_secs(25)), BreathPhase::Hold);
        assert_eq!(BreathPhase::Hold.prompt(), "Hold...");
    }
}
