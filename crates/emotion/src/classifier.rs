//! Emotion classifier driver

use crate::{format_label, EmotionProvider, EmotionSeverity};
use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Poll period of the expression model
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

const DEFAULT_LABEL: &str = "Neutral";

/// Current emotion reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    /// Display label, e.g. "Happy"
    pub label: String,
    /// Winning score
    pub score: f32,
    /// Display severity
    pub severity: EmotionSeverity,
}

/// Drives an expression provider and keeps the latest label
pub struct EmotionClassifier<P: EmotionProvider> {
    provider: P,
    current: Option<EmotionReading>,
    period: Duration,
}

impl<P: EmotionProvider> EmotionClassifier<P> {
    pub fn new(provider: P) -> Self {
        Self::with_period(provider, POLL_INTERVAL)
    }

    pub fn with_period(provider: P, period: Duration) -> Self {
        Self {
            provider,
            current: None,
            period,
        }
    }

    /// Timer for the poll loop; a slow model delays the next tick
    pub fn interval(&self) -> Interval {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// One poll. Skipped unless the source is playing; no detection or a
    /// failed call leaves the previous label in place.
    pub fn tick(&mut self, frame: Option<&VideoFrame>, source_active: bool) -> Option<EmotionReading> {
        if !source_active {
            return None;
        }
        let frame = frame?;

        let detections = match self.provider.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Emotion detection failed: {}", e);
                return None;
            }
        };

        let first = detections.first()?;
        let (name, score) = first.expressions.dominant()?;
        let label = format_label(name);
        let reading = EmotionReading {
            severity: EmotionSeverity::of(&label),
            label,
            score,
        };

        debug!("Emotion: {} ({:.2})", reading.label, reading.score);
        self.current = Some(reading.clone());
        Some(reading)
    }

    /// Current label ("Neutral" before the first detection)
    pub fn label(&self) -> &str {
        self.current
            .as_ref()
            .map(|r| r.label.as_str())
            .unwrap_or(DEFAULT_LABEL)
    }

    pub fn current(&self) -> Option<&EmotionReading> {
        self.current.as_ref()
    }
}
