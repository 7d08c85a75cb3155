//! Monitor configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `WELLNESS__*` environment variables (`WELLNESS__EAR__THRESHOLD=0.22`).

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use cloud_sync::TelemetryConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use wellness::WellnessConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Synthetic,
    Images,
}

/// Frame source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Image directory for `images`
    pub path: Option<String>,
    pub looping: bool,
    /// Grey level of synthetic frames
    pub brightness: u8,
    /// Stop the synthetic camera after this many frames
    pub frame_limit: Option<u32>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Synthetic,
            path: None,
            looping: false,
            brightness: 128,
            frame_limit: None,
        }
    }
}

/// Landmark provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    /// JSON-lines landmark recording; without one a neutral synthetic face is used
    pub replay_path: Option<String>,
    pub looping: bool,
}

/// Blink threshold override
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EarConfig {
    /// Explicit threshold; wins over calibration
    pub threshold: Option<f64>,
    /// Ask the server for the calibrated threshold when none is set
    pub use_calibration: bool,
}

impl Default for EarConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            use_calibration: true,
        }
    }
}

/// Notification backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    #[default]
    Log,
    /// `notify-send` desktop notifications
    Desktop,
}

/// Notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub backend: NotifierKind,
    pub gate: AlertConfig,
}

/// Emotion model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// ONNX expression model; without one the label stays "Neutral"
    pub model_path: Option<String>,
    pub interval_ms: u64,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            interval_ms: emotion::POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Full monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub camera: CameraConfig,
    pub source: SourceConfig,
    pub landmarks: LandmarkConfig,
    pub ear: EarConfig,
    pub ergonomics: WellnessConfig,
    pub notifications: NotificationConfig,
    pub emotion: EmotionConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
    /// Prometheus listener, e.g. `127.0.0.1:9000`
    pub metrics_addr: Option<String>,
}

impl MonitorConfig {
    /// Defaults, then `path` if given, then the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let defaults =
            Config::try_from(&MonitorConfig::default()).map_err(|e| ConfigError::Load(e.to_string()))?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        let config: MonitorConfig = builder
            .add_source(Environment::with_prefix("WELLNESS").separator("__").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.kind == SourceKind::Images && self.source.path.is_none() {
            return Err(ConfigError::Invalid("source.path is required for images".into()));
        }
        if let Some(threshold) = self.ear.threshold {
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(ConfigError::Invalid(format!("ear.threshold {}", threshold)));
            }
        }
        if self.camera.fps == 0 {
            return Err(ConfigError::Invalid("camera.fps must be positive".into()));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.logging
            .level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {:?}", self.logging.level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::CooldownPolicy;
    use cloud_sync::Transport;

    fn write_config(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ergonomics.ear_threshold, 0.26);
        assert_eq!(config.notifications.gate.cooldown_seconds, 15);
        assert_eq!(config.emotion.interval_ms, 500);
        assert_eq!(config.telemetry.interval_secs, 4);
        assert!(config.ear.threshold.is_none());
    }

    #[test]
    fn test_file_layer() {
        let path = write_config(
            "wellness-monitor",
            r#"
metrics_addr = "127.0.0.1:9100"

[ear]
threshold = 0.22

[notifications.gate]
policy = "per_kind"

[telemetry]
transport = "disabled"

[source]
frame_limit = 30
"#,
        );

        let config = MonitorConfig::load(path.to_str()).unwrap();
        assert_eq!(config.ear.threshold, Some(0.22));
        assert_eq!(config.notifications.gate.policy, CooldownPolicy::PerKind);
        assert_eq!(config.notifications.gate.cooldown_seconds, 15);
        assert_eq!(config.telemetry.transport, Transport::Disabled);
        assert_eq!(config.source.frame_limit, Some(30));
        assert_eq!(config.metrics_addr.as_deref(), Some("127.0.0.1:9100"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_images_need_a_path() {
        let mut config = MonitorConfig::default();
        config.source.kind = SourceKind::Images;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_threshold() {
        let mut config = MonitorConfig::default();
        config.ear.threshold = Some(-0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MonitorConfig::load(Some("/no/such/wellness-monitor.toml")),
            Err(ConfigError::Load(_))
        ));
    }
}
