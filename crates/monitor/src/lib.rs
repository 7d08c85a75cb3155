//! Screen Wellness Monitor
//!
//! Single-threaded runtime that pulls camera frames through the face-mesh
//! model into the wellness engine, gates alert notifications, polls the
//! emotion model on its own timer and pushes session snapshots upstream.

pub mod backends;
pub mod config;
pub mod input;
pub mod runtime;

pub use backends::{AnyNotifier, EmotionModel, Landmarks, Source};
pub use crate::config::{ConfigError, MonitorConfig};
pub use input::{spawn_stdin_reader, InputEvent};
pub use runtime::{FrameStep, Monitor, RunSummary, Schedule};

use alerting::{CommandNotifier, LogNotifier, NotificationGate};
use camera_capture::{CameraError, ImageSequenceSource, SyntheticCamera};
use cloud_sync::{fetch_calibration, SyncError, TelemetryClient, Transport};
use crate::config::{NotifierKind, SourceKind};
use emotion::{EmotionClassifier, EmotionError, OnnxEmotionProvider};
use face_mesh::{FixedLandmarkProvider, MeshError, ReplayLandmarkProvider, SyntheticFace};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;
use wellness::{WellnessConfig, WellnessEngine, WellnessError};

/// Monitor assembled from configuration
pub type ConfiguredMonitor = Monitor<Source, Landmarks, EmotionModel, AnyNotifier, TelemetryClient>;

/// Startup errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Camera: {0}")]
    Camera(#[from] CameraError),
    #[error("Landmarks: {0}")]
    Mesh(#[from] MeshError),
    #[error("Wellness: {0}")]
    Wellness(#[from] WellnessError),
    #[error("Emotion model: {0}")]
    Emotion(#[from] EmotionError),
    #[error("Telemetry: {0}")]
    Sync(#[from] SyncError),
    #[error("Logging: {0}")]
    Logging(String),
    #[error("Metrics: {0}")]
    Metrics(String),
}

/// Initialize logging
pub fn init_logging(config: &MonitorConfig) -> Result<(), MonitorError> {
    let level = config.log_level()?;
    let result = if config.logging.json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    result.map_err(|e| MonitorError::Logging(e.to_string()))
}

/// Serve Prometheus metrics on `addr`
pub fn install_metrics(addr: &str) -> Result<(), MonitorError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| MonitorError::Metrics(format!("{}: {}", addr, e)))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MonitorError::Metrics(e.to_string()))?;
    info!("Prometheus metrics on {}/metrics", addr);
    Ok(())
}

/// Blink threshold: explicit value, then server calibration, then the
/// configured default
pub async fn resolve_ear_threshold(config: &MonitorConfig) -> f64 {
    if let Some(threshold) = config.ear.threshold {
        info!("Using configured EAR threshold {}", threshold);
        return threshold;
    }

    let fallback = config.ergonomics.ear_threshold;
    if !config.ear.use_calibration || config.telemetry.transport == Transport::Disabled {
        return fallback;
    }

    match fetch_calibration(&config.telemetry.server_url, config.telemetry.timeout()).await {
        Ok(calibration) if calibration.threshold.is_finite() && calibration.threshold > 0.0 => {
            info!(
                "Using server EAR threshold {} (calibrated: {})",
                calibration.threshold, calibration.is_calibrated
            );
            calibration.threshold
        }
        Ok(calibration) => {
            warn!("Ignoring server EAR threshold {}", calibration.threshold);
            fallback
        }
        Err(e) => {
            warn!("Calibration lookup failed ({}), using {}", e, fallback);
            fallback
        }
    }
}

/// Assemble every collaborator; any failure here is fatal
pub async fn build_monitor(config: &MonitorConfig) -> Result<ConfiguredMonitor, MonitorError> {
    config.validate()?;

    let source = match config.source.kind {
        SourceKind::Synthetic => {
            let mut camera = SyntheticCamera::new(config.camera.clone());
            camera.set_brightness(config.source.brightness);
            if let Some(limit) = config.source.frame_limit {
                camera = camera.with_frame_limit(limit);
            }
            Source::Synthetic(camera)
        }
        SourceKind::Images => {
            let path = config
                .source
                .path
                .as_deref()
                .ok_or_else(|| ConfigError::Invalid("source.path is required for images".into()))?;
            Source::Images(ImageSequenceSource::open(path, &config.camera, config.source.looping)?)
        }
    };

    let landmarks = match &config.landmarks.replay_path {
        Some(path) => Landmarks::Replay(ReplayLandmarkProvider::open(path, config.landmarks.looping)?),
        None => Landmarks::Fixed(FixedLandmarkProvider::new(Some(SyntheticFace::default().build()))),
    };

    let model = match &config.emotion.model_path {
        Some(path) => EmotionModel::Onnx(Box::new(OnnxEmotionProvider::load(path)?)),
        None => {
            info!("No emotion model configured");
            EmotionModel::Disabled
        }
    };
    let classifier =
        EmotionClassifier::with_period(model, Duration::from_millis(config.emotion.interval_ms.max(1)));

    let ear_threshold = resolve_ear_threshold(config).await;
    let engine = WellnessEngine::new(WellnessConfig {
        ear_threshold,
        ..config.ergonomics.clone()
    })?;

    let notifier = match config.notifications.backend {
        NotifierKind::Log => AnyNotifier::Log(LogNotifier),
        NotifierKind::Desktop => AnyNotifier::Desktop(CommandNotifier::default()),
    };
    let mut gate = NotificationGate::new(config.notifications.gate.clone(), notifier);
    gate.request_permission();

    let sink = TelemetryClient::from_config(&config.telemetry).await?;

    Ok(Monitor::new(
        source,
        landmarks,
        engine,
        gate,
        classifier,
        sink,
        Schedule {
            frame: config.camera.frame_interval(),
            telemetry: config.telemetry.interval(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::Permission;

    fn offline_config() -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.telemetry.transport = Transport::Disabled;
        config.source.frame_limit = Some(5);
        config
    }

    #[tokio::test]
    async fn test_build_default() {
        let monitor = build_monitor(&offline_config()).await.unwrap();
        assert_eq!(monitor.engine().ear_threshold(), 0.26);
        assert_eq!(monitor.gate().permission(), Permission::Granted);
        assert_eq!(monitor.emotion_label(), "Neutral");
    }

    #[tokio::test]
    async fn test_explicit_threshold_wins() {
        let mut config = offline_config();
        config.ear.threshold = Some(0.2);
        let monitor = build_monitor(&config).await.unwrap();
        assert_eq!(monitor.engine().ear_threshold(), 0.2);
    }

    #[tokio::test]
    async fn test_unreachable_calibration_falls_back() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = MonitorConfig::default();
        config.telemetry.server_url = format!("http://{}", addr);
        config.telemetry.timeout_ms = 300;
        config.ergonomics.ear_threshold = 0.24;
        assert_eq!(resolve_ear_threshold(&config).await, 0.24);
    }

    #[tokio::test]
    async fn test_missing_model_is_fatal() {
        let mut config = offline_config();
        config.emotion.model_path = Some("/no/such/model.onnx".into());
        assert!(matches!(
            build_monitor(&config).await,
            Err(MonitorError::Emotion(EmotionError::ModelLoad(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_replay_is_fatal() {
        let mut config = offline_config();
        config.landmarks.replay_path = Some("/no/such/landmarks.jsonl".into());
        assert!(matches!(build_monitor(&config).await, Err(MonitorError::Mesh(_))));
    }

    fn write_replay(name: &str, ears: &[f64]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("monitor-{}-{}.jsonl", name, std::process::id()));
        let mut body = String::new();
        for ear in ears {
            let points: Vec<[f64; 2]> = SyntheticFace::default()
                .with_ear(*ear)
                .build()
                .points()
                .iter()
                .map(|p| [p.x, p.y])
                .collect();
            body.push_str(&format!("{:?}\n", points));
        }
        body.push_str("null\n");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_replay_run() {
        let path = write_replay("replay", &[0.3, 0.2, 0.3, 0.2, 0.3]);

        let mut config = offline_config();
        config.source.frame_limit = Some(6);
        config.landmarks.replay_path = Some(path.to_string_lossy().into_owned());
        let monitor = build_monitor(&config).await.unwrap();

        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        let summary = monitor.run(rx, std::future::pending()).await;
        assert_eq!(summary.frames, 6);
        assert_eq!(summary.snapshot.blinks, 2);
        assert!(summary.report.is_none());

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_run_against_server_produces_report() {
        let state = api::AppState::new(storage::Repository::new()).shared();
        state.read().await.repository.save_calibration(0.21).await.unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = api::create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let path = write_replay("server", &[0.3, 0.2, 0.3, 0.2, 0.3]);
        let mut config = MonitorConfig::default();
        config.telemetry.server_url = format!("http://{}", addr);
        config.source.frame_limit = Some(6);
        config.landmarks.replay_path = Some(path.to_string_lossy().into_owned());

        let monitor = build_monitor(&config).await.unwrap();
        assert_eq!(monitor.engine().ear_threshold(), 0.21);

        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        let summary = monitor.run(rx, std::future::pending()).await;
        assert_eq!(summary.snapshot.blinks, 2);

        let report = summary.report.expect("server should return a report");
        assert_eq!(report.total_blinks, 2);

        let state = state.read().await;
        assert!(state.current_session.is_none());
        let sessions = state.repository.recent_sessions(10).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, report.session_id);
        assert_eq!(sessions[0].total_blinks, 2);
        assert!(sessions[0].end_time.is_some());
        assert!(!state.repository.data_points(report.session_id).await.unwrap().is_empty());
        assert!(state
            .repository
            .stored_report(report.session_id)
            .await
            .unwrap()
            .is_some());

        std::fs::remove_file(&path).ok();
    }
}
