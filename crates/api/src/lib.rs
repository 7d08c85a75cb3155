//! Wellness Session API Server
//!
//! Receives telemetry snapshots from the monitor and serves session reports,
//! history and the blink calibration.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
pub mod rate_limit;
mod routes;

pub use crate::config::{LoggingConfig, ServerConfig};
pub use error::ApiError;
pub use routes::sessions::UpdateSessionRequest;

use storage::Repository;

/// State shared by all handlers
pub type SharedState = Arc<RwLock<AppState>>;

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    /// Session receiving snapshots, if any
    pub current_session: Option<i64>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus render handle (absent when no recorder is installed)
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            current_session: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_session: Option<i64>,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route(
            "/api/sessions",
            get(routes::sessions::list_sessions).post(routes::sessions::start_session),
        )
        .route("/api/update_session", post(routes::sessions::update_session))
        .route("/api/dashboard", get(routes::sessions::dashboard))
        .route("/generate_report", get(routes::reports::generate_report))
        .route("/report/:id", get(routes::reports::view_report))
        .route("/api/save_calibration", post(routes::calibration::save_calibration))
        .route("/api/calibration", get(routes::calibration::get_calibration))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_session: state.current_session,
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, String::from("metrics recorder not installed")),
    }
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    let level = config.level()?;
    let result = if config.json {
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
    result.map_err(|e| ApiError::Config(format!("Failed to set tracing subscriber: {}", e)))
}

/// Open the configured repository
pub async fn open_repository(database_url: &str) -> Result<Repository, ApiError> {
    if database_url == "memory" {
        return Ok(Repository::new());
    }
    Ok(Repository::with_sqlite(database_url).await?)
}

/// Run the server
pub async fn run_server(config: ServerConfig) -> Result<(), ApiError> {
    let repository = open_repository(&config.database_url).await?;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Config(format!("metrics recorder: {}", e)))?;
    let state = AppState::new(repository).with_metrics(handle).shared();

    let governor = rate_limit::peer_limits(&config.rate_limit)?;
    let app = create_router(state).layer(GovernorLayer { config: governor });

    info!("Starting API server on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
