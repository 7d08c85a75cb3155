//! Session Routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storage::{MonitoringSession, SessionUpdate, StorageError};
use tracing::{debug, info};

use crate::{ApiError, SharedState};

/// Snapshot body pushed by the monitor; missing fields count as zero
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdateSessionRequest {
    pub blinks: i64,
    pub emotion: String,
    pub keys: i64,
    pub mouse: i64,
    pub current_ear: f64,
    pub session_avg_ear: f64,
}

impl Default for UpdateSessionRequest {
    fn default() -> Self {
        Self {
            blinks: 0,
            emotion: "Neutral".to_string(),
            keys: 0,
            mouse: 0,
            current_ear: 0.0,
            session_avg_ear: 0.0,
        }
    }
}

impl From<UpdateSessionRequest> for SessionUpdate {
    fn from(req: UpdateSessionRequest) -> Self {
        SessionUpdate {
            blinks: req.blinks,
            keys: req.keys,
            mouse: req.mouse,
            emotion: req.emotion,
            current_ear: req.current_ear,
            session_avg_ear: req.session_avg_ear,
        }
    }
}

/// Start a session and make it current
pub async fn start_session(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let mut state = state.write().await;
    let session = state.repository.start_session(Utc::now()).await?;
    if let Some(previous) = state.current_session.replace(session.id) {
        info!("Session {} replaced by {}", previous, session.id);
    }
    metrics::counter!("wellness_sessions_started_total").increment(1);
    Ok((StatusCode::CREATED, Json(session)))
}

/// Record a snapshot against the current session
pub async fn update_session(
    State(state): State<SharedState>,
    Json(body): Json<UpdateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state.read().await;
    let id = state.current_session.ok_or(ApiError::NoActiveSession)?;

    let update = SessionUpdate::from(body);
    match state.repository.update_session(id, &update, Utc::now()).await {
        Ok(()) => {}
        Err(StorageError::NotFound) => return Err(ApiError::NoActiveSession),
        Err(e) => return Err(e.into()),
    }

    metrics::counter!("wellness_snapshots_received_total").increment(1);
    debug!("Session {} updated: {} blinks", id, update.blinks);
    Ok(Json(json!({ "status": "success" })))
}

/// History query
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Past sessions, newest first
pub async fn list_sessions(
    State(state): State<SharedState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<MonitoringSession>>, ApiError> {
    let state = state.read().await;
    Ok(Json(state.repository.recent_sessions(params.limit).await?))
}

/// Dashboard summary
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub current_session: Option<i64>,
    pub recent_sessions: Vec<MonitoringSession>,
    pub plant: storage::PlantHealth,
}

/// Three latest sessions and the plant grown from the latest one
pub async fn dashboard(State(state): State<SharedState>) -> Result<Json<DashboardResponse>, ApiError> {
    let state = state.read().await;
    let recent_sessions = state.repository.recent_sessions(3).await?;
    let plant = recent_sessions
        .first()
        .map(|s| storage::PlantHealth::from_blinks(s.total_blinks))
        .unwrap_or_default();

    Ok(Json(DashboardResponse {
        current_session: state.current_session,
        recent_sessions,
        plant,
    }))
}
