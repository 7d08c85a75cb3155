//! Report Routes

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use storage::{build_report, SessionReport};
use tracing::info;

use crate::{ApiError, SharedState};

/// End the current session and return its report
pub async fn generate_report(State(state): State<SharedState>) -> Result<Json<SessionReport>, ApiError> {
    let mut state = state.write().await;
    let id = state.current_session.ok_or(ApiError::NoActiveSession)?;

    let now = Utc::now();
    let session = state.repository.end_session(id, now).await?;
    let points = state.repository.data_points(id).await?;
    let report = build_report(&session, &points, now);
    state.repository.save_report(&report).await?;

    state.current_session = None;
    info!(
        "Report for session {}: {:.2} min, {} blinks, {}",
        id, report.duration_minutes, report.total_blinks, report.dominant_emotion
    );
    Ok(Json(report))
}

/// Report of a past session; rebuilt when none was stored
pub async fn view_report(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<SessionReport>, ApiError> {
    let state = state.read().await;
    if let Some(report) = state.repository.stored_report(id).await? {
        return Ok(Json(report));
    }

    let session = state.repository.get_session(id).await?;
    let points = state.repository.data_points(id).await?;
    Ok(Json(build_report(&session, &points, Utc::now())))
}
