//! Calibration Routes

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use storage::CalibrationRecord;

use crate::{ApiError, SharedState};

#[derive(Debug, Deserialize)]
pub struct SaveCalibrationRequest {
    pub threshold: Option<f64>,
}

/// Store the threshold measured by a calibration run
pub async fn save_calibration(
    State(state): State<SharedState>,
    Json(body): Json<SaveCalibrationRequest>,
) -> Result<Json<Value>, ApiError> {
    let threshold = body
        .threshold
        .ok_or_else(|| ApiError::BadRequest("threshold missing".into()))?;

    let state = state.read().await;
    state.repository.save_calibration(threshold).await?;
    Ok(Json(json!({ "status": "saved" })))
}

pub async fn get_calibration(State(state): State<SharedState>) -> Result<Json<CalibrationRecord>, ApiError> {
    let state = state.read().await;
    Ok(Json(state.repository.calibration().await?))
}
