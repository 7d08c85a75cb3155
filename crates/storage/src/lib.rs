//! Storage Layer
//!
//! Monitoring sessions, their telemetry data points and the blink
//! calibration, kept in memory or in SQLite behind one repository.

mod records;
mod report;
mod repository;

pub use records::{CalibrationRecord, MonitoringSession, SessionDataPoint, SessionUpdate, DEFAULT_EAR_THRESHOLD};
pub use report::{
    build_report, ActivityLevel, ChartData, Insight, PlantHealth, PlantStatus, SessionReport,
};
pub use repository::Repository;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            other => StorageError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}
