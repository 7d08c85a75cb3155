//! Repository Implementation

use crate::records::{CalibrationRecord, MonitoringSession, SessionDataPoint, SessionUpdate};
use crate::report::SessionReport;
use crate::StorageError;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS monitoring_session (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_time TEXT NOT NULL,
        end_time TEXT,
        total_blinks INTEGER NOT NULL DEFAULT 0,
        keyboard_activity INTEGER NOT NULL DEFAULT 0,
        mouse_activity INTEGER NOT NULL DEFAULT 0,
        avg_ear REAL NOT NULL DEFAULT 0.0,
        report TEXT
    )",
    "CREATE TABLE IF NOT EXISTS session_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL REFERENCES monitoring_session(id),
        timestamp TEXT NOT NULL,
        blink_count_snapshot INTEGER NOT NULL,
        detected_emotion TEXT NOT NULL,
        ear_value REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS calibration (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        threshold REAL NOT NULL,
        is_calibrated INTEGER NOT NULL
    )",
];

#[derive(Debug, Default)]
struct MemoryStore {
    sessions: Vec<MonitoringSession>,
    data_points: Vec<SessionDataPoint>,
    calibration: CalibrationRecord,
}

enum Backend {
    Memory(Mutex<MemoryStore>),
    Sqlite(SqlitePool),
}

/// Repository for session data
pub struct Repository {
    backend: Backend,
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::DatabaseError(format!("Lock error: {}", e))
}

/// Fixed-width RFC 3339 so text order is time order
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(text: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::SerializationError(format!("bad timestamp {}: {}", text, e)))
}

fn session_from_row(row: &SqliteRow) -> Result<MonitoringSession, StorageError> {
    let end_time: Option<String> = row.try_get("end_time")?;
    Ok(MonitoringSession {
        id: row.try_get("id")?,
        start_time: parse_time(&row.try_get::<String, _>("start_time")?)?,
        end_time: end_time.as_deref().map(parse_time).transpose()?,
        total_blinks: row.try_get("total_blinks")?,
        keyboard_activity: row.try_get("keyboard_activity")?,
        mouse_activity: row.try_get("mouse_activity")?,
        avg_ear: row.try_get("avg_ear")?,
        report: row.try_get("report")?,
    })
}

fn point_from_row(row: &SqliteRow) -> Result<SessionDataPoint, StorageError> {
    Ok(SessionDataPoint {
        session_id: row.try_get("session_id")?,
        timestamp: parse_time(&row.try_get::<String, _>("timestamp")?)?,
        blink_count_snapshot: row.try_get("blink_count_snapshot")?,
        detected_emotion: row.try_get("detected_emotion")?,
        ear_value: row.try_get("ear_value")?,
    })
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            backend: Backend::Memory(Mutex::new(MemoryStore::default())),
        }
    }

    /// Open (creating if missing) a SQLite database, e.g. `sqlite://wellness.db`
    pub async fn with_sqlite(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // every connection to an in-memory database is its own database
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        info!("Opened SQLite repository at {}", url);
        Ok(Self {
            backend: Backend::Sqlite(pool),
        })
    }

    /// Start a new session
    pub async fn start_session(&self, now: DateTime<Utc>) -> Result<MonitoringSession, StorageError> {
        let session = match &self.backend {
            Backend::Memory(store) => {
                let mut store = store.lock().map_err(lock_error)?;
                let id = store.sessions.len() as i64 + 1;
                let session = MonitoringSession::new(id, now);
                store.sessions.push(session.clone());
                session
            }
            Backend::Sqlite(pool) => {
                let result = sqlx::query("INSERT INTO monitoring_session (start_time) VALUES (?)")
                    .bind(format_time(now))
                    .execute(pool)
                    .await?;
                MonitoringSession::new(result.last_insert_rowid(), now)
            }
        };
        info!("Started session {}", session.id);
        Ok(session)
    }

    /// Overwrite the session summary and log a data point
    pub async fn update_session(
        &self,
        id: i64,
        update: &SessionUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let point = SessionDataPoint {
            session_id: id,
            timestamp: now,
            blink_count_snapshot: update.blinks,
            detected_emotion: update.emotion.clone(),
            ear_value: update.current_ear,
        };

        match &self.backend {
            Backend::Memory(store) => {
                let mut store = store.lock().map_err(lock_error)?;
                let session = store
                    .sessions
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or(StorageError::NotFound)?;
                session.total_blinks = update.blinks;
                session.keyboard_activity = update.keys;
                session.mouse_activity = update.mouse;
                session.avg_ear = update.session_avg_ear;
                store.data_points.push(point);
            }
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await?;
                let result = sqlx::query(
                    "UPDATE monitoring_session
                     SET total_blinks = ?, keyboard_activity = ?, mouse_activity = ?, avg_ear = ?
                     WHERE id = ?",
                )
                .bind(update.blinks)
                .bind(update.keys)
                .bind(update.mouse)
                .bind(update.session_avg_ear)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StorageError::NotFound);
                }

                sqlx::query(
                    "INSERT INTO session_data
                     (session_id, timestamp, blink_count_snapshot, detected_emotion, ear_value)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(point.session_id)
                .bind(format_time(point.timestamp))
                .bind(point.blink_count_snapshot)
                .bind(point.detected_emotion.as_str())
                .bind(point.ear_value)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
            }
        }
        debug!("Updated session {} (blinks={})", id, update.blinks);
        Ok(())
    }

    /// Mark a session ended; an existing end time is kept
    pub async fn end_session(&self, id: i64, now: DateTime<Utc>) -> Result<MonitoringSession, StorageError> {
        match &self.backend {
            Backend::Memory(store) => {
                let mut store = store.lock().map_err(lock_error)?;
                let session = store
                    .sessions
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or(StorageError::NotFound)?;
                session.end_time.get_or_insert(now);
            }
            Backend::Sqlite(pool) => {
                sqlx::query("UPDATE monitoring_session SET end_time = ? WHERE id = ? AND end_time IS NULL")
                    .bind(format_time(now))
                    .bind(id)
                    .execute(pool)
                    .await?;
            }
        }
        info!("Ended session {}", id);
        self.get_session(id).await
    }

    /// Fetch one session
    pub async fn get_session(&self, id: i64) -> Result<MonitoringSession, StorageError> {
        match &self.backend {
            Backend::Memory(store) => {
                let store = store.lock().map_err(lock_error)?;
                store
                    .sessions
                    .iter()
                    .find(|s| s.id == id)
                    .cloned()
                    .ok_or(StorageError::NotFound)
            }
            Backend::Sqlite(pool) => {
                let row = sqlx::query("SELECT * FROM monitoring_session WHERE id = ?")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?
                    .ok_or(StorageError::NotFound)?;
                session_from_row(&row)
            }
        }
    }

    /// Most recent sessions first
    pub async fn recent_sessions(&self, limit: usize) -> Result<Vec<MonitoringSession>, StorageError> {
        match &self.backend {
            Backend::Memory(store) => {
                let store = store.lock().map_err(lock_error)?;
                let mut sessions = store.sessions.clone();
                sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
                sessions.truncate(limit);
                Ok(sessions)
            }
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(
                    "SELECT * FROM monitoring_session ORDER BY start_time DESC, id DESC LIMIT ?",
                )
                .bind(limit as i64)
                .fetch_all(pool)
                .await?;
                rows.iter().map(session_from_row).collect()
            }
        }
    }

    /// Data points of a session in time order
    pub async fn data_points(&self, id: i64) -> Result<Vec<SessionDataPoint>, StorageError> {
        match &self.backend {
            Backend::Memory(store) => {
                let store = store.lock().map_err(lock_error)?;
                let mut points: Vec<_> = store
                    .data_points
                    .iter()
                    .filter(|p| p.session_id == id)
                    .cloned()
                    .collect();
                points.sort_by_key(|p| p.timestamp);
                Ok(points)
            }
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(
                    "SELECT * FROM session_data WHERE session_id = ? ORDER BY timestamp, id",
                )
                .bind(id)
                .fetch_all(pool)
                .await?;
                rows.iter().map(point_from_row).collect()
            }
        }
    }

    /// Store the final report of a session
    pub async fn save_report(&self, report: &SessionReport) -> Result<(), StorageError> {
        let json = serde_json::to_string(report)?;
        match &self.backend {
            Backend::Memory(store) => {
                let mut store = store.lock().map_err(lock_error)?;
                let session = store
                    .sessions
                    .iter_mut()
                    .find(|s| s.id == report.session_id)
                    .ok_or(StorageError::NotFound)?;
                session.report = Some(json);
            }
            Backend::Sqlite(pool) => {
                let result = sqlx::query("UPDATE monitoring_session SET report = ? WHERE id = ?")
                    .bind(json)
                    .bind(report.session_id)
                    .execute(pool)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(StorageError::NotFound);
                }
            }
        }
        debug!("Stored report for session {}", report.session_id);
        Ok(())
    }

    /// Stored report of a session, if it has ended
    pub async fn stored_report(&self, id: i64) -> Result<Option<SessionReport>, StorageError> {
        let session = self.get_session(id).await?;
        session
            .report
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(StorageError::from)
    }

    /// Current calibration (defaults until saved)
    pub async fn calibration(&self) -> Result<CalibrationRecord, StorageError> {
        match &self.backend {
            Backend::Memory(store) => Ok(store.lock().map_err(lock_error)?.calibration),
            Backend::Sqlite(pool) => {
                let row = sqlx::query("SELECT threshold, is_calibrated FROM calibration WHERE id = 1")
                    .fetch_optional(pool)
                    .await?;
                match row {
                    Some(row) => Ok(CalibrationRecord {
                        threshold: row.try_get("threshold")?,
                        is_calibrated: row.try_get::<i64, _>("is_calibrated")? != 0,
                    }),
                    None => Ok(CalibrationRecord::default()),
                }
            }
        }
    }

    /// Save a calibrated EAR threshold
    pub async fn save_calibration(&self, threshold: f64) -> Result<CalibrationRecord, StorageError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(StorageError::InvalidValue(format!("threshold {}", threshold)));
        }

        let record = CalibrationRecord {
            threshold,
            is_calibrated: true,
        };
        match &self.backend {
            Backend::Memory(store) => {
                store.lock().map_err(lock_error)?.calibration = record;
            }
            Backend::Sqlite(pool) => {
                sqlx::query(
                    "INSERT INTO calibration (id, threshold, is_calibrated) VALUES (1, ?, 1)
                     ON CONFLICT(id) DO UPDATE SET threshold = excluded.threshold, is_calibrated = 1",
                )
                .bind(threshold)
                .execute(pool)
                .await?;
            }
        }
        info!("Calibration saved: threshold {}", threshold);
        Ok(record)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn update(blinks: i64, emotion: &str) -> SessionUpdate {
        SessionUpdate {
            blinks,
            keys: 10,
            mouse: 250,
            emotion: emotion.to_string(),
            current_ear: 0.3,
            session_avg_ear: 0.28,
        }
    }

    async fn repositories() -> Vec<Repository> {
        vec![
            Repository::new(),
            Repository::with_sqlite("sqlite::memory:").await.unwrap(),
        ]
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        for repo in repositories().await {
            let session = repo.start_session(t0()).await.unwrap();
            assert_eq!(session.id, 1);
            assert!(session.is_active());

            repo.update_session(1, &update(3, "Happy"), t0() + Duration::seconds(4)).await.unwrap();
            repo.update_session(1, &update(5, "Sad"), t0() + Duration::seconds(8)).await.unwrap();

            let stored = repo.get_session(1).await.unwrap();
            assert_eq!(stored.total_blinks, 5);
            assert_eq!(stored.keyboard_activity, 10);
            assert_eq!(stored.avg_ear, 0.28);

            let points = repo.data_points(1).await.unwrap();
            assert_eq!(points.len(), 2);
            assert_eq!(points[0].detected_emotion, "Happy");
            assert_eq!(points[1].blink_count_snapshot, 5);
            assert_eq!(points[1].timestamp, t0() + Duration::seconds(8));

            let ended = repo.end_session(1, t0() + Duration::seconds(60)).await.unwrap();
            assert_eq!(ended.end_time, Some(t0() + Duration::seconds(60)));
        }
    }

    #[tokio::test]
    async fn test_end_time_set_once() {
        for repo in repositories().await {
            repo.start_session(t0()).await.unwrap();
            repo.end_session(1, t0() + Duration::seconds(60)).await.unwrap();
            let again = repo.end_session(1, t0() + Duration::seconds(120)).await.unwrap();
            assert_eq!(again.end_time, Some(t0() + Duration::seconds(60)));
        }
    }

    #[tokio::test]
    async fn test_unknown_session() {
        for repo in repositories().await {
            assert!(matches!(repo.get_session(42).await, Err(StorageError::NotFound)));
            assert!(matches!(
                repo.update_session(42, &update(1, "Neutral"), t0()).await,
                Err(StorageError::NotFound)
            ));
            assert!(matches!(repo.end_session(42, t0()).await, Err(StorageError::NotFound)));
            assert!(repo.data_points(42).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_recent_sessions_order() {
        for repo in repositories().await {
            for minutes in [0, 10, 5] {
                repo.start_session(t0() + Duration::minutes(minutes)).await.unwrap();
            }
            let recent = repo.recent_sessions(2).await.unwrap();
            let ids: Vec<i64> = recent.iter().map(|s| s.id).collect();
            assert_eq!(ids, vec![2, 3]);
        }
    }

    #[tokio::test]
    async fn test_report_round_trip() {
        for repo in repositories().await {
            let session = repo.start_session(t0()).await.unwrap();
            assert!(repo.stored_report(session.id).await.unwrap().is_none());

            let ended = repo.end_session(session.id, t0() + Duration::seconds(90)).await.unwrap();
            let report = crate::build_report(&ended, &[], t0());
            repo.save_report(&report).await.unwrap();

            assert_eq!(repo.stored_report(session.id).await.unwrap(), Some(report));
        }
    }

    #[tokio::test]
    async fn test_calibration() {
        for repo in repositories().await {
            let initial = repo.calibration().await.unwrap();
            assert_eq!(initial, CalibrationRecord::default());
            assert!(!initial.is_calibrated);

            repo.save_calibration(0.21).await.unwrap();
            repo.save_calibration(0.22).await.unwrap();
            let saved = repo.calibration().await.unwrap();
            assert_eq!(saved.threshold, 0.22);
            assert!(saved.is_calibrated);

            assert!(matches!(
                repo.save_calibration(0.0).await,
                Err(StorageError::InvalidValue(_))
            ));
            assert!(repo.save_calibration(f64::NAN).await.is_err());
        }
    }
}
