//! Processing job persistence using SQLite with sqlx.
//!
//! Holds the job state machine (`pending → processing → completed | failed`)
//! and an append-only log per job. State transitions are single conditional
//! `UPDATE` statements, so concurrent callers cannot both win a transition.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use cloud_common::GeoBounds;
use cloud_detection::{DetectionMode, StatisticsRecord, WeatherCondition};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::artifacts::ArtifactPaths;
use crate::error::{StorageError, StorageResult};

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Coarse progress shown to clients.
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 50,
            Self::Completed => 100,
            Self::Failed => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a new attempt may be started from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a job log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

/// A processing job as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub file_name: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub status: JobStatus,
    /// Number of attempts started so far.
    pub attempt: u32,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub detection_mode: Option<DetectionMode>,
    /// Present only when `status` is completed.
    pub statistics: Option<StatisticsRecord>,
    /// Present only when `status` is completed.
    pub artifacts: Option<ArtifactPaths>,
}

/// One job log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Job counts per status plus mean coverage of completed jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub mean_coverage: Option<f64>,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS processing_jobs (
        id TEXT PRIMARY KEY,
        file_name TEXT NOT NULL,
        file_path TEXT NOT NULL,
        file_size INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        attempt INTEGER NOT NULL DEFAULT 0,
        submitted_at TEXT NOT NULL,
        started_at TEXT,
        ended_at TEXT,
        error_message TEXT,
        detection_mode TEXT,
        total_pixels INTEGER,
        cloud_pixels INTEGER,
        coverage_percentage REAL,
        cluster_count INTEGER,
        min_temperature REAL,
        max_temperature REAL,
        avg_temperature REAL,
        min_lon REAL,
        max_lon REAL,
        min_lat REAL,
        max_lat REAL,
        bounds_fallback INTEGER,
        location TEXT,
        weather TEXT,
        bt_path TEXT,
        mask_path TEXT,
        plot_path TEXT,
        thumbnail_path TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_status ON processing_jobs(status)",
    r#"
    CREATE TABLE IF NOT EXISTS processing_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        level TEXT NOT NULL,
        message TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_logs_job ON processing_logs(job_id, id)",
];

/// Columns cleared whenever a new attempt starts.
const RESULT_COLUMNS_CLEARED: &str = r#"
    error_message = NULL, detection_mode = NULL,
    total_pixels = NULL, cloud_pixels = NULL, coverage_percentage = NULL,
    cluster_count = NULL, min_temperature = NULL, max_temperature = NULL,
    avg_temperature = NULL, min_lon = NULL, max_lon = NULL, min_lat = NULL,
    max_lat = NULL, bounds_fallback = NULL, location = NULL, weather = NULL,
    bt_path = NULL, mask_path = NULL, plot_path = NULL, thumbnail_path = NULL
"#;

/// Fixed-width UTC timestamps so text comparison orders chronologically.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidRecord(format!("bad timestamp {:?}: {}", s, e)))
}

fn parse_uuid(s: &str) -> StorageResult<Uuid> {
    Uuid::from_str(s).map_err(|e| StorageError::InvalidRecord(format!("bad job id {:?}: {}", s, e)))
}

/// Manages job and log persistence.
#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    /// Open or create the job database at the given path.
    pub async fn open(path: &Path) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;
        info!(path = %path.display(), "Opened job database");

        Ok(Self { pool })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        // A single connection that is never recycled, since the database
        // lives only as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> StorageResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Insert a new `pending` job.
    pub async fn create_job(
        &self,
        file_name: &str,
        file_path: &Path,
        file_size: u64,
    ) -> StorageResult<JobRecord> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO processing_jobs (id, file_name, file_path, file_size, status, attempt, submitted_at)
            VALUES (?, ?, ?, ?, 'pending', 0, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(file_name)
        .bind(file_path.to_string_lossy().as_ref())
        .bind(file_size as i64)
        .bind(timestamp(now))
        .execute(&self.pool)
        .await?;

        debug!(job_id = %id, file_name = %file_name, "Created job record");

        self.get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// Atomically move a `pending` or `failed` job to `processing`.
    ///
    /// Increments the attempt counter, clears the previous error and results,
    /// and records the start time. Returns the new attempt number, or `None`
    /// if the job is not in a startable state.
    pub async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> StorageResult<Option<u32>> {
        let sql = format!(
            r#"
            UPDATE processing_jobs
            SET status = 'processing', attempt = attempt + 1, started_at = ?, ended_at = NULL,
                {}
            WHERE id = ? AND status IN ('pending', 'failed')
            RETURNING attempt
            "#,
            RESULT_COLUMNS_CLEARED
        );

        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(timestamp(now))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(attempt,)| attempt as u32))
    }

    /// Record the detection mode chosen for the running attempt.
    pub async fn set_detection_mode(
        &self,
        id: Uuid,
        attempt: u32,
        mode: DetectionMode,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE processing_jobs SET detection_mode = ? WHERE id = ? AND status = 'processing' AND attempt = ?",
        )
        .bind(mode.as_str())
        .bind(id.to_string())
        .bind(attempt as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Mark an attempt `completed` with its statistics and artifacts.
    ///
    /// Only applies if the job is still `processing` the same attempt.
    /// Returns whether the update applied.
    pub async fn complete(
        &self,
        id: Uuid,
        attempt: u32,
        stats: &StatisticsRecord,
        artifacts: &ArtifactPaths,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET status = 'completed', ended_at = ?, error_message = NULL,
                total_pixels = ?, cloud_pixels = ?, coverage_percentage = ?, cluster_count = ?,
                min_temperature = ?, max_temperature = ?, avg_temperature = ?,
                min_lon = ?, max_lon = ?, min_lat = ?, max_lat = ?, bounds_fallback = ?,
                location = ?, weather = ?,
                bt_path = ?, mask_path = ?, plot_path = ?, thumbnail_path = ?
            WHERE id = ? AND status = 'processing' AND attempt = ?
            "#,
        )
        .bind(timestamp(now))
        .bind(stats.total_pixels as i64)
        .bind(stats.cloud_pixels as i64)
        .bind(stats.coverage_percentage)
        .bind(stats.cluster_count as i64)
        .bind(stats.min_temperature)
        .bind(stats.max_temperature)
        .bind(stats.avg_temperature)
        .bind(stats.bounds.min_lon)
        .bind(stats.bounds.max_lon)
        .bind(stats.bounds.min_lat)
        .bind(stats.bounds.max_lat)
        .bind(stats.bounds_fallback)
        .bind(&stats.location)
        .bind(stats.weather.as_str())
        .bind(artifacts.bt_path.to_string_lossy().as_ref())
        .bind(artifacts.mask_path.to_string_lossy().as_ref())
        .bind(artifacts.plot_path.to_string_lossy().as_ref())
        .bind(
            artifacts
                .thumbnail_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )
        .bind(id.to_string())
        .bind(attempt as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Mark an attempt `failed` with an error message.
    ///
    /// Only applies if the job is still `processing` the same attempt.
    /// Returns whether the update applied.
    pub async fn fail(
        &self,
        id: Uuid,
        attempt: u32,
        error: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET status = 'failed', ended_at = ?, error_message = ?
            WHERE id = ? AND status = 'processing' AND attempt = ?
            "#,
        )
        .bind(timestamp(now))
        .bind(error)
        .bind(id.to_string())
        .bind(attempt as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Fail every job that has been `processing` since before `cutoff`.
    ///
    /// The age is measured from the attempt start, or from submission when
    /// no start was recorded. Returns `(job id, attempt)` of each swept job.
    pub async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        error: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<(Uuid, u32)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            UPDATE processing_jobs
            SET status = 'failed', ended_at = ?, error_message = ?
            WHERE status = 'processing' AND COALESCE(started_at, submitted_at) < ?
            RETURNING id, attempt
            "#,
        )
        .bind(timestamp(now))
        .bind(error)
        .bind(timestamp(cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, attempt)| Ok((parse_uuid(&id)?, attempt as u32)))
            .collect()
    }

    /// Fetch a job by id.
    pub async fn get(&self, id: Uuid) -> StorageResult<Option<JobRecord>> {
        let row = sqlx::query("SELECT * FROM processing_jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| job_from_row(&r)).transpose()
    }

    /// Most recently submitted jobs first.
    pub async fn list_recent(&self, limit: usize) -> StorageResult<Vec<JobRecord>> {
        let rows = sqlx::query("SELECT * FROM processing_jobs ORDER BY submitted_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(job_from_row).collect()
    }

    /// Job counts per status and mean coverage of completed jobs.
    pub async fn status_counts(&self) -> StorageResult<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM processing_jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let count = count as u64;
            match JobStatus::parse(&status) {
                Some(JobStatus::Pending) => counts.pending = count,
                Some(JobStatus::Processing) => counts.processing = count,
                Some(JobStatus::Completed) => counts.completed = count,
                Some(JobStatus::Failed) => counts.failed = count,
                None => {
                    return Err(StorageError::InvalidRecord(format!(
                        "unknown job status {:?}",
                        status
                    )))
                }
            }
        }

        let (mean,): (Option<f64>,) = sqlx::query_as(
            "SELECT AVG(coverage_percentage) FROM processing_jobs WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await?;
        counts.mean_coverage = mean;

        Ok(counts)
    }

    /// Append a log line for a job.
    pub async fn append_log(
        &self,
        job_id: Uuid,
        level: LogLevel,
        message: &str,
    ) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO processing_logs (job_id, timestamp, level, message) VALUES (?, ?, ?, ?)",
        )
        .bind(job_id.to_string())
        .bind(timestamp(Utc::now()))
        .bind(level.as_str())
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Log lines for a job, newest first.
    pub async fn logs(&self, job_id: Uuid, limit: Option<usize>) -> StorageResult<Vec<LogEntry>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let rows: Vec<(i64, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT id, job_id, timestamp, level, message
            FROM processing_logs
            WHERE job_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(job_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, job, ts, level, message)| {
                Ok(LogEntry {
                    id,
                    job_id: parse_uuid(&job)?,
                    timestamp: parse_timestamp(&ts)?,
                    level: LogLevel::parse(&level).ok_or_else(|| {
                        StorageError::InvalidRecord(format!("unknown log level {:?}", level))
                    })?,
                    message,
                })
            })
            .collect()
    }
}

fn optional_timestamp(row: &SqliteRow, column: &str) -> StorageResult<Option<DateTime<Utc>>> {
    let value: Option<String> = row.try_get(column)?;
    value.as_deref().map(parse_timestamp).transpose()
}

fn optional_path(row: &SqliteRow, column: &str) -> StorageResult<Option<PathBuf>> {
    let value: Option<String> = row.try_get(column)?;
    Ok(value.map(PathBuf::from))
}

fn job_from_row(row: &SqliteRow) -> StorageResult<JobRecord> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let status = JobStatus::parse(&status)
        .ok_or_else(|| StorageError::InvalidRecord(format!("unknown job status {:?}", status)))?;
    let submitted_at: String = row.try_get("submitted_at")?;
    let file_path: String = row.try_get("file_path")?;
    let file_size: i64 = row.try_get("file_size")?;
    let attempt: i64 = row.try_get("attempt")?;
    let mode: Option<String> = row.try_get("detection_mode")?;

    let (statistics, artifacts) = if status == JobStatus::Completed {
        (Some(statistics_from_row(row)?), Some(artifacts_from_row(row)?))
    } else {
        (None, None)
    };

    Ok(JobRecord {
        id: parse_uuid(&id)?,
        file_name: row.try_get("file_name")?,
        file_path: PathBuf::from(file_path),
        file_size: file_size as u64,
        status,
        attempt: attempt as u32,
        submitted_at: parse_timestamp(&submitted_at)?,
        started_at: optional_timestamp(row, "started_at")?,
        ended_at: optional_timestamp(row, "ended_at")?,
        error_message: row.try_get("error_message")?,
        detection_mode: mode.as_deref().and_then(DetectionMode::parse),
        statistics,
        artifacts,
    })
}

fn statistics_from_row(row: &SqliteRow) -> StorageResult<StatisticsRecord> {
    let total_pixels: i64 = row.try_get("total_pixels")?;
    let cloud_pixels: i64 = row.try_get("cloud_pixels")?;
    let cluster_count: i64 = row.try_get("cluster_count")?;
    let weather: String = row.try_get("weather")?;

    Ok(StatisticsRecord {
        total_pixels: total_pixels as usize,
        cloud_pixels: cloud_pixels as usize,
        coverage_percentage: row.try_get("coverage_percentage")?,
        cluster_count: cluster_count as usize,
        min_temperature: row.try_get("min_temperature")?,
        max_temperature: row.try_get("max_temperature")?,
        avg_temperature: row.try_get("avg_temperature")?,
        bounds: GeoBounds::new(
            row.try_get("min_lon")?,
            row.try_get("max_lon")?,
            row.try_get("min_lat")?,
            row.try_get("max_lat")?,
        ),
        bounds_fallback: row.try_get("bounds_fallback")?,
        location: row.try_get("location")?,
        weather: WeatherCondition::parse(&weather)
            .ok_or_else(|| StorageError::InvalidRecord(format!("unknown weather {:?}", weather)))?,
    })
}

fn artifacts_from_row(row: &SqliteRow) -> StorageResult<ArtifactPaths> {
    let required = |column: &str| -> StorageResult<PathBuf> {
        optional_path(row, column)?
            .ok_or_else(|| StorageError::InvalidRecord(format!("completed job without {}", column)))
    };

    Ok(ArtifactPaths {
        bt_path: required("bt_path")?,
        mask_path: required("mask_path")?,
        plot_path: required("plot_path")?,
        thumbnail_path: optional_path(row, "thumbnail_path")?,
    })
}
