//! Job lifecycle: submission, status, retry, logs and the stale sweep.
//!
//! Every job state transition goes through [`JobStore`]'s conditional updates.
//! Attempts run in the background on their own task; see [`crate::worker`].

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use sensor_parser::GridLoader;
use serde::Serialize;
use storage::{
    ArtifactStore, JobRecord, JobStatus, JobStore, LogEntry, LogLevel, StatusCounts,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{ProcessorConfig, STALE_JOB_MESSAGE};
use crate::worker;

/// A job plus its coarse progress, as reported to clients.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    #[serde(flatten)]
    pub job: JobRecord,
    pub progress_percentage: u8,
}

impl From<JobRecord> for JobStatusView {
    fn from(job: JobRecord) -> Self {
        let progress_percentage = job.status.progress_percentage();
        Self {
            job,
            progress_percentage,
        }
    }
}

/// Background attempt started by [`JobManager::start`].
#[derive(Debug)]
pub struct AttemptHandle {
    pub attempt: u32,
    handle: JoinHandle<()>,
}

impl AttemptHandle {
    /// Wait until the attempt has recorded its outcome.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            error!(attempt = self.attempt, error = %e, "Worker task ended abnormally");
        }
    }
}

/// Result of asking for a new attempt.
#[derive(Debug)]
pub enum StartOutcome {
    Accepted(AttemptHandle),
    Rejected { status: JobStatus, reason: String },
}

impl StartOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, StartOutcome::Accepted(_))
    }

    /// Wait for an accepted attempt to finish; no-op when rejected.
    pub async fn wait(self) {
        if let StartOutcome::Accepted(handle) = self {
            handle.wait().await;
        }
    }
}

/// Owns job persistence and launches processing attempts.
#[derive(Clone)]
pub struct JobManager {
    pub(crate) store: JobStore,
    pub(crate) artifacts: ArtifactStore,
    pub(crate) loader: Option<Arc<dyn GridLoader>>,
    pub(crate) config: Arc<ProcessorConfig>,
}

impl JobManager {
    pub fn new(
        store: JobStore,
        artifacts: ArtifactStore,
        loader: Option<Arc<dyn GridLoader>>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            store,
            artifacts,
            loader,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Register a sensor file as a new `pending` job.
    ///
    /// A missing file is not an error here; the attempt fails in preflight.
    pub async fn create_job(&self, path: &Path) -> Result<Uuid> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        let job = self
            .store
            .create_job(&file_name, path, file_size)
            .await
            .context("Failed to create job")?;

        info!(job_id = %job.id, file_name = %file_name, file_size = file_size, "Job created");
        self.log(job.id, LogLevel::Info, &format!("Job created for {}", file_name))
            .await;
        counter!("tcc_jobs_submitted_total").increment(1);

        Ok(job.id)
    }

    /// Create a job and start its first attempt.
    pub async fn submit(&self, path: &Path) -> Result<(Uuid, StartOutcome)> {
        let id = self.create_job(path).await?;
        let outcome = self.start(id).await?;
        Ok((id, outcome))
    }

    /// Start a new attempt if the job is `pending` or `failed`.
    pub async fn start(&self, id: Uuid) -> Result<StartOutcome> {
        let job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("Job not found: {}", id))?;

        let Some(attempt) = self.store.claim(id, Utc::now()).await? else {
            // Lost the claim or the job is not startable; report the current state
            let status = self
                .store
                .get(id)
                .await?
                .map(|j| j.status)
                .unwrap_or(job.status);
            let reason = match status {
                JobStatus::Processing => "Job is already processing".to_string(),
                JobStatus::Completed => "Job has already completed".to_string(),
                other => format!("Job cannot be started from state {}", other),
            };
            info!(job_id = %id, status = %status, "Start rejected");
            return Ok(StartOutcome::Rejected { status, reason });
        };

        info!(job_id = %id, attempt = attempt, file = %job.file_path.display(), "Processing started");
        self.log(
            id,
            LogLevel::Info,
            &format!("Processing started (attempt {})", attempt),
        )
        .await;
        counter!("tcc_attempts_started_total").increment(1);

        let handle = tokio::spawn(worker::run_attempt(self.clone(), job, attempt));
        Ok(StartOutcome::Accepted(AttemptHandle { attempt, handle }))
    }

    /// Re-run a `failed` (or never started) job from the beginning.
    pub async fn retry(&self, id: Uuid) -> Result<StartOutcome> {
        let outcome = self.start(id).await?;
        if let StartOutcome::Accepted(handle) = &outcome {
            info!(job_id = %id, attempt = handle.attempt, "Retry accepted");
        }
        Ok(outcome)
    }

    pub async fn get_status(&self, id: Uuid) -> Result<Option<JobStatusView>> {
        Ok(self.store.get(id).await?.map(JobStatusView::from))
    }

    /// Job log, newest first.
    pub async fn get_logs(&self, id: Uuid, limit: Option<usize>) -> Result<Vec<LogEntry>> {
        Ok(self.store.logs(id, limit).await?)
    }

    /// Fail jobs stuck in `processing` longer than the configured timeout.
    pub async fn sweep_stale(&self) -> Result<Vec<Uuid>> {
        self.sweep_stale_at(Utc::now()).await
    }

    /// [`sweep_stale`](Self::sweep_stale) evaluated at `now`.
    pub async fn sweep_stale_at(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let cutoff = now - self.config.stale_timeout();
        let swept = self
            .store
            .fail_stale(cutoff, STALE_JOB_MESSAGE, now)
            .await
            .context("Stale job sweep failed")?;

        for (id, attempt) in &swept {
            warn!(job_id = %id, attempt = attempt, "Marked stale job as failed");
            self.log(*id, LogLevel::Error, STALE_JOB_MESSAGE).await;
            if let Err(e) = self.artifacts.discard_attempt(*id, *attempt) {
                warn!(job_id = %id, error = %e, "Failed to discard stale attempt artifacts");
            }
            counter!("tcc_jobs_timed_out_total").increment(1);
        }
        if !swept.is_empty() {
            info!(count = swept.len(), "Stale job sweep complete");
        }

        Ok(swept.into_iter().map(|(id, _)| id).collect())
    }

    /// Counts per status and mean coverage, after sweeping stale jobs.
    pub async fn dashboard(&self) -> Result<StatusCounts> {
        self.sweep_stale().await?;
        Ok(self.store.status_counts().await?)
    }

    /// Poll until the job is `completed` or `failed`.
    ///
    /// Returns `None` if it is still running when `timeout` elapses.
    pub async fn wait_for_terminal(&self, id: Uuid, timeout: Duration) -> Result<Option<JobRecord>> {
        let start = Instant::now();

        loop {
            let job = self
                .store
                .get(id)
                .await?
                .ok_or_else(|| anyhow!("Job not found: {}", id))?;

            if job.status.is_terminal() {
                return Ok(Some(job));
            }
            if start.elapsed() > timeout {
                return Ok(None);
            }

            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Append to the job log; failures are only traced.
    pub(crate) async fn log(&self, id: Uuid, level: LogLevel, message: &str) {
        if let Err(e) = self.store.append_log(id, level, message).await {
            warn!(job_id = %id, error = %e, "Failed to append job log");
        }
    }
}
