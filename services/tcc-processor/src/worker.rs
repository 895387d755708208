//! Execution of a single processing attempt.
//!
//! Stages run strictly in order: preflight, load, detect, persist. The
//! CPU-bound stages run on the blocking pool so a panic surfaces as a
//! `JoinError` and fails only this job. Whatever happens, the outcome is
//! recorded on the job and nothing is propagated to the caller.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use chrono::Utc;
use cloud_detection::{detect, DetectionMode, DetectionOutput, DetectionParams, StatisticsRecord};
use metrics::{counter, histogram};
use renderer::{default_thumbnail, render_cluster_plot, PlotOptions};
use sensor_parser::{ensure_readable, GridLoader, SensorError};
use storage::{ArtifactPaths, ArtifactStore, JobRecord, LogLevel};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::manager::JobManager;
use crate::memory::{format_bytes, rss_summary};

/// Stages of one attempt, as reported in error messages and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Preflight,
    Load,
    Detect,
    Persist,
}

impl AttemptStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStage::Preflight => "preflight",
            AttemptStage::Load => "load",
            AttemptStage::Detect => "detect",
            AttemptStage::Persist => "persist",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AttemptStage::Preflight => "Preflight",
            AttemptStage::Load => "Loading",
            AttemptStage::Detect => "Detection",
            AttemptStage::Persist => "Saving results",
        }
    }
}

struct StageFailure {
    stage: AttemptStage,
    error: anyhow::Error,
}

impl StageFailure {
    fn new(stage: AttemptStage, error: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }

    /// One-line message stored on the job.
    fn message(&self) -> String {
        format!("{} failed: {:#}", self.stage.label(), self.error)
    }
}

/// What the persist stage hands back for the completion update.
struct PersistedAttempt {
    statistics: StatisticsRecord,
    artifacts: ArtifactPaths,
    thumbnail_error: Option<String>,
}

/// Run one attempt to completion and record its outcome.
pub(crate) async fn run_attempt(manager: JobManager, job: JobRecord, attempt: u32) {
    let started = Instant::now();
    let job_id = job.id;
    manager
        .log(job_id, LogLevel::Info, &rss_summary("at start"))
        .await;

    match execute(&manager, &job, attempt).await {
        Ok(persisted) => finish_success(&manager, job_id, attempt, persisted).await,
        Err(failure) => finish_failure(&manager, job_id, attempt, failure).await,
    }

    manager.log(job_id, LogLevel::Info, &rss_summary("at end")).await;
    histogram!("tcc_attempt_duration_seconds").record(started.elapsed().as_secs_f64());
}

async fn execute(
    manager: &JobManager,
    job: &JobRecord,
    attempt: u32,
) -> Result<PersistedAttempt, StageFailure> {
    let stage_start = Instant::now();
    let (loader, params, file_size) =
        preflight(manager, job).map_err(|e| StageFailure::new(AttemptStage::Preflight, e))?;
    record_stage(AttemptStage::Preflight, stage_start);

    manager
        .store
        .set_detection_mode(job.id, attempt, params.mode)
        .await
        .map_err(|e| StageFailure::new(AttemptStage::Preflight, e))?;
    let mode_message = describe_mode(&params, file_size, manager);
    info!(job_id = %job.id, mode = %params.mode, file_size = file_size, "Detection mode selected");
    manager.log(job.id, LogLevel::Info, &mode_message).await;

    let path = job.file_path.clone();
    let grids = blocking(AttemptStage::Load, move || {
        loader
            .load(&path)
            .with_context(|| format!("Failed to load {}", path.display()))
    })
    .await?;

    let (height, width) = grids.shape();
    manager
        .log(
            job.id,
            LogLevel::Info,
            &format!(
                "Loaded {}x{} grid ({} decoded)",
                height,
                width,
                format_bytes(grids.size_bytes() as u64)
            ),
        )
        .await;

    let output = blocking(AttemptStage::Detect, move || {
        Ok(detect(grids.bt, grids.lat, grids.lon, &params)?)
    })
    .await?;
    report_detection(manager, job.id, &output).await;

    let artifacts = manager.artifacts.clone();
    let job_id = job.id;
    let file_name = job.file_name.clone();
    let persisted = blocking(AttemptStage::Persist, move || {
        persist(&artifacts, job_id, attempt, &file_name, output)
    })
    .await?;

    if let Some(reason) = &persisted.thumbnail_error {
        warn!(job_id = %job.id, error = %reason, "Thumbnail generation failed");
        manager
            .log(
                job.id,
                LogLevel::Warning,
                &format!("Thumbnail generation failed: {}", reason),
            )
            .await;
    }

    Ok(persisted)
}

/// Check the loader and input file, then pick the parameter set.
fn preflight(
    manager: &JobManager,
    job: &JobRecord,
) -> anyhow::Result<(Arc<dyn GridLoader>, DetectionParams, u64)> {
    let loader = manager.loader.clone().ok_or_else(|| {
        SensorError::LoaderUnavailable(
            "this build has no HDF5 reader; rebuild with the `netcdf` feature".to_string(),
        )
    })?;
    let file_size = ensure_readable(&job.file_path)?;
    let params = manager.config.detection.params_for_file_size(file_size);
    debug!(job_id = %job.id, loader = loader.name(), "Preflight passed");
    Ok((loader, params, file_size))
}

fn describe_mode(params: &DetectionParams, file_size: u64, manager: &JobManager) -> String {
    match params.mode {
        DetectionMode::Standard => format!(
            "Detection mode: standard (min_radius_km={}, min_size_pixels={})",
            params.min_radius_km, params.min_size_pixels
        ),
        DetectionMode::LargeFile => format!(
            "Detection mode: large_file, file size {} exceeds {} (min_radius_km={}, min_size_pixels={})",
            format_bytes(file_size),
            format_bytes(manager.config.detection.large_file.threshold_bytes),
            params.min_radius_km,
            params.min_size_pixels
        ),
    }
}

async fn report_detection(manager: &JobManager, job_id: Uuid, output: &DetectionOutput) {
    for (stage, elapsed) in &output.stage_timings {
        histogram!("tcc_detection_stage_seconds", "stage" => stage.as_str())
            .record(elapsed.as_secs_f64());
    }

    let stats = &output.statistics;
    if stats.bounds_fallback {
        warn!(job_id = %job_id, "No valid geolocation; using fallback bounds");
        manager
            .log(
                job_id,
                LogLevel::Warning,
                "No valid latitude/longitude samples; using fallback bounds 70-90°E, 5-25°N",
            )
            .await;
    }
    if stats.avg_temperature.is_none() {
        manager
            .log(
                job_id,
                LogLevel::Warning,
                "No valid brightness temperature samples; temperature statistics unavailable",
            )
            .await;
    }

    manager
        .log(
            job_id,
            LogLevel::Info,
            &format!(
                "Detected {} cluster(s), {:.2}% coverage ({})",
                stats.cluster_count, stats.coverage_percentage, stats.weather
            ),
        )
        .await;
}

/// Write arrays, plot and thumbnail into a fresh attempt directory.
fn persist(
    artifacts: &ArtifactStore,
    job_id: Uuid,
    attempt: u32,
    file_name: &str,
    output: DetectionOutput,
) -> anyhow::Result<PersistedAttempt> {
    let writer = artifacts
        .begin_attempt(job_id, attempt, file_name)
        .context("Failed to create attempt directory")?;

    let bt_path = writer.write_bt(&output.bt).context("Failed to write BT array")?;
    let mask_path = writer
        .write_mask(&output.final_mask)
        .context("Failed to write mask array")?;

    let plot = render_cluster_plot(
        &output.bt,
        &output.final_mask,
        output.statistics.bounds.extent(),
        &PlotOptions::default(),
    )
    .context("Failed to render cluster plot")?;
    let plot_path = writer.write_plot(&plot).context("Failed to write plot")?;
    drop(output.bt);
    drop(output.final_mask);

    let thumbnail = default_thumbnail(&plot)
        .map_err(anyhow::Error::from)
        .and_then(|png| Ok(writer.write_thumbnail(&png)?));
    let (thumbnail_path, thumbnail_error) = match thumbnail {
        Ok(path) => (Some(path), None),
        Err(e) => (None, Some(format!("{:#}", e))),
    };

    Ok(PersistedAttempt {
        statistics: output.statistics,
        artifacts: ArtifactPaths {
            bt_path,
            mask_path,
            plot_path,
            thumbnail_path,
        },
        thumbnail_error,
    })
}

async fn finish_success(
    manager: &JobManager,
    job_id: Uuid,
    attempt: u32,
    persisted: PersistedAttempt,
) {
    let stats = &persisted.statistics;
    match manager
        .store
        .complete(job_id, attempt, stats, &persisted.artifacts, Utc::now())
        .await
    {
        Ok(true) => {
            info!(
                job_id = %job_id,
                attempt = attempt,
                clusters = stats.cluster_count,
                coverage = stats.coverage_percentage,
                "Processing completed"
            );
            manager
                .log(job_id, LogLevel::Info, "Processing completed")
                .await;
            counter!("tcc_jobs_completed_total").increment(1);
        }
        Ok(false) => discard_superseded(manager, job_id, attempt).await,
        Err(e) => {
            let failure = StageFailure::new(
                AttemptStage::Persist,
                anyhow::Error::from(e).context("Failed to record results"),
            );
            finish_failure(manager, job_id, attempt, failure).await;
        }
    }
}

async fn finish_failure(manager: &JobManager, job_id: Uuid, attempt: u32, failure: StageFailure) {
    let message = failure.message();
    error!(
        job_id = %job_id,
        attempt = attempt,
        stage = failure.stage.as_str(),
        error = %message,
        "Processing failed"
    );
    counter!("tcc_jobs_failed_total", "stage" => failure.stage.as_str()).increment(1);
    discard_artifacts(manager, job_id, attempt);

    match manager
        .store
        .fail(job_id, attempt, &message, Utc::now())
        .await
    {
        Ok(true) => {
            manager.log(job_id, LogLevel::Error, &message).await;
            manager
                .log(
                    job_id,
                    LogLevel::Debug,
                    &format!("Diagnostic trace:\n{:?}", failure.error),
                )
                .await;
        }
        Ok(false) => discard_superseded(manager, job_id, attempt).await,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to record job failure");
        }
    }
}

/// The job left `processing` for this attempt (stale sweep); drop its output.
async fn discard_superseded(manager: &JobManager, job_id: Uuid, attempt: u32) {
    warn!(job_id = %job_id, attempt = attempt, "Attempt superseded; discarding results");
    discard_artifacts(manager, job_id, attempt);
    manager
        .log(
            job_id,
            LogLevel::Warning,
            &format!(
                "Attempt {} finished after the job left processing; results discarded",
                attempt
            ),
        )
        .await;
}

fn discard_artifacts(manager: &JobManager, job_id: Uuid, attempt: u32) {
    if let Err(e) = manager.artifacts.discard_attempt(job_id, attempt) {
        warn!(job_id = %job_id, attempt = attempt, error = %e, "Failed to discard attempt artifacts");
    }
}

/// Run `f` on the blocking pool, mapping errors and panics to `stage`.
async fn blocking<T, F>(stage: AttemptStage, f: F) -> Result<T, StageFailure>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let start = Instant::now();
    let result = match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StageFailure::new(stage, e)),
        Err(join) => Err(StageFailure::new(stage, join_failure(join))),
    };
    record_stage(stage, start);
    result
}

fn join_failure(err: JoinError) -> anyhow::Error {
    if err.is_panic() {
        anyhow!("worker panicked: {}", panic_message(err.into_panic().as_ref()))
    } else {
        anyhow!("worker task was cancelled")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn record_stage(stage: AttemptStage, start: Instant) {
    histogram!("tcc_attempt_stage_seconds", "stage" => stage.as_str())
        .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_includes_stage_and_chain() {
        let err = anyhow!("File not found: /data/x.h5").context("Failed to load /data/x.h5");
        let failure = StageFailure::new(AttemptStage::Load, err);
        assert_eq!(
            failure.message(),
            "Loading failed: Failed to load /data/x.h5: File not found: /data/x.h5"
        );
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bad index"));
        assert_eq!(panic_message(payload.as_ref()), "bad index");
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[tokio::test]
    async fn test_blocking_maps_panic_to_stage() {
        let result: Result<(), StageFailure> =
            blocking(AttemptStage::Detect, || panic!("index out of bounds")).await;
        let failure = result.err().unwrap();
        assert_eq!(failure.stage, AttemptStage::Detect);
        assert!(failure.message().contains("worker panicked: index out of bounds"));
    }
}
