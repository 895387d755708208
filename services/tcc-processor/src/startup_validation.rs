//! Startup capability checks.
//!
//! Run once when the processor starts: reports whether a sensor file loader
//! is available in this build and whether the results directory is usable.
//! Jobs still consult the loader before every load, so a missing loader
//! fails jobs with a clear message rather than preventing startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sensor_parser::{native_loader_available, GridLoader};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ProcessorConfig;

/// Result of the startup capability check.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityReport {
    /// Native HDF5 reader compiled in
    pub native_loader: bool,
    /// Name of the loader jobs will use, if any
    pub loader: Option<String>,
    pub results_dir: PathBuf,
    pub results_dir_writable: bool,
    pub database_path: PathBuf,
}

impl CapabilityReport {
    /// True when jobs can be processed end to end.
    pub fn ready(&self) -> bool {
        self.loader.is_some() && self.results_dir_writable
    }
}

/// Check what this process can do and log the outcome.
pub fn check_capabilities(
    config: &ProcessorConfig,
    loader: Option<&Arc<dyn GridLoader>>,
) -> CapabilityReport {
    let report = CapabilityReport {
        native_loader: native_loader_available(),
        loader: loader.map(|l| l.name().to_string()),
        results_dir: config.results_dir.clone(),
        results_dir_writable: probe_writable(&config.results_dir),
        database_path: config.database_path.clone(),
    };

    if report.loader.is_none() {
        warn!("No sensor file loader available; rebuild with the `netcdf` feature to process files");
    }
    if !report.results_dir_writable {
        warn!(results_dir = %report.results_dir.display(), "Results directory is not writable");
    }
    info!(
        native_loader = report.native_loader,
        loader = ?report.loader,
        results_dir_writable = report.results_dir_writable,
        ready = report.ready(),
        "Capability check complete"
    );

    report
}

/// Create `dir` if needed and try writing a probe file into it.
fn probe_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".write-probe");
    let ok = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}
