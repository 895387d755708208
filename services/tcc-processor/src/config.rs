//! Processor configuration.
//!
//! Resolved in layers: built-in defaults, then an optional YAML file, then
//! `TCC_*` environment variables, then validation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cloud_detection::DetectionConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Error recorded on jobs failed by the stale sweep.
pub const STALE_JOB_MESSAGE: &str = "Processing timed out - file stuck in processing state";

/// Longer timeouts are clamped to ten years.
const MAX_STALE_TIMEOUT_SECS: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// SQLite job database
    pub database_path: PathBuf,

    /// Root of the per-job artifact directories
    pub results_dir: PathBuf,

    /// Jobs processing for longer than this are failed by the stale sweep.
    pub stale_timeout_secs: u64,

    /// Poll interval used when waiting for a job to finish.
    pub poll_interval_ms: u64,

    pub detection: DetectionConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/tcc/jobs.db"),
            results_dir: PathBuf::from("data/tcc/results"),
            stale_timeout_secs: 3600,
            poll_interval_ms: 250,
            detection: DetectionConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from an optional YAML file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                info!(path = %path.display(), "Loaded processor config file");
                Self::from_yaml_str(&contents)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };

        let config = base.with_env_overrides();
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        debug!(config = ?config, "Resolved processor config");
        Ok(config)
    }

    /// Parse YAML, filling missing fields with defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `TCC_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("TCC_DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TCC_RESULTS_DIR") {
            self.results_dir = PathBuf::from(v);
        }
        if let Some(v) = std::env::var("TCC_STALE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            self.stale_timeout_secs = v;
        }
        self.detection = self.detection.with_env_overrides();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.stale_timeout_secs == 0 {
            return Err("stale_timeout_secs must be > 0".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be > 0".to_string());
        }
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path must not be empty".to_string());
        }
        if self.results_dir.as_os_str().is_empty() {
            return Err("results_dir must not be empty".to_string());
        }
        self.detection.validate()
    }

    pub fn stale_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_timeout_secs.min(MAX_STALE_TIMEOUT_SECS) as i64)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloud_detection::Connectivity;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProcessorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stale_timeout(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_partial_yaml() {
        let config = ProcessorConfig::from_yaml_str(
            r#"
results_dir: /srv/tcc/results
stale_timeout_secs: 600
detection:
  min_radius_km: 90.0
  connectivity: four
"#,
        )
        .unwrap();

        assert_eq!(config.results_dir, PathBuf::from("/srv/tcc/results"));
        assert_eq!(config.stale_timeout_secs, 600);
        assert_eq!(config.detection.min_radius_km, 90.0);
        assert_eq!(config.detection.connectivity, Connectivity::Four);
        // Untouched fields keep their defaults
        assert_eq!(config.detection.min_size_pixels, 100);
        assert_eq!(config.database_path, PathBuf::from("data/tcc/jobs.db"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = ProcessorConfig {
            stale_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ProcessorConfig::load(Some(Path::new("/nonexistent/tcc.yaml"))).is_err());
    }
}
