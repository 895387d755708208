//! Persistence for cloud detection runs.
//!
//! - SQLite job state and per-job logs ([`JobStore`])
//! - Per-attempt result artifacts on the local filesystem ([`ArtifactStore`])
//! - NumPy `.npy` encoding of result grids

pub mod artifacts;
pub mod error;
pub mod jobs;
pub mod npy;

pub use artifacts::{artifact_base_name, ArtifactPaths, ArtifactStore, AttemptWriter};
pub use error::{StorageError, StorageResult};
pub use jobs::{JobRecord, JobStatus, JobStore, LogEntry, LogLevel, StatusCounts};
pub use npy::{read_npy, write_npy, NpyElement};
