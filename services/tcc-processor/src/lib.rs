//! Tropical cloud cluster processing service.
//!
//! Wraps the detection pipeline in a persistent job lifecycle:
//! - Jobs move `pending → processing → completed | failed`
//! - Attempts run in the background, one stage at a time
//! - Failed jobs keep their error and diagnostic trace and can be retried
//! - A stale sweep fails jobs stuck in `processing`

pub mod config;
pub mod manager;
pub mod memory;
pub mod startup_validation;
pub mod worker;

pub use config::{ProcessorConfig, STALE_JOB_MESSAGE};
pub use manager::{AttemptHandle, JobManager, JobStatusView, StartOutcome};
pub use startup_validation::{check_capabilities, CapabilityReport};
pub use worker::AttemptStage;
