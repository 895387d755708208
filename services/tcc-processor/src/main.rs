//! Command-line entry point for the TCC processor.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use storage::{ArtifactStore, JobStore};
use tcc_processor::{check_capabilities, JobManager, ProcessorConfig, StartOutcome};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tcc-processor")]
#[command(about = "Tropical cloud cluster detection jobs")]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "TCC_CONFIG")]
    config: Option<PathBuf>,

    /// Job database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Results directory (overrides the config file)
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a sensor file and process it
    Process {
        file: PathBuf,
        /// Return once the job is started instead of waiting for it
        #[arg(long)]
        no_wait: bool,
    },
    /// Show a job's status
    Status {
        id: Uuid,
        /// Wait up to this many seconds for the job to finish
        #[arg(long)]
        wait_secs: Option<u64>,
    },
    /// Re-run a failed job
    Retry { id: Uuid },
    /// Show a job's log, newest first
    Logs {
        id: Uuid,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Fail jobs stuck in processing
    Sweep,
    /// Job counts and mean coverage
    Summary,
    /// Report loader and results directory capabilities
    Capabilities,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ProcessorConfig::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(results_dir) = args.results_dir {
        config.results_dir = results_dir;
    }

    let loader = sensor_parser::default_loader();
    let report = check_capabilities(&config, loader.as_ref());
    if let Command::Capabilities = args.command {
        return print_json(&report);
    }

    let store = JobStore::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let artifacts = ArtifactStore::new(config.results_dir.clone());
    let manager = JobManager::new(store, artifacts, loader, config);

    match args.command {
        Command::Process { file, no_wait } => {
            let (id, outcome) = manager.submit(&file).await?;
            info!(job_id = %id, "Submitted {}", file.display());
            finish_start(&manager, id, outcome, no_wait).await
        }
        Command::Status { id, wait_secs } => {
            if let Some(secs) = wait_secs {
                manager
                    .wait_for_terminal(id, Duration::from_secs(secs))
                    .await?;
            }
            print_status(&manager, id).await
        }
        Command::Retry { id } => {
            let outcome = manager.retry(id).await?;
            finish_start(&manager, id, outcome, false).await
        }
        Command::Logs { id, limit } => {
            for entry in manager.get_logs(id, limit).await? {
                println!(
                    "{} [{}] {}",
                    entry.timestamp.to_rfc3339(),
                    entry.level.as_str(),
                    entry.message
                );
            }
            Ok(())
        }
        Command::Sweep => print_json(&manager.sweep_stale().await?),
        Command::Summary => print_json(&manager.dashboard().await?),
        Command::Capabilities => Ok(()),
    }
}

async fn finish_start(
    manager: &JobManager,
    id: Uuid,
    outcome: StartOutcome,
    no_wait: bool,
) -> Result<()> {
    match outcome {
        StartOutcome::Accepted(handle) => {
            if !no_wait {
                handle.wait().await;
            }
            print_status(manager, id).await
        }
        StartOutcome::Rejected { status, reason } => {
            bail!("Job {} not started ({}): {}", id, status, reason)
        }
    }
}

async fn print_status(manager: &JobManager, id: Uuid) -> Result<()> {
    match manager.get_status(id).await? {
        Some(view) => print_json(&view),
        None => bail!("Job not found: {}", id),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
