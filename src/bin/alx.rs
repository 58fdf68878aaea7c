//! ALX command line
//!
//! Validates installations and runs entry imports and exports

use alx::entry::kinds;
use alx::{Config, Direction, Root, StdEntryTransform, Transform, TransformState, Worker, WorkerMode};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "alx")]
#[command(about = "Skies of Arcadia Legends Examiner", version)]
struct Args {
    /// Configuration file replacing the embedded default
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Worker mode (process, thread)
    #[arg(short = 'w', long, global = true, default_value = "process")]
    worker: WorkerMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an installation
    Check {
        /// Installation directory
        dir: PathBuf,
    },
    /// Write the entries of a kind from binary files to CSV
    Export {
        /// Entity kind (e.g. weapon, character, enemy_magic)
        kind: String,
        /// Installation directory
        dir: PathBuf,
    },
    /// Write the entries of a kind from CSV to binary files
    Import {
        /// Entity kind (e.g. weapon, character, enemy_magic)
        kind: String,
        /// Installation directory
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<bool> {
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Config::embedded().context("Embedded configuration is malformed")?,
    };

    let root = Root::init(Arc::new(config));
    let mut root = root.write();

    let (direction, kind, dir) = match args.command {
        Command::Check { dir } => return Ok(load(&mut root, &dir)),
        Command::Export { kind, dir } => (Direction::Export, kind, dir),
        Command::Import { kind, dir } => (Direction::Import, kind, dir),
    };

    let kind = kinds::find(&kind).ok_or_else(|| {
        let names: Vec<&str> = kinds::KINDS.iter().map(|k| k.name()).collect();
        anyhow!("Unknown kind '{}' (valid: {})", kind, names.join(", "))
    })?;

    // A worker child takes over the installation validated by its parent
    match Worker::child_snapshot() {
        Some(snapshot) => root
            .restore(&snapshot)
            .context("Worker received a malformed installation snapshot")?,
        None => {
            if !load(&mut root, &dir) {
                return Ok(false);
            }
        }
    }

    let worker = Worker::new(args.worker).with_snapshot(root.snapshot()?);
    let mut transform = StdEntryTransform::new(kind, direction, &root)?;
    info!("{} ({} worker)", transform.name(), worker.mode());

    Ok(transform.exec(&worker) == TransformState::Done)
}

fn load(root: &mut Root, dir: &Path) -> bool {
    let valid = root.load(dir);
    if valid {
        let id = root.identity();
        info!(
            "Installation valid - {} {} {} ({})",
            id.platform_name, id.product_id, id.country_id, id.product_name
        );
    } else {
        error!("Installation invalid - {}", dir.display());
    }
    valid
}
