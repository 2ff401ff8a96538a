//! AMC alarm bridge
//!
//! Loads the integration options from a configuration directory, seeds a
//! coordinator with the first snapshot file, sets up the binary sensor
//! platform and applies every further snapshot file as a refresh. The
//! presented entity states are printed as JSON after each step.

use amc_config::{load_options, IntegrationOptions};
use amc_coordinator::Coordinator;
use amc_core::Snapshot;
use amc_entities::{EntityPlatform, PresentedState, SetupFailure};
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "amc-bridge", version, about = "Replay AMC alarm snapshots as binary sensors")]
struct Cli {
    /// Configuration directory (holds secrets.yaml)
    #[arg(short, long, default_value = ".")]
    config: PathBuf,

    /// Configuration file, relative to the configuration directory
    #[arg(long, default_value = "configuration.yaml")]
    config_file: PathBuf,

    /// Snapshot JSON files; the first seeds the coordinator
    #[arg(required = true)]
    snapshots: Vec<PathBuf>,
}

/// One line of output
#[derive(Debug, Serialize)]
struct StepReport<'a> {
    step: usize,
    source: &'a Path,
    update_success: bool,
    #[serde(skip_serializing_if = "<[SetupFailure]>::is_empty")]
    failures: &'a [SetupFailure],
    entities: Vec<PresentedState>,
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    Snapshot::from_json(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

fn read_options(config_dir: &Path, config_file: &Path) -> Result<IntegrationOptions> {
    if !config_dir.join(config_file).exists() {
        info!(
            "No {} in {}, using default options",
            config_file.display(),
            config_dir.display()
        );
        return Ok(IntegrationOptions::default());
    }
    load_options(config_dir, config_file).context("loading configuration")
}

fn print_step(
    step: usize,
    source: &Path,
    platform: &EntityPlatform,
    failures: &[SetupFailure],
) -> Result<()> {
    let report = StepReport {
        step,
        source,
        update_success: platform.coordinator().last_update_success(),
        failures,
        entities: platform.presented_states(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let Some((first, refreshes)) = cli.snapshots.split_first() else {
        bail!("at least one snapshot file is required");
    };

    let options = read_options(&cli.config, &cli.config_file)?;
    let coordinator = Arc::new(Coordinator::new(options, read_snapshot(first)?)?);

    let mut updates = coordinator.subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = 0usize;
        while updates.changed().await.is_ok() {
            seen += 1;
            debug!(centrals = updates.borrow_and_update().len(), "Snapshot published");
        }
        seen
    });

    let (mut platform, failures) = EntityPlatform::setup(coordinator.clone())?;
    info!(
        entities = platform.len(),
        failures = failures.len(),
        "Platform ready"
    );
    print_step(0, first, &platform, &failures)?;

    for (step, path) in refreshes.iter().enumerate() {
        match read_snapshot(path) {
            Ok(snapshot) => coordinator.set_updated_data(snapshot),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "Refresh failed");
                coordinator.set_update_error(format!("{err:#}"));
            }
        }
        print_step(step + 1, path, &platform, &[])?;
    }

    platform.unload();
    drop(platform);
    // The watch channel closes once the last coordinator handle is gone
    drop(coordinator);
    let published = watcher.await?;
    info!(published, "Done");

    Ok(())
}
