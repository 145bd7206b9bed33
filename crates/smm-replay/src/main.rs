//! Replay binary for the shared mental model study.
//!
//! Reads a recorded game log line by line, runs every tick through the
//! configured chain of belief models, and writes one JSON report line per
//! tick.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the path given as the first argument,
//!    `SMM_CONFIG`, or `smm-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the kitchen layout and seed the chain
//! 4. Open the game log and the report destination
//! 5. Replay in batch or live mode
//! 6. Log the summary

mod error;
mod replay;
mod report;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use smm_core::config::{LoggingConfig, ReplayMode, SmmConfig};
use smm_core::{BeliefChain, Layout};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ReplayError;
use crate::replay::ReplaySummary;
use crate::report::ReportWriter;

const DEFAULT_CONFIG_PATH: &str = "smm-config.yaml";

/// Application entry point for the replay binary.
///
/// # Errors
///
/// Returns an error if configuration, the layout, the log, or any tick
/// fails.
#[tokio::main]
async fn main() -> Result<(), ReplayError> {
    // 1. Load configuration.
    let config_path = config_path();
    let found = config_path.exists();
    let config = if found {
        SmmConfig::from_file(&config_path)?
    } else {
        let mut config = SmmConfig::default();
        config.replay.apply_env_overrides();
        config
    };
    config.validate()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("smm-replay starting");
    if found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Load the layout and seed the chain.
    let settings = &config.replay;
    let layout = Layout::from_file(&settings.layout_path)?;
    info!(
        path = %settings.layout_path.display(),
        width = layout.width(),
        height = layout.height(),
        "Layout loaded"
    );
    let mut chain = BeliefChain::from_config(&config.pipeline)?;
    chain.seed(&layout)?;

    // 4. Open the log and the report destination.
    let log_path = settings.log_path.display().to_string();
    let log = File::open(&settings.log_path).map_err(|source| ReplayError::Io {
        path: log_path.clone(),
        source,
    })?;
    let log = BufReader::new(log);

    let (out, destination): (Box<dyn Write>, String) = match &settings.output_path {
        Some(path) => {
            let file = File::create(path).map_err(|source| ReplayError::Io {
                path: path.display().to_string(),
                source,
            })?;
            (Box::new(BufWriter::new(file)), path.display().to_string())
        }
        None => (Box::new(std::io::stdout().lock()), "stdout".to_owned()),
    };
    let mut out = ReportWriter::new(out, destination, settings.layout_filter.clone());

    // 5. Replay.
    info!(
        log = %log_path,
        mode = ?settings.mode,
        stages = chain.len(),
        layout_filter = settings.layout_filter.as_deref().unwrap_or("*"),
        "Replay starting"
    );
    let filter = settings.layout_filter.clone();
    let summary = match settings.mode {
        ReplayMode::Batch => replay::run_batch(&mut chain, log, log_path, filter, &mut out)?,
        ReplayMode::Live => replay::run_live(chain, log, log_path, filter, &mut out).await?,
    };

    // 6. Log the summary.
    log_summary(&summary);
    Ok(())
}

/// First CLI argument, then `SMM_CONFIG`, then the default file name.
fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SMM_CONFIG").ok())
        .map_or_else(|| Path::new(DEFAULT_CONFIG_PATH).to_path_buf(), PathBuf::from)
}

/// Logs go to stderr so reports can own stdout. `RUST_LOG` wins over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn log_summary(summary: &ReplaySummary) {
    info!(
        lines = summary.lines,
        ticks = summary.ticks,
        reports = summary.reports,
        skipped_markers = summary.skipped_markers,
        skipped_rounds = summary.skipped_rounds,
        "Replay finished"
    );
}
