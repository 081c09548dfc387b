//! cyp-sweep: run the docking + ML sweep described by a TOML configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cyp_dock_ml::{Config, Pipeline};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "cyp-sweep")]
#[command(version)]
#[command(about = "Leakage-controlled CYP450 docking + ML sweep", long_about = None)]
struct Args {
    /// Sweep configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Restrict the sweep to these isoforms (repeatable)
    ///
    /// Example: --isoform 2C9 --isoform 3A4
    #[arg(long = "isoform")]
    isoforms: Vec<String>,

    /// Restrict the sweep to these similarity thresholds (repeatable)
    #[arg(long = "threshold")]
    thresholds: Vec<u32>,

    /// Write results and the run log here instead of the configured directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    if !args.isoforms.is_empty() {
        config.isoforms = args.isoforms;
    }
    if !args.thresholds.is_empty() {
        config.thresholds = args.thresholds;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    config.validate().context("invalid configuration after CLI overrides")?;

    info!(
        "project {}: {} isoform(s) x {} threshold(s), {:?} partition",
        config.project_name,
        config.isoforms.len(),
        config.sweep_thresholds().len(),
        config.partition
    );
    let results_path = config.results_path();
    let ledger = Pipeline::new(config).run().context("sweep aborted")?;
    info!("{} result columns written to {}", ledger.len(), results_path.display());
    Ok(())
}
