use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use ms2prep::batch::BatchOrchestrator;

use super::{load_config, PipelineArgs};

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Input file or directory of acquisitions
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output directory (defaults to `processed/` next to the input)
    #[arg(short, long, value_name = "DIR")]
    pub outpath: Option<PathBuf>,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of files processed in parallel
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Have the converter write MGF and only normalize it
    #[arg(long)]
    pub no_split: bool,

    /// Path of the format converter executable
    #[arg(long, value_name = "PATH")]
    pub converter: Option<PathBuf>,

    /// Write the batch summary as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Run the batch orchestrator over a file or directory
pub fn run(args: ProcessArgs) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input does not exist: {}", args.input.display());
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        config.batch.workers = workers;
    }
    if let Some(converter) = args.converter {
        config.converter.executable = converter;
    }
    if args.no_split {
        config.pipeline.split_acquisitions = false;
    }
    args.pipeline.apply(&mut config.pipeline);
    config.validate().context("Invalid settings")?;

    info!("ms2prep batch processing");
    info!("========================");
    info!("Input:     {}", args.input.display());
    info!("Workers:   {}", config.batch.workers);
    info!("Converter: {}", config.converter.executable.display());
    info!("Split:     {}", config.pipeline.split_acquisitions);

    let orchestrator = BatchOrchestrator::new(config);
    let summary = orchestrator
        .run(&args.input, args.outpath.as_deref())
        .context("Batch processing failed")?;

    if let Some(report) = &args.report {
        let json = summary.to_json().context("Failed to serialize batch summary")?;
        std::fs::write(report, json)
            .with_context(|| format!("Failed to write report: {}", report.display()))?;
        info!("Report written to {}", report.display());
    }

    println!("{}", summary.format_colored());

    if summary.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
