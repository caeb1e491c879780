use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use ms2prep::batch::{default_outdir, input_stem, FilePipeline, InputKind};

use super::{load_config, PipelineArgs};

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Input mzML file
    #[arg(value_name = "MZML")]
    pub input: PathBuf,

    /// Output directory (defaults to `processed/` next to the input)
    #[arg(short, long, value_name = "DIR")]
    pub outpath: Option<PathBuf>,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Split one mzML file by fragmentation method
pub fn run(args: SplitArgs) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }
    if InputKind::of(&args.input) != InputKind::MzML {
        anyhow::bail!("Not an mzML file: {}", args.input.display());
    }

    let mut config = load_config(args.config.as_deref())?;
    args.pipeline.apply(&mut config.pipeline);

    let outdir = args.outpath.unwrap_or_else(|| default_outdir(&args.input));
    std::fs::create_dir_all(&outdir)
        .with_context(|| format!("Failed to create {}", outdir.display()))?;

    info!("Splitting {} into {}", args.input.display(), outdir.display());
    let pipeline = FilePipeline::new(config.converter, config.pipeline);
    let (outputs, stats) = pipeline
        .split_mzml(&args.input, &input_stem(&args.input), &outdir)
        .context("Split failed")?;

    println!(
        "{} scans, {} MS2, {} filtered by detector, {} unknown",
        stats.scans_seen, stats.ms2_seen, stats.filtered_by_detector, stats.unknown
    );
    for output in &outputs {
        println!(
            "  {}: {} spectra",
            output.path.display(),
            output.stats.spectra_written
        );
    }
    Ok(())
}
