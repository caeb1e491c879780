use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use ms2prep::batch::{default_outdir, input_stem, FilePipeline};
use ms2prep::config::PipelineSettings;

use super::IntensityArg;

#[derive(Args, Debug)]
pub struct RelaxArgs {
    /// Input MGF file
    #[arg(value_name = "MGF")]
    pub input: PathBuf,

    /// Output directory (defaults to `processed/` next to the input)
    #[arg(short, long, value_name = "DIR")]
    pub outpath: Option<PathBuf>,

    /// Isotope offsets written as ADDITIONALMZ, e.g. -1,-2,-3
    #[arg(
        long,
        value_name = "OFFSETS",
        value_delimiter = ',',
        allow_hyphen_values = true,
        required = true
    )]
    pub relax: Vec<i32>,

    /// Which peaks to write
    #[arg(long, value_enum)]
    pub intensity: Option<IntensityArg>,

    /// Keep the third column of MGF peak lines
    #[arg(long)]
    pub peak_charges: bool,
}

/// Relax one MGF file into `<outdir>/<stem>.mgf`
pub fn run(args: RelaxArgs) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let mut settings = PipelineSettings {
        relaxation: args.relax,
        track_peak_charges: args.peak_charges,
        ..PipelineSettings::default()
    };
    if let Some(intensity) = args.intensity {
        settings.intensity_policy = intensity.into();
    }

    let outdir = args.outpath.unwrap_or_else(|| default_outdir(&args.input));
    std::fs::create_dir_all(&outdir)
        .with_context(|| format!("Failed to create {}", outdir.display()))?;

    let pipeline = FilePipeline::new(Default::default(), settings);
    let output = pipeline
        .normalize_mgf(&args.input, &input_stem(&args.input), &outdir)
        .context("Relaxation failed")?;

    println!(
        "{}: {} spectra, {} without charge left unrelaxed",
        output.path.display(),
        output.stats.spectra_written,
        output.stats.relaxation_skipped
    );
    Ok(())
}
