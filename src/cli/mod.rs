use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::Path;

use ms2prep::classify::{Detector, DetectorFilter, UnknownPolicy};
use ms2prep::config::{PipelineConfig, PipelineSettings};
use ms2prep::mgf::IntensityPolicy;

mod classify;
mod process;
mod relax;
mod split;

/// ms2prep - MS2 spectrum preprocessing for search engines
#[derive(Parser)]
#[command(name = "ms2prep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Detector accepted by `--detector`.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DetectorArg {
    /// Keep every scan
    All,
    /// Fourier-transform detector only
    #[value(name = "FT", alias = "ft")]
    Ft,
    /// Ion trap detector only
    #[value(name = "IT", alias = "it")]
    It,
}

impl From<DetectorArg> for DetectorFilter {
    fn from(arg: DetectorArg) -> Self {
        match arg {
            DetectorArg::All => DetectorFilter::All,
            DetectorArg::Ft => DetectorFilter::Only(Detector::FT),
            DetectorArg::It => DetectorFilter::Only(Detector::IT),
        }
    }
}

/// Handling of scans with an unrecognized fragmentation method.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum UnknownArg {
    /// Write them to unknown_<stem>.mgf
    Retain,
    /// Discard them
    Drop,
    /// Fail the file
    Fail,
}

impl From<UnknownArg> for UnknownPolicy {
    fn from(arg: UnknownArg) -> Self {
        match arg {
            UnknownArg::Retain => UnknownPolicy::Retain,
            UnknownArg::Drop => UnknownPolicy::Drop,
            UnknownArg::Fail => UnknownPolicy::Fail,
        }
    }
}

/// Which peaks are written.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum IntensityArg {
    /// Drop peaks with zero or negative intensity
    PositiveOnly,
    /// Write every peak
    KeepAll,
}

impl From<IntensityArg> for IntensityPolicy {
    fn from(arg: IntensityArg) -> Self {
        match arg {
            IntensityArg::PositiveOnly => IntensityPolicy::PositiveOnly,
            IntensityArg::KeepAll => IntensityPolicy::KeepAll,
        }
    }
}

/// Per-file options shared by `process` and `split`; each overrides the config file.
#[derive(Args, Debug, Default)]
pub struct PipelineArgs {
    /// Keep only scans recorded by this detector
    #[arg(long, value_enum)]
    detector: Option<DetectorArg>,

    /// What to do with scans whose fragmentation method is not recognized
    #[arg(long, value_enum)]
    unknown: Option<UnknownArg>,

    /// Which peaks to write
    #[arg(long, value_enum)]
    intensity: Option<IntensityArg>,

    /// Isotope offsets written as ADDITIONALMZ, e.g. -1,-2,-3
    #[arg(long, value_name = "OFFSETS", value_delimiter = ',', allow_hyphen_values = true)]
    relax: Option<Vec<i32>>,

    /// Keep the third column of MGF peak lines
    #[arg(long)]
    peak_charges: bool,
}

impl PipelineArgs {
    fn apply(&self, settings: &mut PipelineSettings) {
        if let Some(detector) = self.detector {
            settings.detector = detector.into();
        }
        if let Some(unknown) = self.unknown {
            settings.unknown_policy = unknown.into();
        }
        if let Some(intensity) = self.intensity {
            settings.intensity_policy = intensity.into();
        }
        if let Some(relax) = &self.relax {
            settings.relaxation = relax.clone();
        }
        if self.peak_charges {
            settings.track_peak_charges = true;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert, split and encode a directory of acquisitions (or one file)
    Process(process::ProcessArgs),

    /// Split one mzML file into one MGF file per fragmentation method
    Split(split::SplitArgs),

    /// Add isotope relaxation masses to an MGF file
    Relax(relax::RelaxArgs),

    /// Print the detector and fragmentation method of a filter string
    Classify(classify::ClassifyArgs),
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process(args) => process::run(args),
        Commands::Split(args) => split::run(args),
        Commands::Relax(args) => relax::run(args),
        Commands::Classify(args) => classify::run(args),
    }
}

/// Configuration from `--config`, or the defaults
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_args() {
        let cli = Cli::try_parse_from([
            "ms2prep",
            "-vv",
            "process",
            "/data/raw",
            "--workers",
            "4",
            "--detector",
            "FT",
            "--relax",
            "-1,-2,-3",
            "--no-split",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 2);
        let Commands::Process(args) = cli.command else {
            panic!("expected process");
        };
        assert_eq!(args.workers, Some(4));
        assert!(args.no_split);

        let mut settings = PipelineSettings::default();
        args.pipeline.apply(&mut settings);
        assert_eq!(settings.detector, DetectorFilter::Only(Detector::FT));
        assert_eq!(settings.relaxation, vec![-1, -2, -3]);
    }

    #[test]
    fn test_relax_requires_offsets() {
        assert!(Cli::try_parse_from(["ms2prep", "relax", "a.mgf"]).is_err());
        assert!(Cli::try_parse_from(["ms2prep", "relax", "a.mgf", "--relax", "-1"]).is_ok());
    }

    #[test]
    fn test_overrides_leave_unset_keys() {
        let mut settings = PipelineSettings {
            unknown_policy: UnknownPolicy::Drop,
            ..PipelineSettings::default()
        };
        PipelineArgs::default().apply(&mut settings);
        assert_eq!(settings.unknown_policy, UnknownPolicy::Drop);
    }
}
