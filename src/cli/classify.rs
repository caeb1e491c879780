use anyhow::{Context, Result};
use clap::Args;

use ms2prep::classify::{DetectorFilter, ScanFilter};

use super::DetectorArg;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Instrument filter string, e.g. "FTMS + p NSI d Full ms2 400.00@hcd28.00"
    #[arg(value_name = "FILTER_STRING")]
    pub filter_string: String,

    /// Report whether this detector filter would keep the scan
    #[arg(long, value_enum)]
    pub detector: Option<DetectorArg>,
}

pub fn run(args: ClassifyArgs) -> Result<()> {
    let filter = ScanFilter::parse(&args.filter_string).context("Classification failed")?;

    println!("Detector: {}", filter.detector);
    for activation in &filter.activations {
        match activation.energy {
            Some(energy) => println!("Activation: {} ({energy:.2})", activation.method),
            None => println!("Activation: {}", activation.method),
        }
    }
    println!("Method: {}", filter.fragmentation_method());

    if let Some(detector) = args.detector {
        let detector = DetectorFilter::from(detector);
        let verdict = if detector.accepts(filter.detector) {
            "kept"
        } else {
            "filtered out"
        };
        println!("Detector filter {detector}: {verdict}");
    }
    Ok(())
}
