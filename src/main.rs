//! # ms2prep
//!
//! Command-line front end of the MS2 preprocessing pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Convert, split and relax every acquisition of a directory
//! ms2prep -v process /data/raw --relax -1,-2,-3 --workers 4
//!
//! # Split one mzML file by fragmentation method
//! ms2prep split run01.mzML --outpath split/
//!
//! # Add isotope relaxation masses to an MGF file
//! ms2prep relax run01.mgf --relax -1,-2
//!
//! # Inspect a filter string
//! ms2prep classify "FTMS + p NSI d Full ms2 400.00@etd100.00@hcd28.00"
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
