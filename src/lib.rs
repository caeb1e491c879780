//! # ms2prep - MS2 spectrum preprocessing for search engines
//!
//! `ms2prep` turns instrument output into normalized MGF files ready for
//! peptide and crosslink search engines.
//!
//! ## Pipeline
//!
//! ```text
//! vendor raw ──converter──▶ mzML ──adapter──▶ buckets by method ──encoder──▶ <METHOD>_<stem>.mgf
//!                           MGF  ──decoder─────────────────────────encoder──▶ <stem>.mgf
//! ```
//!
//! - MS2 scans are split by fragmentation method (CID, HCD, ETD, ETciD,
//!   EThcD), recovered from the scan filter string.
//! - Precursors can be augmented with isotope-shifted candidate m/z values,
//!   written as `ADDITIONALMZ`.
//! - Vendor formats are handed to an external converter subprocess
//!   (msconvert), with a deadline, cancellation and a bounded retry of
//!   transient failures.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ms2prep::mgf::{MgfReader, MgfWriter, MgfWriterConfig};
//! use ms2prep::relaxation::IsotopeRelaxation;
//!
//! let reader = MgfReader::open("run01.mgf")?;
//! let config = MgfWriterConfig::with_relaxation(IsotopeRelaxation::new(vec![-1, -2]));
//! let mut writer = MgfWriter::create("run01.relaxed.mgf", config)?;
//! for spectrum in reader.spectra() {
//!     writer.write_spectrum(&spectrum?)?;
//! }
//! let stats = writer.finish()?;
//! println!("Wrote {} spectra", stats.spectra_written);
//! # Ok::<(), ms2prep::mgf::MgfError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`spectrum`]: the spectrum record and its mass formulas
//! - [`classify`]: filter string parsing and fragmentation-method buckets
//! - [`mgf`]: streaming MGF decoder and encoder
//! - [`relaxation`]: isotope relaxation augmenter
//! - [`mzml`]: streaming mzML parser and the spectrum adapter
//! - [`converter`]: external format converter subprocess
//! - [`batch`]: parallel per-file pipeline and the batch summary
//! - [`config`]: TOML configuration

pub mod batch;
pub mod classify;
pub mod config;
pub mod converter;
pub mod mgf;
pub mod mzml;
pub mod relaxation;
pub mod spectrum;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::batch::{
        BatchOrchestrator, BatchSummary, CancellationToken, FilePipeline, PipelineError,
    };
    pub use crate::classify::{
        classify, ClassificationBucket, Detector, DetectorFilter, FragmentationMethod,
        ScanFilter, UnknownPolicy,
    };
    pub use crate::config::PipelineConfig;
    pub use crate::converter::{ConverterConfig, ExternalConverter, OutputFormat, ToolOutcome};
    pub use crate::mgf::{IntensityPolicy, MgfError, MgfReader, MgfWriter, MgfWriterConfig};
    pub use crate::mzml::{MzMLAdapter, MzMLStreamer, ScanEntry};
    pub use crate::relaxation::{IsotopeRelaxation, C13_C12_MASS_DIFFERENCE};
    pub use crate::spectrum::{Peak, SpectrumRecord};
}
