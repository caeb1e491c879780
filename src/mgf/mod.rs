//! # MGF (Mascot Generic Format)
//!
//! Line-oriented text format holding one `BEGIN IONS` ... `END IONS` block per
//! MS2 spectrum. [`MgfReader`] decodes a stream lazily, one spectrum at a time;
//! [`MgfWriter`] encodes spectra in the normalized layout consumed by
//! crosslink search engines.
//!
//! ```rust,no_run
//! use ms2prep::mgf::{MgfReader, MgfWriter, MgfWriterConfig};
//! use ms2prep::relaxation::IsotopeRelaxation;
//!
//! let reader = MgfReader::open("run01.mgf")?;
//! let config = MgfWriterConfig::with_relaxation(IsotopeRelaxation::default());
//! let mut writer = MgfWriter::create("run01_relaxed.mgf", config)?;
//! for spectrum in reader.spectra() {
//!     writer.write_spectrum(&spectrum?)?;
//! }
//! writer.finish()?;
//! # Ok::<(), ms2prep::mgf::MgfError>(())
//! ```

mod error;
mod reader;
mod writer;

#[cfg(test)]
mod tests;

pub use error::MgfError;
pub use reader::{MgfReader, MgfSpectra};
pub use writer::{IntensityPolicy, MgfWriter, MgfWriterConfig, MgfWriterStats};
