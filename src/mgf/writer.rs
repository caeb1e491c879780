//! MGF encoder.
//!
//! Every file starts with a `MASS=Monoisotopic` line. Each spectrum is written
//! as
//!
//! ```text
//! BEGIN IONS
//! TITLE=<title>
//! PEPMASS=<mz>[ <intensity>]
//! CHARGE=<z>+
//! RTINSECONDS=<rt>
//! ADDITIONALMZ=<c1>;<c2>;...
//! <mz> <intensity>[ <charge>]
//! END IONS
//! ```
//!
//! `CHARGE` is omitted for unknown charges and `ADDITIONALMZ` is only written
//! when isotope relaxation is configured.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use super::MgfError;
use crate::relaxation::{IsotopeRelaxation, RelaxationError};
use crate::spectrum::{SpectrumRecord, UNKNOWN_PRECURSOR_INTENSITY};

/// Which peaks are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityPolicy {
    /// Only peaks with intensity > 0
    #[default]
    PositiveOnly,
    /// Every peak, including zero intensities
    KeepAll,
}

impl IntensityPolicy {
    fn keeps(self, intensity: f64) -> bool {
        match self {
            Self::PositiveOnly => intensity > 0.0,
            Self::KeepAll => true,
        }
    }
}

/// Configuration for [`MgfWriter`]
#[derive(Debug, Clone, PartialEq)]
pub struct MgfWriterConfig {
    /// Peak filter applied while writing
    pub intensity_policy: IntensityPolicy,
    /// Isotope offsets written as `ADDITIONALMZ`
    pub relaxation: Option<IsotopeRelaxation>,
    /// Write the `MASS=Monoisotopic` header line
    pub write_mass_header: bool,
}

impl Default for MgfWriterConfig {
    fn default() -> Self {
        Self {
            intensity_policy: IntensityPolicy::default(),
            relaxation: None,
            write_mass_header: true,
        }
    }
}

impl MgfWriterConfig {
    /// Default configuration with isotope relaxation added
    pub fn with_relaxation(relaxation: IsotopeRelaxation) -> Self {
        Self {
            relaxation: Some(relaxation),
            ..Self::default()
        }
    }
}

/// Counters collected while writing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MgfWriterStats {
    /// Spectra written
    pub spectra_written: usize,
    /// Peak lines written
    pub peaks_written: usize,
    /// Peaks removed by the intensity policy
    pub peaks_dropped: usize,
    /// Spectra written without `ADDITIONALMZ` because their charge is unknown
    pub relaxation_skipped: usize,
}

/// Streaming MGF encoder
pub struct MgfWriter<W: Write> {
    writer: W,
    config: MgfWriterConfig,
    stats: MgfWriterStats,
    header_written: bool,
}

impl MgfWriter<BufWriter<File>> {
    /// Create (or truncate) an MGF file
    pub fn create(path: impl AsRef<Path>, config: MgfWriterConfig) -> Result<Self, MgfError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), config))
    }
}

impl<W: Write> MgfWriter<W> {
    /// Create an encoder over any Write implementation
    pub fn new(writer: W, config: MgfWriterConfig) -> Self {
        Self {
            writer,
            config,
            stats: MgfWriterStats::default(),
            header_written: false,
        }
    }

    /// Counters so far
    pub fn stats(&self) -> MgfWriterStats {
        self.stats
    }

    fn ensure_header(&mut self) -> Result<(), MgfError> {
        if !self.header_written {
            if self.config.write_mass_header {
                writeln!(self.writer, "MASS=Monoisotopic")?;
            }
            self.header_written = true;
        }
        Ok(())
    }

    /// Append one spectrum
    pub fn write_spectrum(&mut self, spectrum: &SpectrumRecord) -> Result<(), MgfError> {
        self.ensure_header()?;

        let additional_mz = match &self.config.relaxation {
            Some(relaxation) if !relaxation.is_empty() => match relaxation.candidates(spectrum) {
                Ok(candidates) => Some(candidates),
                Err(RelaxationError::ZeroCharge { title }) => {
                    warn!("Spectrum {title} has no charge, writing it without ADDITIONALMZ");
                    self.stats.relaxation_skipped += 1;
                    None
                }
            },
            _ => None,
        };

        let w = &mut self.writer;
        writeln!(w, "BEGIN IONS")?;
        writeln!(w, "TITLE={}", spectrum.title())?;
        if spectrum.precursor_intensity() == UNKNOWN_PRECURSOR_INTENSITY {
            writeln!(w, "PEPMASS={}", spectrum.precursor_mass())?;
        } else {
            writeln!(
                w,
                "PEPMASS={} {}",
                spectrum.precursor_mass(),
                spectrum.precursor_intensity()
            )?;
        }
        if spectrum.has_charge() {
            let sign = if spectrum.charge() < 0 { '-' } else { '+' };
            writeln!(w, "CHARGE={}{sign}", spectrum.charge().unsigned_abs())?;
        }
        writeln!(w, "RTINSECONDS={}", spectrum.retention_time())?;

        if let Some(candidates) = additional_mz {
            let joined = candidates
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(";");
            writeln!(w, "ADDITIONALMZ={joined}")?;
        }

        for (i, peak) in spectrum.peaks().iter().enumerate() {
            if !self.config.intensity_policy.keeps(peak.intensity) {
                self.stats.peaks_dropped += 1;
                continue;
            }
            match spectrum.peak_charge(i) {
                Some(charge) if !charge.is_empty() => {
                    writeln!(w, "{} {} {charge}", peak.mz, peak.intensity)?
                }
                _ => writeln!(w, "{} {}", peak.mz, peak.intensity)?,
            }
            self.stats.peaks_written += 1;
        }
        writeln!(w, "END IONS")?;

        self.stats.spectra_written += 1;
        Ok(())
    }

    /// Append every spectrum of an iterator
    pub fn write_all<'a, I>(&mut self, spectra: I) -> Result<(), MgfError>
    where
        I: IntoIterator<Item = &'a SpectrumRecord>,
    {
        for spectrum in spectra {
            self.write_spectrum(spectrum)?;
        }
        Ok(())
    }

    /// Flush and return the final counters
    pub fn finish(mut self) -> Result<MgfWriterStats, MgfError> {
        self.ensure_header()?;
        self.writer.flush()?;
        Ok(self.stats)
    }
}
