//! In-memory representation of a single MS2 spectrum.
//!
//! A [`SpectrumRecord`] is constructed once (by the MGF decoder or the mzML
//! adapter) and then only read. Construction validates the record invariants:
//!
//! - the title contains no line terminator, so it survives MGF serialization
//! - the retention time is finite and non-negative
//! - `peak_charges` is either empty or exactly as long as `peaks`

use serde::{Deserialize, Serialize};

/// Precursor intensity used by the MGF decoder when `PEPMASS` carries no intensity.
pub const UNKNOWN_PRECURSOR_INTENSITY: f64 = -1.0;

/// Errors raised when a record would violate its invariants
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpectrumError {
    /// Title contains a line terminator
    #[error("title {0:?} contains a line terminator")]
    InvalidTitle(String),

    /// Retention time is negative or not finite
    #[error("retention time must be finite and non-negative, got {0}")]
    InvalidRetentionTime(f64),

    /// Peak charge annotations do not line up with the peaks
    #[error("{charges} peak charge annotations for {peaks} peaks")]
    PeakChargeMismatch {
        /// Number of peaks
        peaks: usize,
        /// Number of charge annotations
        charges: usize,
    },
}

/// A single centroided peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Mass-to-charge ratio
    pub mz: f64,
    /// Signal intensity
    pub intensity: f64,
}

impl Peak {
    /// Create a new peak
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

impl From<(f64, f64)> for Peak {
    fn from((mz, intensity): (f64, f64)) -> Self {
        Self { mz, intensity }
    }
}

/// One MS2 scan, ready for serialization
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumRecord {
    title: String,
    retention_time: f64,
    precursor_mass: f64,
    precursor_intensity: f64,
    charge: i32,
    peaks: Vec<Peak>,
    peak_charges: Vec<String>,
}

impl SpectrumRecord {
    /// Create a record without peak charge annotations.
    ///
    /// `charge` is the signed precursor charge state; `0` means the charge
    /// is unknown.
    pub fn new(
        title: impl Into<String>,
        retention_time: f64,
        precursor_mass: f64,
        precursor_intensity: f64,
        charge: i32,
        peaks: Vec<Peak>,
    ) -> Result<Self, SpectrumError> {
        let title = title.into();
        if title.contains(['\n', '\r']) {
            return Err(SpectrumError::InvalidTitle(title));
        }
        if !retention_time.is_finite() || retention_time < 0.0 {
            return Err(SpectrumError::InvalidRetentionTime(retention_time));
        }

        Ok(Self {
            title,
            retention_time,
            precursor_mass,
            precursor_intensity,
            charge,
            peaks,
            peak_charges: Vec::new(),
        })
    }

    /// Attach per-peak charge annotations (raw text, as found in MGF).
    pub fn with_peak_charges(mut self, peak_charges: Vec<String>) -> Result<Self, SpectrumError> {
        if !peak_charges.is_empty() && peak_charges.len() != self.peaks.len() {
            return Err(SpectrumError::PeakChargeMismatch {
                peaks: self.peaks.len(),
                charges: peak_charges.len(),
            });
        }
        self.peak_charges = peak_charges;
        Ok(self)
    }

    /// Spectrum title, unique within its source file
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Retention time in seconds
    pub fn retention_time(&self) -> f64 {
        self.retention_time
    }

    /// Precursor m/z
    pub fn precursor_mass(&self) -> f64 {
        self.precursor_mass
    }

    /// Precursor intensity
    pub fn precursor_intensity(&self) -> f64 {
        self.precursor_intensity
    }

    /// Signed precursor charge, `0` when unknown
    pub fn charge(&self) -> i32 {
        self.charge
    }

    /// Whether the precursor charge is known
    pub fn has_charge(&self) -> bool {
        self.charge != 0
    }

    /// Peaks in source order
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Per-peak charge annotations; empty when unknown
    pub fn peak_charges(&self) -> &[String] {
        &self.peak_charges
    }

    /// Charge annotation for the peak at `index`, if annotations are present
    pub fn peak_charge(&self, index: usize) -> Option<&str> {
        self.peak_charges.get(index).map(String::as_str)
    }

    /// Number of peaks
    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }

    /// Uncharged mass: `mz * z - z`.
    ///
    /// Removes one unit per charge state, the convention downstream
    /// crosslink search tools expect.
    pub fn uncharged_mass(&self) -> f64 {
        let z = f64::from(self.charge);
        self.precursor_mass * z - z
    }

    /// Neutral mass used only for isotope relaxation: `mz * z`.
    ///
    /// Deliberately differs from [`uncharged_mass`](Self::uncharged_mass): the
    /// relaxation candidates are divided by the same charge again, so the
    /// per-charge deduction is left out.
    pub fn neutral_mass_for_relaxation(&self) -> f64 {
        self.precursor_mass * f64::from(self.charge)
    }
}
