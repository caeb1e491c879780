//! Isotope relaxation of precursor masses.
//!
//! Instruments frequently pick an isotope peak instead of the monoisotopic
//! peak of the precursor envelope. Searching additionally at precursor masses
//! shifted by whole numbers of the ¹³C-¹²C mass difference recovers many of
//! the identifications that are otherwise lost. The candidates are written as
//! the `ADDITIONALMZ` field of the normalized MGF output.

use serde::{Deserialize, Serialize};

use crate::spectrum::SpectrumRecord;

/// Mass difference between ¹³C and ¹²C in Dalton
pub const C13_C12_MASS_DIFFERENCE: f64 = 1.00335483;

/// Errors raised while computing relaxation candidates
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RelaxationError {
    /// The precursor charge is unknown, so no neutral mass can be derived
    #[error("spectrum {title} has no precursor charge")]
    ZeroCharge {
        /// Title of the offending spectrum
        title: String,
    },
}

/// Candidate m/z for one isotope offset.
///
/// `M = mz * z`, candidate = `(M + offset * 1.00335483) / z`.
pub fn candidate_mz(precursor_mz: f64, charge: i32, offset: i32) -> f64 {
    let z = f64::from(charge);
    let mass = precursor_mz * z;
    (mass + f64::from(offset) * C13_C12_MASS_DIFFERENCE) / z
}

/// Isotope offsets to add to every precursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IsotopeRelaxation {
    offsets: Vec<i32>,
}

impl Default for IsotopeRelaxation {
    /// Offsets -1, -2, -3
    fn default() -> Self {
        Self::new(vec![-1, -2, -3])
    }
}

impl IsotopeRelaxation {
    /// Create a relaxation with the given offsets, kept in caller order
    pub fn new(offsets: Vec<i32>) -> Self {
        Self { offsets }
    }

    /// Offsets in output order
    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    /// Whether no offsets are configured
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Candidate m/z values for `spectrum`, one per offset.
    pub fn candidates(&self, spectrum: &SpectrumRecord) -> Result<Vec<f64>, RelaxationError> {
        if !spectrum.has_charge() {
            return Err(RelaxationError::ZeroCharge {
                title: spectrum.title().to_string(),
            });
        }

        Ok(self
            .offsets
            .iter()
            .map(|&offset| candidate_mz(spectrum.precursor_mass(), spectrum.charge(), offset))
            .collect())
    }
}
