//! mzML scan entries → classified spectrum records.
//!
//! Only MS2 scans are kept. Each one is classified by its filter string,
//! optionally dropped by the detector filter, turned into a
//! [`SpectrumRecord`] titled `<stem> <native id>` and routed into a
//! [`ClassificationBucket`].

use std::path::Path;

use log::{debug, warn};
use serde::Serialize;

use super::streamer::{MzMLError, MzMLStreamer, ScanEntry};
use crate::classify::{
    classify, ClassificationBucket, ClassifyError, DetectorFilter, FragmentationMethod,
    UnknownPolicy,
};
use crate::spectrum::{Peak, SpectrumError, SpectrumRecord};

/// Errors that can occur while splitting an mzML run
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The mzML stream could not be parsed
    #[error(transparent)]
    MzML(#[from] MzMLError),

    /// A filter string could not be parsed
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// An MS2 scan has no filter string to classify
    #[error("MS2 spectrum {id} has no filter string")]
    MissingFilterString { id: String },

    /// An MS2 scan has no selected ion m/z
    #[error("MS2 spectrum {id} has no precursor m/z")]
    MissingPrecursor { id: String },

    /// m/z and intensity arrays differ in length
    #[error("spectrum {id} has {mz} m/z values but {intensity} intensities")]
    ArrayLengthMismatch {
        id: String,
        mz: usize,
        intensity: usize,
    },

    /// The scan does not form a valid spectrum record
    #[error("spectrum {id}: {source}")]
    InvalidSpectrum {
        id: String,
        #[source]
        source: SpectrumError,
    },

    /// Raised under [`UnknownPolicy::Fail`]
    #[error("the fragmentation method of {count} spectra could not be identified")]
    UnknownFragmentationMethod { count: usize },
}

/// Configuration for [`MzMLAdapter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Mass analyzers whose scans are kept
    pub detector: DetectorFilter,
    /// Handling of scans with an unrecognized fragmentation method
    pub unknown_policy: UnknownPolicy,
}

/// Counters of one split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdapterStats {
    /// All scan entries read
    pub scans_seen: usize,
    /// Entries with MS level 2
    pub ms2_seen: usize,
    /// MS2 scans rejected by the detector filter
    pub filtered_by_detector: usize,
    /// MS2 scans whose method was not recognized
    pub unknown: usize,
}

/// Splits the MS2 scans of an mzML run by fragmentation method
#[derive(Debug, Clone, Default)]
pub struct MzMLAdapter {
    config: AdapterConfig,
}

impl MzMLAdapter {
    /// Create an adapter with the given configuration
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Get the adapter configuration
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Split an mzML file. The title stem is the file name up to its last `.`.
    pub fn split_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(ClassificationBucket, AdapterStats), AdapterError> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let streamer = MzMLStreamer::open(path)?;
        self.split(&stem, streamer.entries())
    }

    /// Split a stream of scan entries.
    ///
    /// Fails on the first unparseable filter string or malformed MS2 scan.
    pub fn split<I>(
        &self,
        stem: &str,
        entries: I,
    ) -> Result<(ClassificationBucket, AdapterStats), AdapterError>
    where
        I: IntoIterator<Item = Result<ScanEntry, MzMLError>>,
    {
        let mut bucket = ClassificationBucket::new();
        let mut stats = AdapterStats::default();

        for entry in entries {
            let entry = entry?;
            stats.scans_seen += 1;
            if entry.ms_level != Some(2) {
                continue;
            }
            stats.ms2_seen += 1;

            let filter_string =
                entry
                    .filter_string
                    .as_deref()
                    .ok_or_else(|| AdapterError::MissingFilterString {
                        id: entry.id.clone(),
                    })?;
            let Some(method) = classify(filter_string, self.config.detector)? else {
                stats.filtered_by_detector += 1;
                continue;
            };

            bucket.push(method, to_record(stem, entry)?);
        }

        stats.unknown = bucket.unknown_count();
        if stats.unknown > 0 {
            match self.config.unknown_policy {
                UnknownPolicy::Retain => warn!(
                    "The fragmentation method of {} spectra in {stem} could not be identified",
                    stats.unknown
                ),
                UnknownPolicy::Drop => {
                    warn!(
                        "Dropping {} spectra of {stem} with unidentified fragmentation method",
                        stats.unknown
                    );
                    bucket.take(FragmentationMethod::Unknown);
                }
                UnknownPolicy::Fail => {
                    return Err(AdapterError::UnknownFragmentationMethod {
                        count: stats.unknown,
                    })
                }
            }
        }

        debug!(
            "{stem}: {} scans, {} MS2, {} filtered by detector, {} classified",
            stats.scans_seen,
            stats.ms2_seen,
            stats.filtered_by_detector,
            bucket.len()
        );
        Ok((bucket, stats))
    }
}

/// Build the spectrum record of an MS2 scan entry
pub fn to_record(stem: &str, entry: ScanEntry) -> Result<SpectrumRecord, AdapterError> {
    let ion = entry.first_selected_ion();
    let Some(precursor_mz) = ion.and_then(|ion| ion.mz) else {
        return Err(AdapterError::MissingPrecursor { id: entry.id });
    };
    let precursor_intensity = ion.and_then(|ion| ion.intensity).unwrap_or(0.0);
    let charge = ion.and_then(|ion| ion.charge).unwrap_or(0);

    if entry.mz_array.len() != entry.intensity_array.len() {
        return Err(AdapterError::ArrayLengthMismatch {
            id: entry.id,
            mz: entry.mz_array.len(),
            intensity: entry.intensity_array.len(),
        });
    }
    let peaks = entry
        .mz_array
        .iter()
        .zip(&entry.intensity_array)
        .map(|(&mz, &intensity)| Peak::new(mz, intensity))
        .collect();

    let retention_time = entry.retention_time.unwrap_or(0.0) * 60.0;
    SpectrumRecord::new(
        format!("{stem} {}", entry.id),
        retention_time,
        precursor_mz,
        precursor_intensity,
        charge,
        peaks,
    )
    .map_err(|source| AdapterError::InvalidSpectrum {
        id: entry.id,
        source,
    })
}
