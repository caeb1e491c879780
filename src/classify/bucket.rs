use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::FragmentationMethod;
use crate::spectrum::SpectrumRecord;

/// What to do with MS2 scans whose fragmentation method is not recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Keep them in the `unknown` bucket (written as `unknown_<stem>.mgf`)
    #[default]
    Retain,
    /// Discard them after counting
    Drop,
    /// Fail the whole file
    Fail,
}

/// Spectra of one source file, grouped by fragmentation method.
///
/// Spectra keep their source order within each group; groups iterate in
/// [`FragmentationMethod`] declaration order. A group exists only while it
/// holds at least one spectrum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationBucket {
    groups: BTreeMap<FragmentationMethod, Vec<SpectrumRecord>>,
}

impl ClassificationBucket {
    /// Create an empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a spectrum to the group of `method`
    pub fn push(&mut self, method: FragmentationMethod, spectrum: SpectrumRecord) {
        self.groups.entry(method).or_default().push(spectrum);
    }

    /// Spectra classified as `method`
    pub fn get(&self, method: FragmentationMethod) -> &[SpectrumRecord] {
        self.groups.get(&method).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of spectra classified as `method`
    pub fn count(&self, method: FragmentationMethod) -> usize {
        self.get(method).len()
    }

    /// Number of spectra with an unrecognized method
    pub fn unknown_count(&self) -> usize {
        self.count(FragmentationMethod::Unknown)
    }

    /// Remove and return the group of `method`
    pub fn take(&mut self, method: FragmentationMethod) -> Vec<SpectrumRecord> {
        self.groups.remove(&method).unwrap_or_default()
    }

    /// Total number of spectra over all groups
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Whether no spectrum was stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Methods that have at least one spectrum
    pub fn methods(&self) -> impl Iterator<Item = FragmentationMethod> + '_ {
        self.iter().map(|(method, _)| method)
    }

    /// Non-empty groups in method order
    pub fn iter(&self) -> impl Iterator<Item = (FragmentationMethod, &[SpectrumRecord])> {
        self.groups
            .iter()
            .map(|(method, spectra)| (*method, spectra.as_slice()))
    }

    /// All spectra in method order, dropping the grouping
    pub fn into_records(self) -> Vec<SpectrumRecord> {
        self.groups.into_values().flatten().collect()
    }
}

impl IntoIterator for ClassificationBucket {
    type Item = (FragmentationMethod, Vec<SpectrumRecord>);
    type IntoIter = std::collections::btree_map::IntoIter<FragmentationMethod, Vec<SpectrumRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}
