//! Thermo-style scan filter strings.
//!
//! ```text
//! FTMS + p NSI d Full ms2 400.00@etd100.00@hcd28.00 [120.00-2000.00]
//! ^^                           ^^^^^^^^^^ ^^^^^^^^^
//! detector                     activation  activation
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ClassifyError, FragmentationMethod};

fn detector_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(FT|IT)").expect("This is valid regex"))
}

fn activation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z]+)([0-9.]+)").expect("This is valid regex"))
}

/// Mass analyzer that recorded the scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Detector {
    /// Fourier-transform analyzer (Orbitrap, ICR)
    FT,
    /// Ion trap
    IT,
}

impl Detector {
    /// Token as it appears at the start of a filter string
    pub fn token(&self) -> &'static str {
        match self {
            Detector::FT => "FT",
            Detector::IT => "IT",
        }
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Detector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FT" => Ok(Detector::FT),
            "IT" => Ok(Detector::IT),
            other => Err(format!("unknown detector: {other} (expected FT or IT)")),
        }
    }
}

/// Which detectors to keep when splitting a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DetectorFilter {
    /// Keep every scan
    #[default]
    All,
    /// Keep only scans recorded by this detector
    Only(Detector),
}

impl DetectorFilter {
    /// Whether a scan recorded by `detector` passes the filter
    pub fn accepts(&self, detector: Detector) -> bool {
        match self {
            DetectorFilter::All => true,
            DetectorFilter::Only(wanted) => *wanted == detector,
        }
    }
}

impl fmt::Display for DetectorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorFilter::All => f.write_str("all"),
            DetectorFilter::Only(detector) => write!(f, "{detector}"),
        }
    }
}

impl FromStr for DetectorFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(DetectorFilter::All)
        } else {
            s.parse().map(DetectorFilter::Only)
        }
    }
}

impl TryFrom<String> for DetectorFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DetectorFilter> for String {
    fn from(value: DetectorFilter) -> Self {
        value.to_string()
    }
}

/// One `@<method><energy>` group of a filter string
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    /// Activation method token, lower-cased
    pub method: String,
    /// Activation energy, if the digits form a valid number
    pub energy: Option<f64>,
}

/// The parts of a filter string needed for classification
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFilter {
    /// Detector token at the start of the string
    pub detector: Detector,
    /// Activations in order of appearance
    pub activations: Vec<Activation>,
}

impl ScanFilter {
    /// Parse a filter string.
    ///
    /// Fails when the string does not start with a known detector token.
    pub fn parse(filter_string: &str) -> Result<Self, ClassifyError> {
        let detector = detector_pattern()
            .captures(filter_string)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<Detector>().ok())
            .ok_or_else(|| ClassifyError::FilterString(filter_string.to_string()))?;

        let activations = activation_pattern()
            .captures_iter(filter_string)
            .map(|caps| Activation {
                method: caps[1].to_ascii_lowercase(),
                energy: caps[2].parse().ok(),
            })
            .collect();

        Ok(Self {
            detector,
            activations,
        })
    }

    /// Fragmentation method implied by the activations
    pub fn fragmentation_method(&self) -> FragmentationMethod {
        let tokens: Vec<&str> = self.activations.iter().map(|a| a.method.as_str()).collect();
        FragmentationMethod::from_activation_tokens(&tokens)
    }
}

/// Classify a filter string, honouring a detector filter.
///
/// Returns `Ok(None)` when the scan was recorded by a detector the filter
/// rejects.
pub fn classify(
    filter_string: &str,
    detector_filter: DetectorFilter,
) -> Result<Option<FragmentationMethod>, ClassifyError> {
    let filter = ScanFilter::parse(filter_string)?;
    if !detector_filter.accepts(filter.detector) {
        return Ok(None);
    }
    Ok(Some(filter.fragmentation_method()))
}
