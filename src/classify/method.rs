use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fragmentation (activation) method of an MS2 scan.
///
/// The declaration order is the order in which buckets are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FragmentationMethod {
    /// Collision-induced dissociation
    CID,
    /// Higher-energy collisional dissociation
    HCD,
    /// Electron-transfer dissociation
    ETD,
    /// ETD with supplemental CID activation
    ETciD,
    /// ETD with supplemental HCD activation
    EThcD,
    /// No recognized activation token
    #[serde(rename = "unknown")]
    Unknown,
}

impl FragmentationMethod {
    /// All methods, in bucket order
    pub const ALL: [FragmentationMethod; 6] = [
        FragmentationMethod::CID,
        FragmentationMethod::HCD,
        FragmentationMethod::ETD,
        FragmentationMethod::ETciD,
        FragmentationMethod::EThcD,
        FragmentationMethod::Unknown,
    ];

    /// Label used in output file names (`<label>_<stem>.mgf`)
    pub fn label(&self) -> &'static str {
        match self {
            FragmentationMethod::CID => "CID",
            FragmentationMethod::HCD => "HCD",
            FragmentationMethod::ETD => "ETD",
            FragmentationMethod::ETciD => "ETciD",
            FragmentationMethod::EThcD => "EThcD",
            FragmentationMethod::Unknown => "unknown",
        }
    }

    /// Derive the method from the set of activation tokens of a filter string.
    ///
    /// Combined activations are checked before single methods, so a scan with
    /// both `etd` and `hcd` is always `EThcD`.
    pub fn from_activation_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let has = |name: &str| tokens.iter().any(|t| t.as_ref().eq_ignore_ascii_case(name));

        if has("etd") && has("cid") {
            FragmentationMethod::ETciD
        } else if has("etd") && has("hcd") {
            FragmentationMethod::EThcD
        } else if has("etd") {
            FragmentationMethod::ETD
        } else if has("cid") {
            FragmentationMethod::CID
        } else if has("hcd") {
            FragmentationMethod::HCD
        } else {
            FragmentationMethod::Unknown
        }
    }
}

impl fmt::Display for FragmentationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FragmentationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FragmentationMethod::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown fragmentation method label: {s}"))
    }
}
