//! # Fragmentation-method classification
//!
//! MS2 scans acquired with different activation techniques are searched with
//! different fragment ion models, so each run is split by method before
//! searching. The method is recovered from the instrument filter string:
//!
//! 1. the leading detector token (`FT` or `IT`) is required
//! 2. every `@<method><energy>` group contributes an activation token
//! 3. combined activations win over single ones:
//!    `etd`+`cid` → ETciD, `etd`+`hcd` → EThcD, then ETD, CID, HCD, unknown

mod bucket;
mod filter;
mod method;

pub use bucket::{ClassificationBucket, UnknownPolicy};
pub use filter::{classify, Activation, Detector, DetectorFilter, ScanFilter};
pub use method::FragmentationMethod;

/// Errors raised while classifying a scan
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifyError {
    /// Filter string does not start with a detector token
    #[error("filter string parse error: {0}")]
    FilterString(String),
}
