//! # mzML input
//!
//! mzML is the XML-based HUPO-PSI exchange format that vendor converters such
//! as msconvert produce. Only the spectrum list is read:
//!
//! ```text
//! indexedmzML (optional wrapper)
//! └── mzML
//!     └── run
//!         └── spectrumList
//!             └── spectrum*
//!                 ├── cvParam* (ms level)
//!                 ├── scanList/scan (scan start time, filter string)
//!                 ├── precursorList/precursor/selectedIonList/selectedIon*
//!                 └── binaryDataArrayList/binaryDataArray* (m/z, intensity)
//! ```
//!
//! [`MzMLStreamer`] pulls [`ScanEntry`] values out of the document and
//! [`MzMLAdapter`] turns the MS2 entries into classified spectrum records.

mod adapter;
mod binary;
mod cv_params;
mod streamer;

pub use adapter::{to_record, AdapterConfig, AdapterError, AdapterStats, MzMLAdapter};
pub use binary::{ArrayKind, BinaryArrayFormat, BinaryDecodeError, BinaryEncoding, CompressionType};
pub use cv_params::{retention_time_in_minutes, CvParam, MS_CV_ACCESSIONS};
pub use streamer::{MzMLError, MzMLStreamer, ScanEntries, ScanEntry, SelectedIon, DEFAULT_INPUT_BUFFER_SIZE};
