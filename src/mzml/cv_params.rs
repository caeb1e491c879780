//! PSI-MS controlled vocabulary terms read from mzML.

/// A `<cvParam>` element, reduced to what scan extraction needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CvParam {
    /// Accession number (e.g., "MS:1000511")
    pub accession: String,

    /// Optional value
    pub value: Option<String>,

    /// Unit accession (e.g., "UO:0000031")
    pub unit_accession: Option<String>,
}

impl CvParam {
    /// Get the value as f64 if possible
    pub fn value_as_f64(&self) -> Option<f64> {
        self.value.as_deref()?.trim().parse().ok()
    }

    /// Get the value as i32 if possible
    pub fn value_as_i32(&self) -> Option<i32> {
        self.value.as_deref()?.trim().parse().ok()
    }
}

/// MS and UO accessions used by the scan streamer
#[allow(non_snake_case)]
pub mod MS_CV_ACCESSIONS {
    /// MS level
    pub const MS_LEVEL: &str = "MS:1000511";

    /// Vendor filter string
    pub const FILTER_STRING: &str = "MS:1000512";

    /// Scan start time
    pub const SCAN_START_TIME: &str = "MS:1000016";

    // Precursor ion

    /// Selected ion m/z
    pub const SELECTED_ION_MZ: &str = "MS:1000744";

    /// Peak intensity of the selected ion
    pub const PEAK_INTENSITY: &str = "MS:1000042";

    /// Charge state of the selected ion
    pub const CHARGE_STATE: &str = "MS:1000041";

    // Binary data arrays

    /// 32-bit float
    pub const FLOAT_32_BIT: &str = "MS:1000521";

    /// 64-bit float
    pub const FLOAT_64_BIT: &str = "MS:1000523";

    /// No compression
    pub const NO_COMPRESSION: &str = "MS:1000576";

    /// zlib compression
    pub const ZLIB_COMPRESSION: &str = "MS:1000574";

    /// MS-Numpress linear, positive-integer and short-logged-float compression
    pub const NUMPRESS: [&str; 3] = ["MS:1002312", "MS:1002313", "MS:1002314"];

    /// m/z array
    pub const MZ_ARRAY: &str = "MS:1000514";

    /// Intensity array
    pub const INTENSITY_ARRAY: &str = "MS:1000515";

    // Units

    /// Second
    pub const UNIT_SECOND: &str = "UO:0000010";

    /// Minute
    pub const UNIT_MINUTE: &str = "UO:0000031";

    /// Millisecond
    pub const UNIT_MILLISECOND: &str = "UO:0000028";
}

/// Convert a scan start time to minutes.
///
/// A time without unit is taken as minutes, the msconvert convention.
pub fn retention_time_in_minutes(value: f64, unit_accession: Option<&str>) -> f64 {
    match unit_accession {
        Some(MS_CV_ACCESSIONS::UNIT_SECOND) => value / 60.0,
        Some(MS_CV_ACCESSIONS::UNIT_MILLISECOND) => value / 60_000.0,
        _ => value,
    }
}
