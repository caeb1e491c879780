/// Errors that can occur during mzML parsing
#[derive(Debug, thiserror::Error)]
pub enum MzMLError {
    /// Error parsing XML
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Attribute value is not valid UTF-8
    #[error("Invalid UTF-8 in attribute: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error decoding binary data arrays
    #[error("Binary decode error in spectrum {id}: {source}")]
    BinaryError {
        /// Native id of the spectrum
        id: String,
        /// Decoder failure
        #[source]
        source: crate::mzml::binary::BinaryDecodeError,
    },

    /// Invalid mzML document structure
    #[error("Invalid mzML structure: {0}")]
    InvalidStructure(String),
}
