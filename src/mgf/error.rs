use crate::spectrum::SpectrumError;

/// Errors that can occur while reading or writing MGF
#[derive(Debug, thiserror::Error)]
pub enum MgfError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed value in a required field or peak line
    #[error("MGF parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the input
        line: usize,
        /// What could not be parsed
        message: String,
    },

    /// A block ended without a required field
    #[error("MGF block ending at line {line} has no {field}")]
    MissingField {
        /// 1-based line number of the `END IONS` line
        line: usize,
        /// Name of the missing field
        field: &'static str,
    },

    /// The assembled spectrum violates a record invariant
    #[error("invalid spectrum in block ending at line {line}: {source}")]
    InvalidSpectrum {
        /// 1-based line number of the `END IONS` line
        line: usize,
        /// Violated invariant
        #[source]
        source: SpectrumError,
    },
}

impl MgfError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
