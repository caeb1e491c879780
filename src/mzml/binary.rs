//! Binary data array decoding.
//!
//! A `<binaryDataArray>` carries its own format description as cvParams:
//! precision (32/64-bit float), compression (none or zlib) and what the array
//! holds (m/z, intensity, or something this crate does not use). The payload
//! is Base64 text, optionally zlib-compressed, of little-endian floats.

use std::io::Read;

use base64::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

use super::cv_params::MS_CV_ACCESSIONS;

/// Compression of the decoded Base64 payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    /// Raw little-endian floats
    #[default]
    None,
    /// zlib stream
    Zlib,
    /// Any MS-Numpress variant
    Numpress,
}

/// Float precision of the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryEncoding {
    /// 32-bit float (MS:1000521)
    Float32,
    /// 64-bit float (MS:1000523)
    #[default]
    Float64,
}

impl BinaryEncoding {
    /// Bytes per value
    pub fn byte_size(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Content of a binary data array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayKind {
    /// m/z values
    Mz,
    /// Intensity values
    Intensity,
    /// Any other array (charge, time, ion mobility, ...)
    #[default]
    Other,
}

/// Errors that can occur during binary decoding
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Decompression error: {0}")]
    DecompressionError(#[from] std::io::Error),

    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unsupported compression: {0:?}")]
    UnsupportedCompression(CompressionType),
}

/// Format of one binary data array, assembled from its cvParams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryArrayFormat {
    pub encoding: BinaryEncoding,
    pub compression: CompressionType,
    pub kind: ArrayKind,
}

impl BinaryArrayFormat {
    /// Update the format from one cvParam accession; unrelated accessions are ignored
    pub fn apply_accession(&mut self, accession: &str) {
        match accession {
            MS_CV_ACCESSIONS::FLOAT_32_BIT => self.encoding = BinaryEncoding::Float32,
            MS_CV_ACCESSIONS::FLOAT_64_BIT => self.encoding = BinaryEncoding::Float64,
            MS_CV_ACCESSIONS::NO_COMPRESSION => self.compression = CompressionType::None,
            MS_CV_ACCESSIONS::ZLIB_COMPRESSION => self.compression = CompressionType::Zlib,
            a if MS_CV_ACCESSIONS::NUMPRESS.contains(&a) => {
                self.compression = CompressionType::Numpress
            }
            MS_CV_ACCESSIONS::MZ_ARRAY => self.kind = ArrayKind::Mz,
            MS_CV_ACCESSIONS::INTENSITY_ARRAY => self.kind = ArrayKind::Intensity,
            _ => {}
        }
    }

    /// Decode Base64 text in this format.
    ///
    /// `expected_length` is the spectrum's `defaultArrayLength`, checked when given.
    pub fn decode(
        &self,
        base64_data: &str,
        expected_length: Option<usize>,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let trimmed = base64_data.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let raw = BASE64_STANDARD.decode(trimmed)?;
        let bytes = match self.compression {
            CompressionType::None => raw,
            CompressionType::Zlib => {
                let mut inflated = Vec::with_capacity(raw.len() * 2);
                ZlibDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
                inflated
            }
            CompressionType::Numpress => {
                return Err(BinaryDecodeError::UnsupportedCompression(self.compression))
            }
        };

        let values = bytes_to_floats(&bytes, self.encoding)?;
        if let Some(expected) = expected_length {
            if values.len() != expected {
                return Err(BinaryDecodeError::InvalidLength {
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(values)
    }
}

fn bytes_to_floats(bytes: &[u8], encoding: BinaryEncoding) -> Result<Vec<f64>, BinaryDecodeError> {
    let width = encoding.byte_size();
    if bytes.len() % width != 0 {
        return Err(BinaryDecodeError::InvalidLength {
            expected: bytes.len() / width * width,
            actual: bytes.len(),
        });
    }

    let count = bytes.len() / width;
    let mut cursor = std::io::Cursor::new(bytes);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match encoding {
            BinaryEncoding::Float32 => f64::from(cursor.read_f32::<LittleEndian>()?),
            BinaryEncoding::Float64 => cursor.read_f64::<LittleEndian>()?,
        };
        values.push(value);
    }
    Ok(values)
}
