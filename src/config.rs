//! TOML configuration.
//!
//! ```toml
//! # ms2prep.toml
//! [converter]
//! executable = "C:/ProteoWizard/msconvert.exe"
//! filters = ["MS2Denoise 20 100 false"]
//! timeout_secs = 3600
//! max_retries = 1
//!
//! [pipeline]
//! split_acquisitions = true
//! detector = "FT"
//! unknown_policy = "retain"
//! intensity_policy = "positive_only"
//! relaxation = [-1, -2, -3]
//! track_peak_charges = false
//!
//! [batch]
//! workers = 4
//! ```
//!
//! Every table and key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::{DetectorFilter, UnknownPolicy};
use crate::converter::ConverterConfig;
use crate::mgf::{IntensityPolicy, MgfWriterConfig};
use crate::mzml::AdapterConfig;
use crate::relaxation::IsotopeRelaxation;

/// Errors raised while loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root of `ms2prep.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub converter: ConverterConfig,
    pub pipeline: PipelineSettings,
    pub batch: BatchSettings,
}

/// Per-file processing settings (`[pipeline]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Convert to mzML and split by fragmentation method; otherwise convert
    /// straight to MGF and only normalize it
    pub split_acquisitions: bool,
    pub detector: DetectorFilter,
    pub unknown_policy: UnknownPolicy,
    pub intensity_policy: IntensityPolicy,
    /// Isotope offsets written as `ADDITIONALMZ`; empty disables relaxation
    pub relaxation: Vec<i32>,
    /// Keep the third column of MGF peak lines
    pub track_peak_charges: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            split_acquisitions: true,
            detector: DetectorFilter::All,
            unknown_policy: UnknownPolicy::Retain,
            intensity_policy: IntensityPolicy::PositiveOnly,
            relaxation: Vec::new(),
            track_peak_charges: false,
        }
    }
}

impl PipelineSettings {
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            detector: self.detector,
            unknown_policy: self.unknown_policy,
        }
    }

    pub fn relaxation(&self) -> Option<IsotopeRelaxation> {
        (!self.relaxation.is_empty()).then(|| IsotopeRelaxation::new(self.relaxation.clone()))
    }

    pub fn writer_config(&self) -> MgfWriterConfig {
        MgfWriterConfig {
            intensity_policy: self.intensity_policy,
            relaxation: self.relaxation(),
            write_mass_header: true,
        }
    }
}

/// Worker pool settings (`[batch]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub workers: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { workers: 2 }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.workers == 0 {
            return Err(ConfigError::Invalid("batch.workers must be at least 1".into()));
        }
        if self.converter.executable.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("converter.executable is empty".into()));
        }
        Ok(())
    }
}
