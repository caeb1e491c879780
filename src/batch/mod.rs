//! Batch processing of a directory of acquisitions.
//!
//! [`BatchOrchestrator`] discovers the inputs, rejects inputs whose stems
//! collide and runs the rest through [`FilePipeline`] on a fixed-size
//! worker pool. A failed file is recorded in the [`BatchSummary`] and
//! never stops the others.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ms2prep::batch::BatchOrchestrator;
//! use ms2prep::config::PipelineConfig;
//!
//! let orchestrator = BatchOrchestrator::new(PipelineConfig::default());
//! let summary = orchestrator.run(Path::new("/data/raw"), None)?;
//! println!("{summary}");
//! # Ok::<(), ms2prep::batch::PipelineError>(())
//! ```

mod cancel;
mod pipeline;
mod summary;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use log::{error, info};
use rayon::prelude::*;

pub use cancel::CancellationToken;
pub use pipeline::{input_stem, FilePipeline, InputKind, PipelineError, CONVERTED_DIR};
pub use summary::{
    BatchSummary, ConversionStatus, FileOutcome, FileReport, OutputFile, ProcessedFile,
};

use crate::config::{ConfigError, PipelineConfig};

/// Name of the output directory used when none is given
pub const DEFAULT_OUTDIR_NAME: &str = "processed";

/// Input files of a batch, in sorted order.
///
/// A file is its own batch. For a directory, its regular files are
/// returned; subdirectories are not descended into.
pub fn discover_inputs(input: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let metadata = fs::metadata(input).map_err(|e| PipelineError::io(input, e))?;
    if !metadata.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input).map_err(|e| PipelineError::io(input, e))? {
        let path = entry.map_err(|e| PipelineError::io(input, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// `processed/` next to a file input, or inside a directory input
pub fn default_outdir(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.join(DEFAULT_OUTDIR_NAME)
    } else {
        input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(DEFAULT_OUTDIR_NAME)
    }
}

/// Stems shared by more than one input, with the inputs sharing them
pub fn stem_collisions(files: &[PathBuf]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut by_stem: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        by_stem.entry(input_stem(file)).or_default().push(file.clone());
    }
    by_stem.retain(|_, inputs| inputs.len() > 1);
    by_stem
}

/// Runs a batch of inputs through [`FilePipeline`] in parallel
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    pipeline: FilePipeline,
    workers: usize,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            pipeline: FilePipeline::new(config.converter, config.pipeline),
            workers: config.batch.workers,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process a file or directory. `outdir` defaults to [`default_outdir`].
    pub fn run(&self, input: &Path, outdir: Option<&Path>) -> Result<BatchSummary, PipelineError> {
        let outdir = outdir.map_or_else(|| default_outdir(input), Path::to_path_buf);
        let files = discover_inputs(input)?;
        info!(
            "Found {} input files in {}",
            files.len(),
            input.display()
        );
        self.run_files(&files, &outdir)
    }

    /// Process an explicit list of files into `outdir`
    pub fn run_files(&self, files: &[PathBuf], outdir: &Path) -> Result<BatchSummary, PipelineError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("batch.workers must be at least 1".into()).into());
        }
        fs::create_dir_all(outdir).map_err(|e| PipelineError::io(outdir, e))?;

        let collisions = stem_collisions(files);
        for (stem, inputs) in &collisions {
            error!("{} inputs share the stem {stem:?}, skipping them", inputs.len());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("ms2prep-worker-{i}"))
            .build()?;

        let mut summary = BatchSummary::new(outdir, self.workers);
        summary.files = pool.install(|| {
            files
                .par_iter()
                .map(|input| self.process_one(input, outdir, &collisions))
                .collect()
        });
        summary.finished_at = Utc::now();

        info!(
            "Batch finished: {} succeeded, {} failed, {} conversions skipped, {} spectra written",
            summary.success_count(),
            summary.failure_count(),
            summary.skipped_count(),
            summary.spectra_written()
        );
        Ok(summary)
    }

    fn process_one(
        &self,
        input: &Path,
        outdir: &Path,
        collisions: &BTreeMap<String, Vec<PathBuf>>,
    ) -> FileReport {
        let started = Instant::now();
        let stem = input_stem(input);

        let result = match collisions.get(&stem) {
            Some(inputs) => Err(PipelineError::StemCollision {
                stem,
                inputs: inputs.clone(),
            }),
            None => self.pipeline.process(input, outdir, &self.cancel),
        };

        let outcome = match result {
            Ok(processed) => {
                info!(
                    "Processed {}: {} spectra in {} files",
                    input.display(),
                    processed.spectra_written(),
                    processed.outputs.len()
                );
                FileOutcome::Succeeded(processed)
            }
            Err(e) => {
                error!("Failed to process {}: {e}", input.display());
                FileOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        FileReport {
            input: input.to_path_buf(),
            outcome,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}
