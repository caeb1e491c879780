use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
#[cfg(feature = "colorized_output")]
use console::style;
use serde::Serialize;

use crate::classify::FragmentationMethod;
use crate::mgf::MgfWriterStats;
use crate::mzml::AdapterStats;

/// How the input reached the MGF stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// The converter ran in this batch
    Converted,
    /// Output from an earlier run was reused
    Skipped,
    /// The input was already mzML or MGF
    NotNeeded,
}

/// One MGF file written for an input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputFile {
    pub path: PathBuf,
    /// `None` for normalized output that was not split by method
    pub method: Option<FragmentationMethod>,
    #[serde(flatten)]
    pub stats: MgfWriterStats,
}

/// Result of a successfully processed input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFile {
    pub conversion: ConversionStatus,
    pub outputs: Vec<OutputFile>,
    /// Present when the input went through the mzML adapter
    pub adapter: Option<AdapterStats>,
}

impl ProcessedFile {
    pub fn spectra_written(&self) -> usize {
        self.outputs.iter().map(|o| o.stats.spectra_written).sum()
    }
}

/// Outcome for one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Succeeded(ProcessedFile),
    Failed { error: String },
}

/// Report line for one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
    pub duration_ms: u64,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FileOutcome::Succeeded(_))
    }
}

/// Summary of a batch run, in input order
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outdir: PathBuf,
    pub workers: usize,
    pub files: Vec<FileReport>,
}

impl BatchSummary {
    pub(crate) fn new(outdir: &Path, workers: usize) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            outdir: outdir.to_path_buf(),
            workers,
            files: Vec::new(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.files.len() - self.success_count()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Number of inputs whose conversion was reused from an earlier run
    pub fn skipped_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| {
                matches!(
                    &f.outcome,
                    FileOutcome::Succeeded(p) if p.conversion == ConversionStatus::Skipped
                )
            })
            .count()
    }

    pub fn spectra_written(&self) -> usize {
        self.files
            .iter()
            .filter_map(|f| match &f.outcome {
                FileOutcome::Succeeded(p) => Some(p.spectra_written()),
                FileOutcome::Failed { .. } => None,
            })
            .sum()
    }

    /// Serialize the summary as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Format the summary with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("ms2prep Batch Summary").bold().cyan()));
            output.push_str(&format!("{}\n", style("=====================").cyan()));
            output.push_str(&format!(
                "{}: {}\n\n",
                style("Output").bold(),
                self.outdir.display()
            ));

            for file in &self.files {
                match &file.outcome {
                    FileOutcome::Succeeded(processed) => {
                        output.push_str(&format!(
                            "[{}] {} - {} spectra in {} files{}\n",
                            OK,
                            style(file.input.display()).green(),
                            processed.spectra_written(),
                            processed.outputs.len(),
                            conversion_note(processed.conversion)
                        ));
                    }
                    FileOutcome::Failed { error } => {
                        output.push_str(&format!(
                            "[{}] {} - {}: {}\n",
                            FAIL,
                            style(file.input.display()).red(),
                            style("FAILED").red().bold(),
                            error
                        ));
                    }
                }
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} succeeded, {} failed, {} spectra written\n",
                style("Summary").bold(),
                style(self.success_count()).green(),
                style(self.failure_count()).red(),
                self.spectra_written()
            ));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

fn conversion_note(status: ConversionStatus) -> &'static str {
    match status {
        ConversionStatus::Skipped => " (conversion skipped)",
        ConversionStatus::Converted | ConversionStatus::NotNeeded => "",
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ms2prep Batch Summary")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Output: {}", self.outdir.display())?;
        writeln!(f)?;

        for file in &self.files {
            match &file.outcome {
                FileOutcome::Succeeded(processed) => writeln!(
                    f,
                    "[✓] {} - {} spectra in {} files{}",
                    file.input.display(),
                    processed.spectra_written(),
                    processed.outputs.len(),
                    conversion_note(processed.conversion)
                )?,
                FileOutcome::Failed { error } => {
                    writeln!(f, "[✗] {} - FAILED: {}", file.input.display(), error)?
                }
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} succeeded, {} failed, {} spectra written",
            self.success_count(),
            self.failure_count(),
            self.spectra_written()
        )
    }
}
