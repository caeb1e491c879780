//! Processing of a single input file, start to finish.
//!
//! ```text
//! raw ──converter──▶ converted/<stem>.mzML ──adapter──▶ <METHOD>_<stem>.mgf ...
//!     └─(no split)─▶ converted/<stem>.mgf  ──decoder──▶ <stem>.mgf
//! <stem>.mzML ───────────────────────────────adapter──▶ <METHOD>_<stem>.mgf ...
//! <stem>.mgf  ───────────────────────────────decoder──▶ <stem>.mgf
//! ```
//!
//! Every MGF is written to a temporary file in the output directory and
//! renamed into place once complete.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::NamedTempFile;

use super::summary::{ConversionStatus, OutputFile, ProcessedFile};
use super::CancellationToken;
use crate::config::{ConfigError, PipelineSettings};
use crate::converter::{ConverterConfig, ConverterError, ExternalConverter, OutputFormat};
use crate::mgf::{MgfError, MgfReader, MgfWriter, MgfWriterStats};
use crate::mzml::{AdapterError, AdapterStats, MzMLAdapter};

/// Subdirectory of the output directory that receives converter output
pub const CONVERTED_DIR: &str = "converted";

/// Errors that fail one input file
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Mgf(#[from] MgfError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Converter(#[from] ConverterError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Several inputs would write the same output files
    #[error("inputs share the stem {stem:?}: {}", display_paths(inputs))]
    StemCollision { stem: String, inputs: Vec<PathBuf> },

    /// The output file would replace the input it is read from
    #[error("output {} is the input file", path.display())]
    OutputIsInput { path: PathBuf },

    #[error("cancelled before processing started")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// What kind of file an input is, judged by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    MzML,
    Mgf,
    /// Anything else; handed to the converter
    Raw,
}

impl InputKind {
    pub fn of(path: &Path) -> Self {
        match path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("mzml") => Self::MzML,
            Some("mgf") => Self::Mgf,
            _ => Self::Raw,
        }
    }
}

/// File stem used in titles and output names: the file name up to its last `.`
pub fn input_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Runs one input through conversion, splitting and encoding
#[derive(Debug, Clone, Default)]
pub struct FilePipeline {
    converter: ExternalConverter,
    settings: PipelineSettings,
}

impl FilePipeline {
    pub fn new(converter: ConverterConfig, settings: PipelineSettings) -> Self {
        Self {
            converter: ExternalConverter::new(converter),
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Process `input` into `outdir`
    pub fn process(
        &self,
        input: &Path,
        outdir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProcessedFile, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        fs::create_dir_all(outdir).map_err(|e| PipelineError::io(outdir, e))?;
        let stem = input_stem(input);

        let (source, conversion) = match InputKind::of(input) {
            InputKind::MzML => ((input.to_path_buf(), OutputFormat::MzML), ConversionStatus::NotNeeded),
            InputKind::Mgf => ((input.to_path_buf(), OutputFormat::Mgf), ConversionStatus::NotNeeded),
            InputKind::Raw => self.convert(input, outdir, cancel)?,
        };

        let (outputs, adapter) = match source {
            (path, OutputFormat::MzML) if self.settings.split_acquisitions => {
                let (outputs, stats) = self.split_mzml(&path, &stem, outdir)?;
                (outputs, Some(stats))
            }
            (path, OutputFormat::MzML) => {
                let (output, stats) = self.merge_mzml(&path, &stem, outdir)?;
                (vec![output], Some(stats))
            }
            (path, OutputFormat::Mgf) => (vec![self.normalize_mgf(&path, &stem, outdir)?], None),
        };

        Ok(ProcessedFile {
            conversion,
            outputs,
            adapter,
        })
    }

    fn convert(
        &self,
        input: &Path,
        outdir: &Path,
        cancel: &CancellationToken,
    ) -> Result<((PathBuf, OutputFormat), ConversionStatus), PipelineError> {
        let converted_dir = outdir.join(CONVERTED_DIR);
        let format = if self.settings.split_acquisitions {
            OutputFormat::MzML
        } else {
            OutputFormat::Mgf
        };
        let expected = ExternalConverter::output_path(input, &converted_dir, format);

        let existing = ExternalConverter::existing_output(input, &converted_dir, format)
            .map_err(|e| PipelineError::io(&converted_dir, e))?;
        match existing {
            Some(path) if path == expected => {
                info!(
                    "Skipping conversion of {}, {} already exists",
                    input.display(),
                    path.display()
                );
                return Ok(((expected, format), ConversionStatus::Skipped));
            }
            Some(path) => warn!(
                "{} exists but is not {} output, converting {} again",
                path.display(),
                format.extension(),
                input.display()
            ),
            None => {}
        }

        let path = self.converter.convert(input, &converted_dir, format, cancel)?;
        Ok(((path, format), ConversionStatus::Converted))
    }

    /// Split an mzML file into one `<METHOD>_<stem>.mgf` per fragmentation method
    pub fn split_mzml(
        &self,
        mzml: &Path,
        stem: &str,
        outdir: &Path,
    ) -> Result<(Vec<OutputFile>, AdapterStats), PipelineError> {
        let adapter = MzMLAdapter::new(self.settings.adapter_config());
        let (bucket, adapter_stats) = adapter.split_file(mzml)?;

        let mut outputs = Vec::new();
        for (method, spectra) in bucket {
            let path = outdir.join(format!("{}_{stem}.mgf", method.label()));
            let stats = self.write_mgf(&path, |writer| Ok(writer.write_all(&spectra)?))?;
            info!("Wrote {} {method} spectra to {}", stats.spectra_written, path.display());
            outputs.push(OutputFile {
                path,
                method: Some(method),
                stats,
            });
        }
        Ok((outputs, adapter_stats))
    }

    /// Classify an mzML file but write every kept spectrum to `<stem>.mgf`
    pub fn merge_mzml(
        &self,
        mzml: &Path,
        stem: &str,
        outdir: &Path,
    ) -> Result<(OutputFile, AdapterStats), PipelineError> {
        let adapter = MzMLAdapter::new(self.settings.adapter_config());
        let (bucket, adapter_stats) = adapter.split_file(mzml)?;

        let path = outdir.join(format!("{stem}.mgf"));
        let records = bucket.into_records();
        let stats = self.write_mgf(&path, |writer| Ok(writer.write_all(&records)?))?;
        Ok((
            OutputFile {
                path,
                method: None,
                stats,
            },
            adapter_stats,
        ))
    }

    /// Re-encode an MGF file as `<stem>.mgf` in `outdir`, applying the writer settings
    pub fn normalize_mgf(
        &self,
        mgf: &Path,
        stem: &str,
        outdir: &Path,
    ) -> Result<OutputFile, PipelineError> {
        let path = outdir.join(format!("{stem}.mgf"));
        if is_same_file(mgf, &path) {
            return Err(PipelineError::OutputIsInput { path });
        }

        let file = File::open(mgf).map_err(|e| PipelineError::io(mgf, e))?;
        let reader =
            MgfReader::new(BufReader::new(file)).with_peak_charges(self.settings.track_peak_charges);
        let stats = self.write_mgf(&path, |writer| {
            for spectrum in reader.spectra() {
                writer.write_spectrum(&spectrum?)?;
            }
            Ok(())
        })?;
        info!("Wrote {} spectra to {}", stats.spectra_written, path.display());

        Ok(OutputFile {
            path,
            method: None,
            stats,
        })
    }

    fn write_mgf<F>(&self, path: &Path, fill: F) -> Result<MgfWriterStats, PipelineError>
    where
        F: FnOnce(&mut MgfWriter<BufWriter<&mut File>>) -> Result<(), PipelineError>,
    {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;

        let stats = {
            let mut writer = MgfWriter::new(
                BufWriter::new(tmp.as_file_mut()),
                self.settings.writer_config(),
            );
            fill(&mut writer)?;
            writer.finish()?
        };

        tmp.persist(path)
            .map_err(|e| PipelineError::io(path, e.error))?;
        Ok(stats)
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FragmentationMethod;
    use crate::mgf::IntensityPolicy;
    use tempfile::tempdir;

    const RUN01: &str = include_str!("../../tests/fixtures/run01.mzML");

    const SIMPLE_MGF: &str = "BEGIN IONS
TITLE=sample scan=1
PEPMASS=500.0 10
CHARGE=2+
RTINSECONDS=12
100 0
200 5
END IONS
";

    fn pipeline(settings: PipelineSettings) -> FilePipeline {
        FilePipeline::new(ConverterConfig::default(), settings)
    }

    fn read(path: &Path) -> Vec<crate::spectrum::SpectrumRecord> {
        MgfReader::open(path)
            .unwrap()
            .spectra()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_input_kind() {
        assert_eq!(InputKind::of(Path::new("a.mzML")), InputKind::MzML);
        assert_eq!(InputKind::of(Path::new("a.MZML")), InputKind::MzML);
        assert_eq!(InputKind::of(Path::new("a.mgf")), InputKind::Mgf);
        assert_eq!(InputKind::of(Path::new("a.raw")), InputKind::Raw);
        assert_eq!(InputKind::of(Path::new("a")), InputKind::Raw);
        assert_eq!(input_stem(Path::new("/x/run.01.raw")), "run.01");
    }

    #[test]
    fn test_split_mzml_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("run01.mzML");
        fs::write(&input, RUN01).unwrap();
        let outdir = dir.path().join("processed");

        let processed = pipeline(PipelineSettings::default())
            .process(&input, &outdir, &CancellationToken::new())
            .unwrap();

        assert_eq!(processed.conversion, ConversionStatus::NotNeeded);
        let names: Vec<_> = processed
            .outputs
            .iter()
            .map(|o| o.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["CID_run01.mgf", "HCD_run01.mgf", "EThcD_run01.mgf", "unknown_run01.mgf"]
        );

        let hcd = read(&outdir.join("HCD_run01.mgf"));
        assert_eq!(hcd.len(), 1);
        // zero-intensity peak dropped by the default policy
        assert_eq!(hcd[0].peak_count(), 2);
        let text = fs::read_to_string(outdir.join("HCD_run01.mgf")).unwrap();
        assert!(text.starts_with("MASS=Monoisotopic\n"));
    }

    #[test]
    fn test_merge_mzml_when_not_splitting() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("run01.mzML");
        fs::write(&input, RUN01).unwrap();

        let settings = PipelineSettings {
            split_acquisitions: false,
            ..PipelineSettings::default()
        };
        let processed = pipeline(settings)
            .process(&input, dir.path(), &CancellationToken::new())
            .unwrap();
        assert_eq!(processed.outputs.len(), 1);
        assert_eq!(processed.outputs[0].method, None);
        assert_eq!(read(&dir.path().join("run01.mgf")).len(), 4);
    }

    #[test]
    fn test_normalize_mgf_with_relaxation() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.mgf");
        fs::write(&input, SIMPLE_MGF).unwrap();
        let outdir = dir.path().join("out");

        let settings = PipelineSettings {
            relaxation: vec![-1],
            intensity_policy: IntensityPolicy::KeepAll,
            ..PipelineSettings::default()
        };
        let processed = pipeline(settings)
            .process(&input, &outdir, &CancellationToken::new())
            .unwrap();
        assert!(processed.adapter.is_none());

        let text = fs::read_to_string(outdir.join("sample.mgf")).unwrap();
        assert!(text.contains("ADDITIONALMZ="));
        assert!(text.contains("100 0\n"));
    }

    #[test]
    fn test_mgf_output_must_not_replace_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.mgf");
        fs::write(&input, SIMPLE_MGF).unwrap();

        let result = pipeline(PipelineSettings::default()).process(
            &input,
            dir.path(),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(PipelineError::OutputIsInput { .. })));
        assert_eq!(fs::read_to_string(&input).unwrap(), SIMPLE_MGF);
    }

    #[test]
    fn test_failed_decode_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("broken.mgf");
        fs::write(&input, "BEGIN IONS\nTITLE=a\nPEPMASS=abc\nEND IONS\n").unwrap();
        let outdir = dir.path().join("out");

        let result = pipeline(PipelineSettings::default()).process(
            &input,
            &outdir,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(PipelineError::Mgf(MgfError::Parse { .. }))));
        assert_eq!(fs::read_dir(&outdir).unwrap().count(), 0);
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pipeline(PipelineSettings::default()).process(
            &dir.path().join("run01.mzML"),
            dir.path(),
            &cancel,
        );
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[test]
    fn test_skips_existing_conversion() {
        let dir = tempdir().unwrap();
        let outdir = dir.path().join("processed");
        let converted = outdir.join(CONVERTED_DIR);
        fs::create_dir_all(&converted).unwrap();
        fs::write(converted.join("run01.mzML"), RUN01).unwrap();

        // the converter executable does not exist, so any invocation would fail
        let pipeline = FilePipeline::new(
            ConverterConfig {
                executable: PathBuf::from("/nonexistent/msconvert"),
                ..ConverterConfig::default()
            },
            PipelineSettings::default(),
        );
        let processed = pipeline
            .process(&dir.path().join("run01.raw"), &outdir, &CancellationToken::new())
            .unwrap();
        assert_eq!(processed.conversion, ConversionStatus::Skipped);
        assert!(processed
            .outputs
            .iter()
            .any(|o| o.method == Some(FragmentationMethod::CID)));
    }

    #[test]
    fn test_skips_conversion_when_both_formats_exist() {
        let dir = tempdir().unwrap();
        let outdir = dir.path().join("processed");
        let converted = outdir.join(CONVERTED_DIR);
        fs::create_dir_all(&converted).unwrap();
        fs::write(converted.join("run01.mzML"), RUN01).unwrap();
        fs::write(
            converted.join("run01.mgf"),
            "BEGIN IONS\nTITLE=run01 scan=2\nPEPMASS=652.33\nCHARGE=2+\n150 10\nEND IONS\n",
        )
        .unwrap();

        for split_acquisitions in [true, false] {
            let pipeline = FilePipeline::new(
                ConverterConfig {
                    executable: PathBuf::from("/nonexistent/msconvert"),
                    ..ConverterConfig::default()
                },
                PipelineSettings {
                    split_acquisitions,
                    ..PipelineSettings::default()
                },
            );
            let processed = pipeline
                .process(&dir.path().join("run01.raw"), &outdir, &CancellationToken::new())
                .unwrap();
            assert_eq!(processed.conversion, ConversionStatus::Skipped);
        }
    }
}
