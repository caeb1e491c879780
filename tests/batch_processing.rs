//! End-to-end batch runs over temporary directories.
//!
//! Raw inputs are handled by a fake converter, a shell script that copies a
//! fixture into the requested output directory and counts its invocations.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ms2prep::batch::{BatchOrchestrator, BatchSummary, ConversionStatus, FileOutcome};
use ms2prep::config::PipelineConfig;
use ms2prep::mgf::MgfReader;
use tempfile::tempdir;

const RUN01: &str = include_str!("fixtures/run01.mzML");

fn config(workers: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.batch.workers = workers;
    config
}

/// File name → content of every MGF file in `dir`
fn mgf_outputs(dir: &Path) -> BTreeMap<String, String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "mgf"))
        .map(|p| {
            (
                p.file_name().unwrap().to_string_lossy().into_owned(),
                fs::read_to_string(&p).unwrap(),
            )
        })
        .collect()
}

fn error_of(summary: &BatchSummary, name: &str) -> String {
    let report = summary
        .files
        .iter()
        .find(|f| f.input.file_name().unwrap() == name)
        .unwrap();
    match &report.outcome {
        FileOutcome::Failed { error } => error.clone(),
        FileOutcome::Succeeded(_) => panic!("{name} unexpectedly succeeded"),
    }
}

#[test]
fn test_directory_of_mzml_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("run01.mzML"), RUN01).unwrap();
    fs::write(dir.path().join("run02.mzML"), RUN01).unwrap();

    let summary = BatchOrchestrator::new(config(2)).run(dir.path(), None).unwrap();
    assert_eq!(summary.success_count(), 2);
    assert_eq!(summary.outdir, dir.path().join("processed"));

    let outputs = mgf_outputs(&dir.path().join("processed"));
    assert_eq!(outputs.len(), 8);
    assert!(outputs.contains_key("HCD_run02.mgf"));

    let hcd = MgfReader::open(dir.path().join("processed/HCD_run01.mgf"))
        .unwrap()
        .spectra()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(hcd.len(), 1);
    assert_eq!(hcd[0].title(), "run01 controllerType=0 controllerNumber=1 scan=2");
    assert_eq!(hcd[0].retention_time(), 1830.0);
}

#[test]
fn test_worker_count_does_not_change_outputs() {
    let input = tempdir().unwrap();
    for name in ["a.mzML", "b.mzML", "c.mzML"] {
        fs::write(input.path().join(name), RUN01).unwrap();
    }
    let out1 = input.path().join("out1");
    let out2 = input.path().join("out2");

    let mut config = config(1);
    config.pipeline.relaxation = vec![-1, -2];
    let one = BatchOrchestrator::new(config.clone())
        .run(input.path(), Some(&out1))
        .unwrap();
    config.batch.workers = 2;
    let two = BatchOrchestrator::new(config)
        .run(input.path(), Some(&out2))
        .unwrap();

    assert_eq!(mgf_outputs(&out1), mgf_outputs(&out2));
    let order = |s: &BatchSummary| s.files.iter().map(|f| f.input.clone()).collect::<Vec<_>>();
    assert_eq!(order(&one), order(&two));
}

#[test]
fn test_failing_file_does_not_stop_siblings() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("good.mzML"), RUN01).unwrap();
    fs::write(
        dir.path().join("broken.mzML"),
        RUN01.replace("ITMS + c NSI", "Q1MS + c NSI"),
    )
    .unwrap();

    let outdir = dir.path().join("out");
    let summary = BatchOrchestrator::new(config(2))
        .run(dir.path(), Some(&outdir))
        .unwrap();

    assert_eq!(summary.success_count(), 1);
    assert_eq!(summary.failure_count(), 1);
    assert!(error_of(&summary, "broken.mzML").contains("Q1MS"));
    // nothing written for the broken file
    assert!(mgf_outputs(&outdir).keys().all(|name| name.ends_with("_good.mgf")));
}

#[test]
fn test_stem_collision_fails_colliding_inputs_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mzML"), RUN01).unwrap();
    fs::write(dir.path().join("a.raw"), "").unwrap();
    fs::write(dir.path().join("b.mzML"), RUN01).unwrap();

    let summary = BatchOrchestrator::new(config(2))
        .run(dir.path(), Some(&dir.path().join("out")))
        .unwrap();

    assert_eq!(summary.failure_count(), 2);
    assert!(error_of(&summary, "a.mzML").contains("share the stem"));
    assert!(error_of(&summary, "a.raw").contains("share the stem"));
    assert_eq!(summary.success_count(), 1);
}

#[test]
fn test_json_report_lists_outputs() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("run01.mzML"), RUN01).unwrap();

    let summary = BatchOrchestrator::new(config(1))
        .run(&dir.path().join("run01.mzML"), None)
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
    let file = &json["files"][0];
    assert_eq!(file["status"], "succeeded");
    assert_eq!(file["conversion"], "not_needed");
    assert_eq!(file["adapter"]["ms2_seen"], 4);
    assert_eq!(file["outputs"].as_array().unwrap().len(), 4);
}

#[cfg(unix)]
mod fake_converter {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const RUN01_MGF: &str = "BEGIN IONS
TITLE=run01 scan=2
PEPMASS=652.3341 12000.5
CHARGE=2+
RTINSECONDS=1830
150.5 10
250.25 0
END IONS
";

    /// Script invoked as `<input> [--mgf] -o <dir> ...`
    fn install(dir: &Path) -> (PathBuf, PathBuf) {
        let fixtures = dir.join("fixtures");
        fs::create_dir_all(&fixtures).unwrap();
        fs::write(fixtures.join("run.mzML"), RUN01).unwrap();
        fs::write(fixtures.join("run.mgf"), RUN01_MGF).unwrap();

        let counter = dir.join("invocations.log");
        let script = dir.join("msconvert.sh");
        fs::write(
            &script,
            format!(
                r#"#!/bin/sh
echo "$1" >> "{counter}"
input="$1"
shift
ext=mzML
if [ "$1" = "--mgf" ]; then ext=mgf; shift; fi
shift
outdir="$1"
name=$(basename "$input")
cp "{fixtures}/run.$ext" "$outdir/${{name%.*}}.$ext"
"#,
                counter = counter.display(),
                fixtures = fixtures.display(),
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        (script, counter)
    }

    fn invocations(counter: &Path) -> usize {
        fs::read_to_string(counter)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[test]
    fn test_rerun_skips_conversion() {
        let tools = tempdir().unwrap();
        let (script, counter) = install(tools.path());

        let input = tempdir().unwrap();
        fs::write(input.path().join("a.raw"), "").unwrap();
        fs::write(input.path().join("b.raw"), "").unwrap();

        let mut config = config(2);
        config.converter.executable = script;

        let first = BatchOrchestrator::new(config.clone()).run(input.path(), None).unwrap();
        assert_eq!(first.success_count(), 2);
        assert_eq!(first.skipped_count(), 0);
        assert_eq!(invocations(&counter), 2);
        let outdir = input.path().join("processed");
        let before = mgf_outputs(&outdir);
        assert!(outdir.join("converted/a.mzML").is_file());

        let second = BatchOrchestrator::new(config).run(input.path(), None).unwrap();
        assert_eq!(second.skipped_count(), 2);
        assert_eq!(invocations(&counter), 2);
        assert_eq!(mgf_outputs(&outdir), before);

        for report in &second.files {
            match &report.outcome {
                FileOutcome::Succeeded(p) => assert_eq!(p.conversion, ConversionStatus::Skipped),
                FileOutcome::Failed { error } => panic!("{error}"),
            }
        }
    }

    #[test]
    fn test_no_split_normalizes_converter_mgf() {
        let tools = tempdir().unwrap();
        let (script, counter) = install(tools.path());

        let input = tempdir().unwrap();
        fs::write(input.path().join("run01.raw"), "").unwrap();

        let mut config = config(1);
        config.converter.executable = script;
        config.pipeline.split_acquisitions = false;
        config.pipeline.relaxation = vec![-1];

        let summary = BatchOrchestrator::new(config).run(input.path(), None).unwrap();
        assert_eq!(summary.success_count(), 1);
        assert_eq!(invocations(&counter), 1);

        let outdir = input.path().join("processed");
        assert!(outdir.join("converted/run01.mgf").is_file());
        let normalized = fs::read_to_string(outdir.join("run01.mgf")).unwrap();
        assert!(normalized.starts_with("MASS=Monoisotopic\n"));
        assert!(normalized.contains("ADDITIONALMZ="));
        assert!(!normalized.contains("250.25 0"));
    }

    #[test]
    fn test_converter_failure_is_reported() {
        let tools = tempdir().unwrap();
        let script = tools.path().join("failing.sh");
        fs::write(&script, "#!/bin/sh\necho 'cannot open file' >&2\nexit 2\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let input = tempdir().unwrap();
        fs::write(input.path().join("x.raw"), "").unwrap();
        fs::write(input.path().join("y.mzML"), RUN01).unwrap();

        let mut config = config(2);
        config.converter.executable = script;
        let summary = BatchOrchestrator::new(config).run(input.path(), None).unwrap();

        assert_eq!(summary.success_count(), 1);
        assert!(error_of(&summary, "x.raw").contains("exited with code 2"));
        assert!(!input.path().join("processed/converted/x.mzML").exists());
    }
}
