use super::*;
use crate::relaxation::IsotopeRelaxation;
use crate::spectrum::{Peak, SpectrumRecord, UNKNOWN_PRECURSOR_INTENSITY};
use proptest::prelude::*;
use std::io::Cursor;
use tempfile::tempdir;

fn encode(spectra: &[SpectrumRecord], config: MgfWriterConfig) -> String {
    let mut buf = Vec::new();
    let mut writer = MgfWriter::new(&mut buf, config);
    writer.write_all(spectra).unwrap();
    writer.finish().unwrap();
    String::from_utf8(buf).unwrap()
}

fn decode(text: &str) -> Vec<SpectrumRecord> {
    MgfReader::new(Cursor::new(text.to_string()))
        .spectra()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn sample() -> SpectrumRecord {
    SpectrumRecord::new(
        "run01 controllerType=0 controllerNumber=1 scan=42",
        1804.25,
        652.3341,
        12000.5,
        2,
        vec![
            Peak::new(100.5, 200.0),
            Peak::new(150.0, 0.0),
            Peak::new(250.25, 10.0),
        ],
    )
    .unwrap()
}

// ==================== Encoder Layout ====================

#[test]
fn test_encoded_layout() {
    let text = encode(&[sample()], MgfWriterConfig::default());
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "MASS=Monoisotopic",
            "BEGIN IONS",
            "TITLE=run01 controllerType=0 controllerNumber=1 scan=42",
            "PEPMASS=652.3341 12000.5",
            "CHARGE=2+",
            "RTINSECONDS=1804.25",
            "100.5 200",
            "250.25 10",
            "END IONS",
        ]
    );
}

#[test]
fn test_header_written_for_empty_output() {
    let text = encode(&[], MgfWriterConfig::default());
    assert_eq!(text, "MASS=Monoisotopic\n");

    let config = MgfWriterConfig {
        write_mass_header: false,
        ..MgfWriterConfig::default()
    };
    assert!(encode(&[], config).is_empty());
}

#[test]
fn test_unknown_charge_and_intensity_omitted() {
    let spectrum =
        SpectrumRecord::new("a", 1.0, 400.0, UNKNOWN_PRECURSOR_INTENSITY, 0, vec![Peak::new(1.0, 1.0)])
            .unwrap();
    let text = encode(&[spectrum], MgfWriterConfig::default());
    assert!(text.contains("PEPMASS=400\n"));
    assert!(!text.contains("CHARGE="));
}

#[test]
fn test_negative_charge_written_with_minus() {
    let spectrum = SpectrumRecord::new("a", 1.0, 400.0, 1.0, -3, Vec::new()).unwrap();
    let text = encode(&[spectrum], MgfWriterConfig::default());
    assert!(text.contains("CHARGE=3-\n"));
    assert_eq!(decode(&text)[0].charge(), -3);
}

// ==================== Round Trips ====================

#[test]
fn test_round_trip_positive_only() {
    let original = sample();
    let decoded = decode(&encode(&[original.clone()], MgfWriterConfig::default()));

    assert_eq!(decoded.len(), 1);
    let spectrum = &decoded[0];
    assert_eq!(spectrum.title(), original.title());
    assert_eq!(spectrum.retention_time(), original.retention_time());
    assert_eq!(spectrum.precursor_mass(), original.precursor_mass());
    assert_eq!(spectrum.precursor_intensity(), original.precursor_intensity());
    assert_eq!(spectrum.charge(), original.charge());
    // zero-intensity peak removed
    assert_eq!(spectrum.peaks(), &[Peak::new(100.5, 200.0), Peak::new(250.25, 10.0)]);
}

#[test]
fn test_round_trip_keep_all_is_identity() {
    let original = sample();
    let config = MgfWriterConfig {
        intensity_policy: IntensityPolicy::KeepAll,
        ..MgfWriterConfig::default()
    };
    let decoded = decode(&encode(&[original.clone()], config));
    assert_eq!(decoded, vec![original]);
}

#[test]
fn test_round_trip_with_peak_charges() {
    let original = SpectrumRecord::new(
        "a",
        3.0,
        500.0,
        10.0,
        2,
        vec![Peak::new(100.0, 1.0), Peak::new(200.0, 2.0)],
    )
    .unwrap()
    .with_peak_charges(vec!["1".into(), "2".into()])
    .unwrap();

    let config = MgfWriterConfig {
        intensity_policy: IntensityPolicy::KeepAll,
        ..MgfWriterConfig::default()
    };
    let text = encode(&[original.clone()], config);
    assert!(text.contains("100 1 1\n"));

    let decoded: Vec<_> = MgfReader::new(Cursor::new(text))
        .with_peak_charges(true)
        .spectra()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded, vec![original]);
}

#[test]
fn test_empty_peak_charge_writes_two_columns() {
    let spectrum = SpectrumRecord::new(
        "a",
        3.0,
        500.0,
        10.0,
        2,
        vec![Peak::new(100.0, 1.0), Peak::new(200.0, 2.0)],
    )
    .unwrap()
    .with_peak_charges(vec!["1".into(), String::new()])
    .unwrap();

    let text = encode(&[spectrum], MgfWriterConfig::default());
    assert!(text.contains("100 1 1\n200 2\n"));
}

// ==================== Relaxation ====================

#[test]
fn test_additional_mz_line() {
    let spectrum = SpectrumRecord::new("a", 1.0, 500.0, 1.0, 2, Vec::new()).unwrap();
    let config = MgfWriterConfig::with_relaxation(IsotopeRelaxation::new(vec![-1, -2]));
    let text = encode(&[spectrum], config);

    let line = text
        .lines()
        .find(|l| l.starts_with("ADDITIONALMZ="))
        .unwrap();
    let values: Vec<f64> = line["ADDITIONALMZ=".len()..]
        .split(';')
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(values.len(), 2);
    assert!((values[0] - 499.498322585).abs() < 1e-6);
    assert!((values[1] - 498.99664517).abs() < 1e-6);

    // the decoder ignores the extra field
    assert_eq!(decode(&text).len(), 1);
}

#[test]
fn test_zero_charge_skips_relaxation() {
    let spectrum = SpectrumRecord::new("a", 1.0, 500.0, 1.0, 0, Vec::new()).unwrap();
    let mut buf = Vec::new();
    let mut writer = MgfWriter::new(
        &mut buf,
        MgfWriterConfig::with_relaxation(IsotopeRelaxation::default()),
    );
    writer.write_spectrum(&spectrum).unwrap();
    let stats = writer.finish().unwrap();

    assert_eq!(stats.spectra_written, 1);
    assert_eq!(stats.relaxation_skipped, 1);
    assert!(!String::from_utf8(buf).unwrap().contains("ADDITIONALMZ"));
}

// ==================== Files ====================

#[test]
fn test_file_round_trip_and_stats() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.mgf");

    let mut writer = MgfWriter::create(&path, MgfWriterConfig::default()).unwrap();
    writer.write_spectrum(&sample()).unwrap();
    writer.write_spectrum(&sample()).unwrap();
    let stats = writer.finish().unwrap();
    assert_eq!(stats.spectra_written, 2);
    assert_eq!(stats.peaks_written, 4);
    assert_eq!(stats.peaks_dropped, 2);

    let spectra: Vec<_> = MgfReader::open(&path)
        .unwrap()
        .spectra()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(spectra.len(), 2);
}

#[test]
fn test_open_missing_file() {
    let dir = tempdir().unwrap();
    let result = MgfReader::open(dir.path().join("missing.mgf"));
    assert!(matches!(result, Err(MgfError::IoError(_))));
}

// ==================== Property Tests ====================

fn arb_spectrum() -> impl Strategy<Value = SpectrumRecord> {
    (
        "[A-Za-z0-9 =_.]{1,40}",
        0.0f64..10_000.0,
        100.0f64..3000.0,
        0.1f64..1e9,
        -6i32..8,
        prop::collection::vec((50.0f64..4000.0, 0.1f64..1e7), 0..40),
    )
        .prop_map(|(title, rt, mz, intensity, charge, peaks)| {
            let peaks = peaks.into_iter().map(Peak::from).collect();
            SpectrumRecord::new(title.trim().to_string() + "x", rt, mz, intensity, charge, peaks)
                .unwrap()
        })
}

proptest! {
    #[test]
    fn prop_keep_all_round_trip(spectra in prop::collection::vec(arb_spectrum(), 0..8)) {
        let config = MgfWriterConfig {
            intensity_policy: IntensityPolicy::KeepAll,
            ..MgfWriterConfig::default()
        };
        let decoded = decode(&encode(&spectra, config));
        prop_assert_eq!(decoded, spectra);
    }
}
