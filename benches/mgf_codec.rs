use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ms2prep::mgf::{MgfReader, MgfWriter, MgfWriterConfig};
use ms2prep::relaxation::IsotopeRelaxation;
use ms2prep::spectrum::{Peak, SpectrumRecord};

fn generate_spectra(num_spectra: usize, peaks_per_spectrum: usize) -> Vec<SpectrumRecord> {
    (0..num_spectra)
        .map(|i| {
            let peaks = (0..peaks_per_spectrum)
                .map(|j| Peak::new(100.0 + j as f64 * 10.0 + i as f64 * 0.1, 1000.0 + j as f64))
                .collect();
            SpectrumRecord::new(
                format!("bench scan={}", i + 1),
                i as f64 * 0.5,
                400.0 + (i % 500) as f64,
                1e6,
                2 + (i % 3) as i32,
                peaks,
            )
            .unwrap()
        })
        .collect()
}

fn encode(spectra: &[SpectrumRecord], config: MgfWriterConfig) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = MgfWriter::new(&mut buf, config);
    writer.write_all(spectra).unwrap();
    writer.finish().unwrap();
    buf
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("mgf_decode");

    for num_spectra in [100, 1000] {
        let peaks_per_spectrum = 50;
        let text = encode(
            &generate_spectra(num_spectra, peaks_per_spectrum),
            MgfWriterConfig::default(),
        );

        group.throughput(Throughput::Elements((num_spectra * peaks_per_spectrum) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(num_spectra), &text, |b, text| {
            b.iter(|| {
                let count: usize = MgfReader::new(Cursor::new(text.as_slice()))
                    .spectra()
                    .map(|s| s.unwrap().peak_count())
                    .sum();
                black_box(count);
            });
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("mgf_encode");
    let spectra = generate_spectra(1000, 50);
    group.throughput(Throughput::Elements(spectra.len() as u64));

    group.bench_function("plain", |b| {
        b.iter(|| black_box(encode(&spectra, MgfWriterConfig::default())));
    });
    group.bench_function("relaxed", |b| {
        let config = MgfWriterConfig::with_relaxation(IsotopeRelaxation::new(vec![-1, -2, -3]));
        b.iter(|| black_box(encode(&spectra, config.clone())));
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
