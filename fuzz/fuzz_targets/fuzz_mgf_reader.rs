#![no_main]

use libfuzzer_sys::fuzz_target;
use ms2prep::mgf::{MgfReader, MgfWriter, MgfWriterConfig};
use ms2prep::relaxation::IsotopeRelaxation;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let reader = MgfReader::new(Cursor::new(data)).with_peak_charges(true);
    let config = MgfWriterConfig::with_relaxation(IsotopeRelaxation::new(vec![-1, -2]));
    let mut writer = MgfWriter::new(Vec::new(), config);

    for spectrum in reader.spectra().take(100) {
        match spectrum {
            Ok(spectrum) => {
                let _ = writer.write_spectrum(&spectrum);
            }
            Err(_) => break,
        }
    }
    let _ = writer.finish();
});
