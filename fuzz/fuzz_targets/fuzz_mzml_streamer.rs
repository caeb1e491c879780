#![no_main]

use libfuzzer_sys::fuzz_target;
use ms2prep::mzml::{MzMLAdapter, MzMLStreamer};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Malformed input must end in an error, never a panic
    let streamer = MzMLStreamer::new(Cursor::new(data));
    for entry in streamer.entries().take(100) {
        if entry.is_err() {
            break;
        }
    }

    let _ = MzMLAdapter::default().split("fuzz", MzMLStreamer::new(Cursor::new(data)).entries());
});
