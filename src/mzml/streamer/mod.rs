//! Streaming mzML scan reader built on quick-xml.
//!
//! Only the parts of each `<spectrum>` needed to build MGF records are kept:
//! MS level, native id, first scan start time, filter string, selected ions,
//! and the m/z and intensity arrays. Everything before `<spectrumList>` is
//! skipped without being interpreted.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

pub use error::MzMLError;
pub use scan::{ScanEntry, SelectedIon};

mod error;
mod helpers;
mod scan;


/// Read buffer used by [`MzMLStreamer::open`]
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Header,
    SpectrumList,
    Done,
}

/// Pull parser over the spectra of an mzML document
pub struct MzMLStreamer<R: BufRead> {
    reader: Reader<R>,
    state: StreamState,
    spectrum_count: Option<usize>,
    next_index: usize,
}

impl MzMLStreamer<BufReader<File>> {
    /// Open an mzML (or indexedmzML) file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(
            DEFAULT_INPUT_BUFFER_SIZE,
            file,
        )))
    }
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Create a new streamer from a BufRead source
    pub fn new(reader: R) -> Self {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        Self {
            reader: xml_reader,
            state: StreamState::Header,
            spectrum_count: None,
            next_index: 0,
        }
    }

    /// `count` attribute of `<spectrumList>`, known once the first entry was requested
    pub fn spectrum_count(&self) -> Option<usize> {
        self.spectrum_count
    }

    /// Iterate over all remaining scan entries
    pub fn entries(self) -> ScanEntries<R> {
        ScanEntries {
            streamer: self,
            failed: false,
        }
    }

    fn skip_to_spectrum_list(&mut self) -> Result<(), MzMLError> {
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(ref e) if e.name().as_ref() == b"spectrumList" => {
                    self.spectrum_count =
                        helpers::get_attribute(e, "count")?.and_then(|s| s.parse().ok());
                    self.state = StreamState::SpectrumList;
                    return Ok(());
                }
                Event::Eof => {
                    self.state = StreamState::Done;
                    return Ok(());
                }
                _ => {}
            }
            buf.clear();
        }
    }

    /// Read the next scan entry, or `None` after the last one
    pub fn next_entry(&mut self) -> Result<Option<ScanEntry>, MzMLError> {
        if self.state == StreamState::Header {
            self.skip_to_spectrum_list()?;
        }
        if self.state == StreamState::Done {
            return Ok(None);
        }

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(ref e) if e.name().as_ref() == b"spectrum" => {
                    let entry = self.parse_scan(e)?;
                    self.next_index += 1;
                    return Ok(Some(entry));
                }
                Event::Empty(ref e) if e.name().as_ref() == b"spectrum" => {
                    let entry = self.empty_scan(e)?;
                    self.next_index += 1;
                    return Ok(Some(entry));
                }
                Event::End(ref e) if e.name().as_ref() == b"spectrumList" => {
                    self.state = StreamState::Done;
                    return Ok(None);
                }
                Event::Eof => {
                    self.state = StreamState::Done;
                    return Ok(None);
                }
                _ => {}
            }
            buf.clear();
        }
    }
}

/// Iterator over the scan entries of an mzML document.
///
/// Stops after the first error.
pub struct ScanEntries<R: BufRead> {
    streamer: MzMLStreamer<R>,
    failed: bool,
}

impl<R: BufRead> Iterator for ScanEntries<R> {
    type Item = Result<ScanEntry, MzMLError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.streamer.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
