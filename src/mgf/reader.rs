//! Streaming MGF decoder.
//!
//! The decoder is a two-state machine: outside a block (`idle`) it ignores
//! everything except `BEGIN IONS`; inside a block it accumulates fields and
//! peaks into a [`BlockAccumulator`] that is created fresh for every block and
//! consumed by `END IONS`.
//!
//! Lines are split on `\n` as well as on bare `\r`, so files written with
//! `\r`-joined peak lists are read correctly.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use super::MgfError;
use crate::spectrum::{Peak, SpectrumRecord, UNKNOWN_PRECURSOR_INTENSITY};

fn charge_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)\s*([+-])?").expect("This is valid regex"))
}

/// Fields and peaks collected between `BEGIN IONS` and `END IONS`
#[derive(Debug)]
struct BlockAccumulator {
    start_line: usize,
    title: Option<String>,
    retention_time: Option<f64>,
    precursor: Option<(f64, f64)>,
    charge: Option<i32>,
    peaks: Vec<Peak>,
    peak_charges: Vec<String>,
}

impl BlockAccumulator {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            title: None,
            retention_time: None,
            precursor: None,
            charge: None,
            peaks: Vec::new(),
            peak_charges: Vec::new(),
        }
    }

    fn finish(mut self, line: usize) -> Result<SpectrumRecord, MgfError> {
        if self.peak_charges.iter().all(String::is_empty) {
            self.peak_charges.clear();
        }
        let title = self.title.ok_or(MgfError::MissingField {
            line,
            field: "TITLE",
        })?;
        let (precursor_mass, precursor_intensity) = self.precursor.ok_or(MgfError::MissingField {
            line,
            field: "PEPMASS",
        })?;

        SpectrumRecord::new(
            title,
            self.retention_time.unwrap_or(0.0),
            precursor_mass,
            precursor_intensity,
            self.charge.unwrap_or(0),
            self.peaks,
        )
        .and_then(|spectrum| spectrum.with_peak_charges(self.peak_charges))
        .map_err(|source| MgfError::InvalidSpectrum { line, source })
    }
}

fn parse_number(value: &str, line: usize, field: &str) -> Result<f64, MgfError> {
    value
        .trim()
        .parse()
        .map_err(|_| MgfError::parse(line, format!("{field} value {value:?} is not a number")))
}

/// Parse the value of a `CHARGE=` line (`2+`, `3`, `2-`, `2+ and 3+`).
///
/// Only the leading charge is used. Values that do not start with a digit
/// are rejected.
pub(crate) fn parse_charge(value: &str, line: usize) -> Result<i32, MgfError> {
    let caps = charge_pattern()
        .captures(value.trim())
        .ok_or_else(|| MgfError::parse(line, format!("CHARGE value {value:?} has no leading digit")))?;

    let magnitude: i32 = caps[1]
        .parse()
        .map_err(|_| MgfError::parse(line, format!("CHARGE value {value:?} is out of range")))?;

    match caps.get(2).map(|m| m.as_str()) {
        Some("-") => Ok(-magnitude),
        _ => Ok(magnitude),
    }
}

/// Lazy, single-pass MGF decoder
pub struct MgfReader<R: BufRead> {
    reader: R,
    track_peak_charges: bool,
    line_number: usize,
    buf: String,
    pending: VecDeque<String>,
    block: Option<BlockAccumulator>,
}

impl MgfReader<BufReader<File>> {
    /// Open an MGF file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MgfError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> MgfReader<R> {
    /// Create a decoder over a BufRead source
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            track_peak_charges: false,
            line_number: 0,
            buf: String::new(),
            pending: VecDeque::new(),
            block: None,
        }
    }

    /// Keep the optional third column of peak lines as per-peak charge
    pub fn with_peak_charges(mut self, track: bool) -> Self {
        self.track_peak_charges = track;
        self
    }

    /// Number of physical lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Iterate over all remaining spectra
    pub fn spectra(self) -> MgfSpectra<R> {
        MgfSpectra {
            reader: self,
            failed: false,
        }
    }

    /// Decode the next complete spectrum.
    ///
    /// Returns `Ok(None)` at end of input. A block that is still open at end
    /// of input is dropped.
    pub fn next_spectrum(&mut self) -> Result<Option<SpectrumRecord>, MgfError> {
        loop {
            let Some(line) = self.next_line()? else {
                if let Some(block) = self.block.take() {
                    warn!(
                        "Dropping unterminated MGF block starting at line {}",
                        block.start_line
                    );
                }
                return Ok(None);
            };

            if let Some(spectrum) = self.step(&line)? {
                return Ok(Some(spectrum));
            }
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, MgfError> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }

            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            self.pending.extend(
                self.buf
                    .split(['\r', '\n'])
                    .map(str::trim)
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string),
            );
        }
    }

    fn step(&mut self, line: &str) -> Result<Option<SpectrumRecord>, MgfError> {
        let line_number = self.line_number;

        if line.starts_with("BEGIN IONS") {
            if let Some(previous) = self.block.replace(BlockAccumulator::new(line_number)) {
                warn!(
                    "MGF block starting at line {} has no END IONS, dropped at line {}",
                    previous.start_line, line_number
                );
            }
            return Ok(None);
        }

        let Some(block) = self.block.as_mut() else {
            if line.contains('=') {
                debug!("Ignoring parameter outside of a block at line {line_number}: {line}");
            }
            return Ok(None);
        };

        if let Some(value) = line.strip_prefix("TITLE=") {
            block.title = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("RTINSECONDS=") {
            block.retention_time = Some(parse_number(value, line_number, "RTINSECONDS")?);
        } else if let Some(value) = line.strip_prefix("PEPMASS=") {
            let mut tokens = value.split_whitespace();
            let mass = tokens
                .next()
                .ok_or_else(|| MgfError::parse(line_number, "PEPMASS has no value"))
                .and_then(|token| parse_number(token, line_number, "PEPMASS"))?;
            let intensity = tokens
                .next()
                .map(|token| parse_number(token, line_number, "PEPMASS intensity"))
                .transpose()?
                .unwrap_or(UNKNOWN_PRECURSOR_INTENSITY);
            block.precursor = Some((mass, intensity));
        } else if let Some(value) = line.strip_prefix("CHARGE=") {
            block.charge = Some(parse_charge(value, line_number)?);
        } else if line.contains('=') {
            debug!("Unhandled MGF parameter at line {line_number}: {line}");
        } else if line.starts_with("END IONS") {
            if let Some(block) = self.block.take() {
                return block.finish(line_number).map(Some);
            }
        } else {
            let mut tokens = line.split_whitespace();
            let (Some(mz), Some(intensity)) = (tokens.next(), tokens.next()) else {
                return Err(MgfError::parse(
                    line_number,
                    format!("peak line {line:?} needs mass and intensity"),
                ));
            };
            block.peaks.push(Peak::new(
                parse_number(mz, line_number, "peak mass")?,
                parse_number(intensity, line_number, "peak intensity")?,
            ));
            if self.track_peak_charges {
                // unannotated peaks get an empty placeholder
                block
                    .peak_charges
                    .push(tokens.next().unwrap_or_default().to_string());
            }
        }

        Ok(None)
    }
}

/// Iterator over the spectra of an MGF stream.
///
/// Stops after the first error.
pub struct MgfSpectra<R: BufRead> {
    reader: MgfReader<R>,
    failed: bool,
}

impl<R: BufRead> Iterator for MgfSpectra<R> {
    type Item = Result<SpectrumRecord, MgfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_spectrum() {
            Ok(Some(spectrum)) => Some(Ok(spectrum)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
