use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};

use super::helpers::{get_attribute, parse_cv_param};
use super::{MzMLError, MzMLStreamer};
use crate::mzml::binary::{ArrayKind, BinaryArrayFormat};
use crate::mzml::cv_params::{retention_time_in_minutes, CvParam, MS_CV_ACCESSIONS};

/// One precursor ion of a scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedIon {
    /// Selected ion m/z
    pub mz: Option<f64>,
    /// Peak intensity
    pub intensity: Option<f64>,
    /// Charge state
    pub charge: Option<i32>,
}

/// A `<spectrum>` element reduced to the fields needed for MGF output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanEntry {
    /// Position in the spectrum list (0-based)
    pub index: usize,
    /// Native id, e.g. `controllerType=0 controllerNumber=1 scan=42`
    pub id: String,
    /// MS level
    pub ms_level: Option<u32>,
    /// Start time of the first scan, in minutes
    pub retention_time: Option<f64>,
    /// Vendor filter string
    pub filter_string: Option<String>,
    /// Selected ions of all precursors, in document order
    pub selected_ions: Vec<SelectedIon>,
    pub mz_array: Vec<f64>,
    pub intensity_array: Vec<f64>,
}

impl ScanEntry {
    /// The first selected ion, which carries the precursor used for MGF
    pub fn first_selected_ion(&self) -> Option<&SelectedIon> {
        self.selected_ions.first()
    }
}

/// Binary data array being read
#[derive(Debug, Default)]
struct ArrayContext {
    format: BinaryArrayFormat,
    data: String,
}

impl<R: BufRead> MzMLStreamer<R> {
    fn scan_header(&self, start: &BytesStart) -> Result<(ScanEntry, Option<usize>), MzMLError> {
        let entry = ScanEntry {
            index: get_attribute(start, "index")?
                .and_then(|s| s.parse().ok())
                .unwrap_or(self.next_index),
            id: get_attribute(start, "id")?.unwrap_or_default(),
            ..ScanEntry::default()
        };
        let default_array_length =
            get_attribute(start, "defaultArrayLength")?.and_then(|s| s.parse().ok());
        Ok((entry, default_array_length))
    }

    /// Entry for a self-closing `<spectrum/>`
    pub(super) fn empty_scan(&self, start: &BytesStart) -> Result<ScanEntry, MzMLError> {
        self.scan_header(start).map(|(entry, _)| entry)
    }

    /// Parse a `<spectrum>` element up to its matching end tag
    pub(super) fn parse_scan(&mut self, start: &BytesStart) -> Result<ScanEntry, MzMLError> {
        let (mut entry, default_array_length) = self.scan_header(start)?;

        let mut depth = 1usize;
        let mut current_ion: Option<SelectedIon> = None;
        let mut current_array: Option<ArrayContext> = None;
        let mut in_binary = false;
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    depth += 1;
                    match e.name().as_ref() {
                        b"cvParam" => {
                            let cv = parse_cv_param(e)?;
                            apply_cv_param(&mut entry, &mut current_ion, &mut current_array, &cv);
                        }
                        b"selectedIon" => current_ion = Some(SelectedIon::default()),
                        b"binaryDataArray" => current_array = Some(ArrayContext::default()),
                        b"binary" => in_binary = true,
                        _ => {}
                    }
                }
                Event::Empty(ref e) => {
                    if e.name().as_ref() == b"cvParam" {
                        let cv = parse_cv_param(e)?;
                        apply_cv_param(&mut entry, &mut current_ion, &mut current_array, &cv);
                    }
                }
                Event::Text(ref t) => {
                    if in_binary {
                        if let Some(ctx) = current_array.as_mut() {
                            ctx.data.push_str(&t.unescape()?);
                        }
                    }
                }
                Event::End(ref e) => {
                    depth -= 1;
                    match e.name().as_ref() {
                        b"spectrum" if depth == 0 => break,
                        b"selectedIon" => {
                            if let Some(ion) = current_ion.take() {
                                entry.selected_ions.push(ion);
                            }
                        }
                        b"binary" => in_binary = false,
                        b"binaryDataArray" => {
                            if let Some(ctx) = current_array.take() {
                                decode_array(&mut entry, ctx, default_array_length)?;
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => {
                    return Err(MzMLError::InvalidStructure(format!(
                        "Unexpected EOF in spectrum {}",
                        entry.id
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(entry)
    }
}

fn apply_cv_param(
    entry: &mut ScanEntry,
    current_ion: &mut Option<SelectedIon>,
    current_array: &mut Option<ArrayContext>,
    cv: &CvParam,
) {
    if let Some(ctx) = current_array.as_mut() {
        ctx.format.apply_accession(&cv.accession);
        return;
    }

    if let Some(ion) = current_ion.as_mut() {
        match cv.accession.as_str() {
            MS_CV_ACCESSIONS::SELECTED_ION_MZ => ion.mz = cv.value_as_f64(),
            MS_CV_ACCESSIONS::PEAK_INTENSITY => ion.intensity = cv.value_as_f64(),
            MS_CV_ACCESSIONS::CHARGE_STATE => ion.charge = cv.value_as_i32(),
            _ => {}
        }
        return;
    }

    match cv.accession.as_str() {
        MS_CV_ACCESSIONS::MS_LEVEL => {
            entry.ms_level = cv.value.as_deref().and_then(|v| v.trim().parse().ok());
        }
        MS_CV_ACCESSIONS::FILTER_STRING if entry.filter_string.is_none() => {
            entry.filter_string = cv.value.clone();
        }
        MS_CV_ACCESSIONS::SCAN_START_TIME if entry.retention_time.is_none() => {
            entry.retention_time = cv
                .value_as_f64()
                .map(|t| retention_time_in_minutes(t, cv.unit_accession.as_deref()));
        }
        _ => {}
    }
}

fn decode_array(
    entry: &mut ScanEntry,
    ctx: ArrayContext,
    default_array_length: Option<usize>,
) -> Result<(), MzMLError> {
    let target = match ctx.format.kind {
        ArrayKind::Mz => &mut entry.mz_array,
        ArrayKind::Intensity => &mut entry.intensity_array,
        ArrayKind::Other => return Ok(()),
    };
    *target = ctx
        .format
        .decode(&ctx.data, default_array_length)
        .map_err(|source| MzMLError::BinaryError {
            id: entry.id.clone(),
            source,
        })?;
    Ok(())
}
