//! Motorola S-record decoder.
//!
//! Record line grammar: `S` + type digit + `CC` + address + data + `KK`. `CC`
//! counts the address, data and checksum bytes; the byte sum of the count and
//! all counted bytes must be `0xFF`.

use crate::error::{ImageError, Result};
use crate::formats::records::{
    decode_hex, excerpt, is_skippable, DecodedRecords, SectionAccumulator,
};
use crate::io::FileIo;
use crate::log_error;
use tracing::{debug, warn};

const FORMAT: &str = "S19";

/// One parsed and checksum-verified record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrecRecord {
    pub record_type: u8,
    /// Decoded address for records that carry one, else 0.
    pub address: u32,
    pub data: Vec<u8>,
}

/// Width of the address field, or `None` for records whose payload is opaque.
fn address_width(record_type: u8) -> Option<usize> {
    match record_type {
        1 | 9 => Some(2),
        2 | 8 => Some(3),
        3 | 7 => Some(4),
        _ => None,
    }
}

impl SrecRecord {
    /// Parse a record line (terminator already stripped).
    pub fn parse(line: &[u8], line_no: usize) -> Result<Self> {
        let record_type = match (line.first(), line.get(1)) {
            (Some(b'S'), Some(&digit)) => (digit as char).to_digit(16),
            _ => None,
        }
        .ok_or_else(|| {
            log_error!(ImageError::Format(format!(
                "invalid S19 record at line {}: {}",
                line_no,
                excerpt(line)
            )))
        })? as u8;

        let count = decode_hex(line, 2, 2, FORMAT, line_no)?[0];

        if !matches!(record_type, 0..=3 | 5..=9) {
            return Err(log_error!(ImageError::Format(format!(
                "unhandled S19 record type: {} (line {})",
                record_type, line_no
            ))));
        }

        let bytes = decode_hex(line, 4, 2 * count as usize, FORMAT, line_no)?;
        let sum = bytes.iter().fold(count, |acc, b| acc.wrapping_add(*b));
        if sum != 0xff {
            return Err(log_error!(ImageError::Checksum {
                format: FORMAT,
                line: line_no,
            }));
        }

        // drop the checksum byte
        let body = match bytes.split_last() {
            Some((_, body)) => body,
            None => {
                return Err(ImageError::Format(format!(
                    "S19 record at line {} has no checksum byte",
                    line_no
                )))
            }
        };

        let (address, data) = match address_width(record_type) {
            Some(width) if body.len() < width => {
                return Err(ImageError::Format(format!(
                    "S{} record at line {} is too short for a {}-bit address",
                    record_type,
                    line_no,
                    width * 8
                )))
            }
            Some(width) => {
                let address = body[..width]
                    .iter()
                    .fold(0u32, |acc, b| (acc << 8) | *b as u32);
                (address, body[width..].to_vec())
            }
            None => (0, body.to_vec()),
        };

        Ok(Self {
            record_type,
            address,
            data,
        })
    }
}

/// Decode a Motorola S-record file into sections.
///
/// Unlike the IHEX decoder this one places no cap on the section count.
pub(crate) fn decode(file: &mut FileIo) -> Result<DecodedRecords> {
    let capacity = (file.size() / 2) as usize;
    let mut acc = SectionAccumulator::new(capacity, None, FORMAT)?;

    let mut full_address: u32 = 0;
    let mut end_seen = false;
    let mut line_no = 0;

    while let Some(line) = file.read_line()? {
        line_no += 1;
        if is_skippable(&line) {
            continue;
        }

        let record = SrecRecord::parse(&line, line_no)?;

        // anything after an end record needs another end record to follow
        if end_seen {
            end_seen = false;
            warn!(line = line_no, "continuing after end-of-file record: {}", excerpt(&line));
        }

        match record.record_type {
            // header and record counts carry nothing to load
            0 | 5 | 6 => {}
            1..=3 => {
                if full_address != record.address {
                    full_address = record.address;
                    acc.restart_at(full_address as u64)?;
                }
                acc.push(&record.data)?;
                full_address = full_address.wrapping_add(record.data.len() as u32);
            }
            7..=9 => {
                acc.close_current();
                full_address = 0;
                end_seen = true;
            }
            other => {
                return Err(ImageError::Format(format!(
                    "unhandled S19 record type: {} (line {})",
                    other, line_no
                )))
            }
        }
    }

    if !end_seen {
        return Err(log_error!(ImageError::Format(
            "premature end of S19 file, no matching end-of-file record found".to_string()
        )));
    }

    let decoded = acc.finish(None);
    debug!(
        sections = decoded.sections.len(),
        bytes = decoded.arena.len(),
        "S19 image decoded"
    );
    Ok(decoded)
}
