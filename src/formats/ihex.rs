//! Intel HEX decoder.
//!
//! Record line grammar: `:CCAAAATT[DD...]KK`, all hex pairs. `CC` counts the
//! data bytes, `AAAA` is the low 16 address bits, `TT` the record type and `KK`
//! the two's complement of the byte sum of everything before it.
//!
//! The whole file is decoded eagerly. A 32-bit address accumulator tracks
//! where the next data byte lands; whenever a record moves it somewhere else
//! the current section is closed (if it holds data) and a new one begins.

use crate::error::{ImageError, Result};
use crate::formats::records::{
    decode_hex, excerpt, is_skippable, DecodedRecords, SectionAccumulator,
};
use crate::io::FileIo;
use crate::log_error;
use tracing::{debug, warn};

const FORMAT: &str = "IHEX";

pub const RECORD_DATA: u8 = 0x00;
pub const RECORD_END_OF_FILE: u8 = 0x01;
pub const RECORD_EXTENDED_SEGMENT_ADDRESS: u8 = 0x02;
pub const RECORD_START_SEGMENT_ADDRESS: u8 = 0x03;
pub const RECORD_EXTENDED_LINEAR_ADDRESS: u8 = 0x04;
pub const RECORD_START_LINEAR_ADDRESS: u8 = 0x05;

/// One parsed and checksum-verified record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IhexRecord {
    pub address: u16,
    pub record_type: u8,
    pub data: Vec<u8>,
}

impl IhexRecord {
    /// Parse a record line (terminator already stripped).
    pub fn parse(line: &[u8], line_no: usize) -> Result<Self> {
        if line.first() != Some(&b':') {
            return Err(log_error!(ImageError::Format(format!(
                "invalid IHEX record at line {}: {}",
                line_no,
                excerpt(line)
            ))));
        }

        let header = decode_hex(line, 1, 8, FORMAT, line_no)?;
        let count = header[0] as usize;
        let record_type = header[3];

        if record_type > RECORD_START_LINEAR_ADDRESS {
            return Err(log_error!(ImageError::Format(format!(
                "unhandled IHEX record type: {} (line {})",
                record_type, line_no
            ))));
        }

        // count + address + type + data + checksum
        let bytes = decode_hex(line, 1, 2 * (count + 5), FORMAT, line_no)?;
        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != 0 {
            return Err(log_error!(ImageError::Checksum {
                format: FORMAT,
                line: line_no,
            }));
        }

        Ok(Self {
            address: u16::from_be_bytes([bytes[1], bytes[2]]),
            record_type,
            data: bytes[4..4 + count].to_vec(),
        })
    }

    fn payload<const N: usize>(&self, line_no: usize) -> Result<[u8; N]> {
        self.data.as_slice().try_into().map_err(|_| {
            ImageError::Format(format!(
                "IHEX record type {} at line {} needs {} data bytes, has {}",
                self.record_type,
                line_no,
                N,
                self.data.len()
            ))
        })
    }
}

/// Decode an Intel HEX file into sections.
pub(crate) fn decode(file: &mut FileIo, max_sections: usize) -> Result<DecodedRecords> {
    // Every payload byte takes at least two characters.
    let capacity = (file.size() / 2) as usize;
    let mut acc = SectionAccumulator::new(capacity, Some(max_sections), FORMAT)?;

    let mut full_address: u32 = 0;
    let mut start_address = None;
    let mut end_seen = false;
    let mut line_no = 0;

    while let Some(line) = file.read_line()? {
        line_no += 1;
        if is_skippable(&line) {
            continue;
        }

        let record = IhexRecord::parse(&line, line_no)?;

        // anything after an end record needs another end record to follow
        if end_seen {
            end_seen = false;
            warn!(line = line_no, "continuing after end-of-file record: {}", excerpt(&line));
        }

        match record.record_type {
            RECORD_DATA => {
                if (full_address & 0xffff) != record.address as u32 {
                    full_address = (full_address & 0xffff_0000) | record.address as u32;
                    acc.restart_at(full_address as u64)?;
                }
                acc.push(&record.data)?;
                full_address = full_address.wrapping_add(record.data.len() as u32);
            }
            RECORD_END_OF_FILE => {
                acc.close_current();
                full_address = 0;
                end_seen = true;
            }
            RECORD_EXTENDED_SEGMENT_ADDRESS => {
                let upper = u16::from_be_bytes(record.payload::<2>(line_no)?) as u32;
                if (full_address >> 4) != upper {
                    full_address = (full_address & 0xffff) | (upper << 4);
                    acc.restart_at(full_address as u64)?;
                }
            }
            RECORD_START_SEGMENT_ADDRESS => {
                // CS:IP start addresses are x86-only; validated above, otherwise ignored.
            }
            RECORD_EXTENDED_LINEAR_ADDRESS => {
                let upper = u16::from_be_bytes(record.payload::<2>(line_no)?) as u32;
                if (full_address >> 16) != upper {
                    full_address = (full_address & 0xffff) | (upper << 16);
                    acc.restart_at(full_address as u64)?;
                }
            }
            RECORD_START_LINEAR_ADDRESS => {
                start_address = Some(u32::from_be_bytes(record.payload::<4>(line_no)?) as u64);
            }
            other => {
                return Err(ImageError::Format(format!(
                    "unhandled IHEX record type: {} (line {})",
                    other, line_no
                )))
            }
        }
    }

    if !end_seen {
        return Err(log_error!(ImageError::Format(
            "premature end of IHEX file, no matching end-of-file record found".to_string()
        )));
    }

    let decoded = acc.finish(start_address);
    debug!(
        sections = decoded.sections.len(),
        bytes = decoded.arena.len(),
        "IHEX image decoded"
    );
    Ok(decoded)
}
