//! Bookkeeping shared by the line-oriented record decoders (IHEX, S-record).
//!
//! Decoded bytes go into one arena owned by the image. Sections are opened and
//! closed while records stream by; only the current (last) section ever grows.

use crate::error::{try_reserve, ImageError, Result};
use crate::image::section::{Backing, Section, SectionFlags};

/// Decoder output: sections slicing into `arena`, plus an optional entry point.
#[derive(Debug)]
pub(crate) struct DecodedRecords {
    pub sections: Vec<Section>,
    pub arena: Vec<u8>,
    pub start_address: Option<u64>,
}

pub(crate) struct SectionAccumulator {
    arena: Vec<u8>,
    closed: Vec<Section>,
    current: Section,
    max_sections: Option<usize>,
    format: &'static str,
}

impl SectionAccumulator {
    /// `capacity` preallocates the arena; `max_sections` caps closed sections.
    pub fn new(capacity: usize, max_sections: Option<usize>, format: &'static str) -> Result<Self> {
        let mut arena = Vec::new();
        try_reserve(&mut arena, capacity)?;
        Ok(Self {
            arena,
            closed: Vec::new(),
            current: Self::empty_section_at(0),
            max_sections,
            format,
        })
    }

    fn empty_section_at(offset: usize) -> Section {
        Section::new(0, 0, SectionFlags::empty(), Backing::Arena(offset))
    }

    pub fn current_size(&self) -> u64 {
        self.current.size()
    }

    /// Handle an address discontinuity.
    ///
    /// A current section that already holds data is closed and a new one
    /// starts at `base`; an empty current section just moves to `base`.
    pub fn restart_at(&mut self, base: u64) -> Result<()> {
        if self.current_size() != 0 {
            self.close_current();
            if let Some(max) = self.max_sections {
                if self.closed.len() >= max {
                    return Err(crate::log_error!(ImageError::Format(format!(
                        "Too many sections found in {} file (limit {})",
                        self.format, max
                    ))));
                }
            }
        }
        self.current.set_base_address(base);
        Ok(())
    }

    /// Append decoded payload bytes to the current section.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        try_reserve(&mut self.arena, bytes.len())?;
        self.arena.extend_from_slice(bytes);
        self.current.grow(bytes.len() as u64);
        Ok(())
    }

    /// Close the current section unconditionally and start an empty one at 0.
    pub fn close_current(&mut self) {
        let next = Self::empty_section_at(self.arena.len());
        self.closed.push(std::mem::replace(&mut self.current, next));
    }

    /// Finish decoding. A current section that collected data after the last
    /// end record is kept; an empty one is dropped.
    pub fn finish(mut self, start_address: Option<u64>) -> DecodedRecords {
        if self.current_size() != 0 {
            self.close_current();
        }
        DecodedRecords {
            sections: self.closed,
            arena: self.arena,
            start_address,
        }
    }
}

/// Blank lines and `#` comments carry no records.
pub(crate) fn is_skippable(line: &[u8]) -> bool {
    line.first() == Some(&b'#')
        || line
            .iter()
            .all(|b| matches!(b, b'\n' | b'\t' | b'\r' | b' '))
}

/// Decode `len` hex characters of `line` starting at `start`.
pub(crate) fn decode_hex(
    line: &[u8],
    start: usize,
    len: usize,
    format: &str,
    line_no: usize,
) -> Result<Vec<u8>> {
    let digits = line.get(start..start + len).ok_or_else(|| {
        ImageError::Format(format!(
            "{} record at line {} is shorter than its declared length",
            format, line_no
        ))
    })?;
    hex::decode(digits).map_err(|e| {
        ImageError::Format(format!(
            "invalid hex digits in {} record at line {}: {}",
            format, line_no, e
        ))
    })
}

/// Short printable excerpt of a line for log messages.
pub(crate) fn excerpt(line: &[u8]) -> String {
    String::from_utf8_lossy(&line[..line.len().min(40)]).into_owned()
}
