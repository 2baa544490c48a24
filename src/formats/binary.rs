//! Raw binary images: the whole file is one section at address 0.

use crate::error::Result;
use crate::image::section::{Backing, Section, SectionFlags};
use crate::io::FileIo;

pub(crate) fn section_for(file: &FileIo) -> Section {
    Section::new(0, file.size(), SectionFlags::empty(), Backing::Source)
}

/// Read `buf.len()` bytes of the file starting at `offset`.
pub(crate) fn read(file: &mut FileIo, offset: u64, buf: &mut [u8]) -> Result<usize> {
    file.seek(offset)?;
    file.read_exact(buf)?;
    Ok(buf.len())
}
