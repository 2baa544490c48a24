//! Loadable sections shared by every image type.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Section permission bits. ELF segments carry their `p_flags` here
    /// unchanged; every other format leaves the flags empty.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SectionFlags: u64 {
        const EXECUTE = 0x1;
        const WRITE = 0x2;
        const READ = 0x4;
    }
}

impl fmt::Display for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut perms = String::new();
        perms.push(if self.contains(Self::READ) { 'r' } else { '-' });
        perms.push(if self.contains(Self::WRITE) { 'w' } else { '-' });
        perms.push(if self.contains(Self::EXECUTE) { 'x' } else { '-' });
        write!(f, "{}", perms)
    }
}

/// Where a section's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Backing {
    /// Read from the source on demand (binary file, live target).
    Source,
    /// Slice of the image's decode arena starting at this offset.
    Arena(usize),
    /// Buffer owned by the section itself (builder images).
    Owned(Vec<u8>),
    /// Index into the ELF program header table.
    Segment(usize),
}

/// A contiguous range of target address space with its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    base_address: u64,
    size: u64,
    flags: SectionFlags,
    pub(crate) backing: Backing,
}

impl Section {
    pub(crate) fn new(base_address: u64, size: u64, flags: SectionFlags, backing: Backing) -> Self {
        Self {
            base_address,
            size,
            flags,
            backing,
        }
    }

    /// First target address covered by the section.
    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// Number of bytes in the section.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn flags(&self) -> SectionFlags {
        self.flags
    }

    /// One past the last address covered, saturating at `u64::MAX`.
    pub fn end_address(&self) -> u64 {
        self.base_address.saturating_add(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub(crate) fn set_base_address(&mut self, base_address: u64) {
        self.base_address = base_address;
    }

    pub(crate) fn grow(&mut self, by: u64) {
        self.size += by;
    }

    pub(crate) fn relocate(&mut self, offset: u64) {
        self.base_address = self.base_address.wrapping_add(offset);
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#010x}..{:#010x} ({} bytes, {})",
            self.base_address,
            self.end_address(),
            self.size,
            self.flags
        )
    }
}
