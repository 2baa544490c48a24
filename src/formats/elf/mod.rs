//! ELF (Executable and Linkable Format) loader
//!
//! Only the file header and the program header table are read at open time.
//! Segment bytes stay in the file and are read on demand; the section header
//! table is only consulted for symbol resolution.

pub mod headers;
pub mod sections;
pub mod segments;
pub mod symbols;
pub mod types;
pub mod utils;

use crate::error::{try_reserve, ImageError, Result as ImageResult};
use crate::image::section::{Backing, Section, SectionFlags};
use crate::io::error::IoError;
use crate::io::FileIo;
use crate::log_error;
use headers::{parse_header, parse_ident};
use sections::SectionTable;
use segments::SegmentTable;
use symbols::{SymbolAddress, SymbolTable};
use tracing::debug;
pub use types::*;

/// Open ELF file plus the tables needed to serve section reads
#[derive(Debug)]
pub struct ElfImage {
    file: FileIo,
    header: ElfHeader,
    segments: SegmentTable,
}

/// Sections and entry point produced by [`ElfImage::read_headers`]
#[derive(Debug)]
pub(crate) struct ElfLayout {
    pub image: ElfImage,
    pub sections: Vec<Section>,
    pub start_address: u64,
}

/// Read `size` bytes at `offset`; a short file is an I/O error.
///
/// Sizes come from the file itself, so the range is checked against the file
/// length before anything is allocated.
fn read_region(file: &mut FileIo, offset: u64, size: u64) -> ImageResult<Vec<u8>> {
    let available = file.size().saturating_sub(offset);
    if size > available {
        return Err(log_error!(ImageError::Io(IoError::Truncated {
            offset,
            needed: usize::try_from(size).unwrap_or(usize::MAX),
            available: available as usize,
        })));
    }

    let size = size as usize;
    let mut buf = Vec::new();
    try_reserve(&mut buf, size)?;
    buf.resize(size, 0);
    file.seek(offset)?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

impl ElfImage {
    /// Validate the headers and lay out one section per loadable segment.
    pub(crate) fn read_headers(mut file: FileIo) -> ImageResult<ElfLayout> {
        let mut ident = [0u8; EI_NIDENT];
        file.seek(0)?;
        file.read_exact(&mut ident)?;
        let ident = parse_ident(&ident).map_err(|e| log_error!(ImageError::from(e)))?;

        let raw_header = read_region(&mut file, 0, ident.class.header_size() as u64)?;
        let header = parse_header(&raw_header)?;

        if header.e_phnum == 0 {
            return Err(log_error!(ImageError::from(ElfError::NoProgramHeaders)));
        }

        let count = header.e_phnum as usize;
        let table_size = (count * ident.class.program_header_size()) as u64;
        let raw_table = read_region(&mut file, header.e_phoff, table_size)?;
        let segments = SegmentTable::parse(&raw_table, count, ident.class, ident.data)?;

        let use_vaddr = segments.uses_virtual_addresses();
        let sections: Vec<Section> = segments
            .load_segments()
            .map(|(index, ph)| {
                let base = if use_vaddr { ph.p_vaddr } else { ph.p_paddr };
                Section::new(
                    base,
                    ph.p_filesz,
                    SectionFlags::from_bits_retain(ph.p_flags as u64),
                    Backing::Segment(index),
                )
            })
            .collect();

        if sections.is_empty() {
            return Err(log_error!(ImageError::from(ElfError::NoLoadableSegments)));
        }

        debug!(
            class = ident.class.bits(),
            little_endian = ident.data.is_little_endian(),
            segments = count,
            sections = sections.len(),
            use_vaddr,
            "ELF headers read"
        );

        Ok(ElfLayout {
            start_address: header.e_entry,
            image: Self {
                file,
                header,
                segments,
            },
            sections,
        })
    }

    /// Get ELF header
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    pub fn class(&self) -> ElfClass {
        self.header.ident.class
    }

    pub fn endianness(&self) -> ElfData {
        self.header.ident.data
    }

    /// Program headers in file order
    pub fn program_headers(&self) -> &[ProgramHeader] {
        self.segments.headers()
    }

    /// Read segment bytes at `offset` into `buf`.
    ///
    /// Only the file-backed part of the segment is served; a request reaching
    /// past `p_filesz` returns fewer bytes and the caller fills the rest.
    pub(crate) fn read_segment(
        &mut self,
        segment: usize,
        offset: u64,
        buf: &mut [u8],
    ) -> ImageResult<usize> {
        let ph = *self
            .segments
            .get(segment)
            .ok_or_else(|| ElfError::InvalidOffset { offset: segment })?;

        if offset >= ph.p_filesz {
            return Ok(0);
        }

        let file_offset = ph.p_offset.checked_add(offset).ok_or_else(|| {
            log_error!(ImageError::from(ElfError::SegmentOffsetOverflow { segment, offset }))
        })?;
        let read_size = (buf.len() as u64).min(ph.p_filesz - offset) as usize;
        debug!(segment, file_offset, read_size, "reading ELF segment");
        self.file.seek(file_offset)?;
        self.file.read_exact(&mut buf[..read_size])?;
        Ok(read_size)
    }

    /// Resolve names against section names first, then defined symbols.
    ///
    /// Only ELF32 images are supported.
    pub(crate) fn resolve_symbols(&mut self, names: &[&str]) -> ImageResult<Vec<SymbolAddress>> {
        if self.class() != ElfClass::Elf32 {
            return Err(log_error!(ImageError::from(ElfError::Elf64SymbolsUnsupported)));
        }

        let mut resolved: Vec<SymbolAddress> = names
            .iter()
            .map(|name| SymbolAddress {
                name: name.to_string(),
                address: None,
            })
            .collect();

        let class = self.class();
        let endian = self.endianness();
        let count = self.header.e_shnum as usize;
        let raw_table = read_region(
            &mut self.file,
            self.header.e_shoff,
            (count * class.section_header_size()) as u64,
        )?;
        let table = SectionTable::parse(&raw_table, count, class, endian)?;

        let names_header = *table.by_index(self.header.e_shstrndx as u32)?;
        let section_names = read_region(
            &mut self.file,
            names_header.sh_offset,
            names_header.sh_size,
        )?;

        for sh in table.headers() {
            if let Some(section_name) = SectionTable::name_of(sh, &section_names) {
                for entry in resolved.iter_mut().filter(|e| e.name == section_name) {
                    entry.address = Some(sh.sh_addr);
                }
            }
        }

        let symtab = *table
            .first_of_type(SHT_SYMTAB)
            .ok_or_else(|| log_error!(ImageError::from(ElfError::NoSymbolTable)))?;
        let strtab = *table.by_index(symtab.sh_link)?;

        let symbol_data = read_region(&mut self.file, symtab.sh_offset, symtab.sh_size)?;
        let string_data = read_region(&mut self.file, strtab.sh_offset, strtab.sh_size)?;
        let symbols = SymbolTable::parse(&symbol_data, &string_data, class, endian)?;

        for entry in resolved.iter_mut() {
            if let Some(address) = symbols.address_of(&entry.name) {
                entry.address = Some(address);
            }
        }

        debug!(
            requested = names.len(),
            resolved = resolved.iter().filter(|e| e.address.is_some()).count(),
            symbols = symbols.count(),
            "ELF symbols resolved"
        );
        Ok(resolved)
    }
}
