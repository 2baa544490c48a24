//! Program header table management

use crate::formats::elf::types::*;
use crate::formats::elf::utils::EndianRead;

/// Parsed program header table, in file order
#[derive(Debug, Clone)]
pub struct SegmentTable {
    headers: Vec<ProgramHeader>,
}

impl SegmentTable {
    /// Parse `count` program headers from a buffer holding the raw table
    pub fn parse(table: &[u8], count: usize, class: ElfClass, endian: ElfData) -> Result<Self> {
        let entry_size = class.program_header_size();
        let needed = count * entry_size;
        if table.len() < needed {
            return Err(ElfError::Truncated { offset: 0, needed });
        }

        let headers = (0..count)
            .map(|i| parse_program_header(table, i * entry_size, class, endian))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { headers })
    }

    pub fn headers(&self) -> &[ProgramHeader] {
        &self.headers
    }

    pub fn get(&self, index: usize) -> Option<&ProgramHeader> {
        self.headers.get(index)
    }

    /// Count segments
    pub fn count(&self) -> usize {
        self.headers.len()
    }

    /// `PT_LOAD` segments that carry file bytes, with their table index
    pub fn load_segments(&self) -> impl Iterator<Item = (usize, &ProgramHeader)> + '_ {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, ph)| ph.is_loadable())
    }

    /// Whether sections should be placed at their virtual addresses.
    ///
    /// Some toolchains leave every physical address at zero. Physical
    /// addresses are used unless all of them are zero and more than one
    /// `PT_LOAD` segment occupies memory, which would otherwise collide at 0.
    pub fn uses_virtual_addresses(&self) -> bool {
        if self.headers.iter().any(|ph| ph.p_paddr != 0) {
            return false;
        }
        self.headers
            .iter()
            .filter(|ph| ph.p_type == PT_LOAD && ph.p_memsz != 0)
            .count()
            > 1
    }
}

/// Parse a single program header
fn parse_program_header(
    data: &[u8],
    offset: usize,
    class: ElfClass,
    endian: ElfData,
) -> Result<ProgramHeader> {
    match class {
        ElfClass::Elf32 => {
            if offset + 32 > data.len() {
                return Err(ElfError::Truncated { offset, needed: 32 });
            }
            Ok(ProgramHeader {
                p_type: data.read_u32(offset, endian)?,
                p_offset: data.read_u32(offset + 4, endian)? as u64,
                p_vaddr: data.read_u32(offset + 8, endian)? as u64,
                p_paddr: data.read_u32(offset + 12, endian)? as u64,
                p_filesz: data.read_u32(offset + 16, endian)? as u64,
                p_memsz: data.read_u32(offset + 20, endian)? as u64,
                p_flags: data.read_u32(offset + 24, endian)?,
                p_align: data.read_u32(offset + 28, endian)? as u64,
            })
        }
        ElfClass::Elf64 => {
            if offset + 56 > data.len() {
                return Err(ElfError::Truncated { offset, needed: 56 });
            }
            Ok(ProgramHeader {
                p_type: data.read_u32(offset, endian)?,
                p_flags: data.read_u32(offset + 4, endian)?,
                p_offset: data.read_u64(offset + 8, endian)?,
                p_vaddr: data.read_u64(offset + 16, endian)?,
                p_paddr: data.read_u64(offset + 24, endian)?,
                p_filesz: data.read_u64(offset + 32, endian)?,
                p_memsz: data.read_u64(offset + 40, endian)?,
                p_align: data.read_u64(offset + 48, endian)?,
            })
        }
    }
}
