//! Section header table management

use crate::formats::elf::types::*;
use crate::formats::elf::utils::{read_cstring, EndianRead};

/// Parsed section header table
#[derive(Debug, Clone)]
pub struct SectionTable {
    headers: Vec<SectionHeader>,
}

impl SectionTable {
    /// Parse `count` section headers from a buffer holding the raw table
    pub fn parse(table: &[u8], count: usize, class: ElfClass, endian: ElfData) -> Result<Self> {
        let entry_size = class.section_header_size();
        let needed = count * entry_size;
        if table.len() < needed {
            return Err(ElfError::Truncated { offset: 0, needed });
        }

        let headers = (0..count)
            .map(|i| parse_section_header(table, i * entry_size, class, endian))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { headers })
    }

    pub fn headers(&self) -> &[SectionHeader] {
        &self.headers
    }

    /// Get section header by index, failing on an out-of-table index
    pub fn by_index(&self, index: u32) -> Result<&SectionHeader> {
        self.headers
            .get(index as usize)
            .ok_or(ElfError::InvalidSectionIndex(index))
    }

    /// Count sections
    pub fn count(&self) -> usize {
        self.headers.len()
    }

    /// First section of the given type
    pub fn first_of_type(&self, sh_type: u32) -> Option<&SectionHeader> {
        self.headers.iter().find(|sh| sh.sh_type == sh_type)
    }

    /// Name of a section, looked up in the section name string table
    pub fn name_of<'s>(header: &SectionHeader, names: &'s [u8]) -> Option<&'s str> {
        read_cstring(names, header.sh_name as usize).ok()
    }
}

/// Parse a single section header
fn parse_section_header(
    data: &[u8],
    offset: usize,
    class: ElfClass,
    endian: ElfData,
) -> Result<SectionHeader> {
    match class {
        ElfClass::Elf32 => {
            if offset + 40 > data.len() {
                return Err(ElfError::Truncated { offset, needed: 40 });
            }
            Ok(SectionHeader {
                sh_name: data.read_u32(offset, endian)?,
                sh_type: data.read_u32(offset + 4, endian)?,
                sh_flags: data.read_u32(offset + 8, endian)? as u64,
                sh_addr: data.read_u32(offset + 12, endian)? as u64,
                sh_offset: data.read_u32(offset + 16, endian)? as u64,
                sh_size: data.read_u32(offset + 20, endian)? as u64,
                sh_link: data.read_u32(offset + 24, endian)?,
            })
        }
        ElfClass::Elf64 => {
            if offset + 64 > data.len() {
                return Err(ElfError::Truncated { offset, needed: 64 });
            }
            Ok(SectionHeader {
                sh_name: data.read_u32(offset, endian)?,
                sh_type: data.read_u32(offset + 4, endian)?,
                sh_flags: data.read_u64(offset + 8, endian)?,
                sh_addr: data.read_u64(offset + 16, endian)?,
                sh_offset: data.read_u64(offset + 24, endian)?,
                sh_size: data.read_u64(offset + 32, endian)?,
                sh_link: data.read_u32(offset + 40, endian)?,
            })
        }
    }
}
