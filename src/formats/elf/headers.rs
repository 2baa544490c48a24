//! ELF header parsing

use crate::formats::elf::types::*;
use crate::formats::elf::utils::EndianRead;

/// Parse ELF identification bytes
///
/// Checks run in the order a loader cares about them: magic, byte order, class.
pub fn parse_ident(data: &[u8]) -> Result<ElfIdent> {
    if data.len() < EI_NIDENT {
        return Err(ElfError::Truncated {
            offset: 0,
            needed: EI_NIDENT,
        });
    }

    if &data[0..4] != ELF_MAGIC {
        return Err(ElfError::InvalidMagic);
    }

    let data_encoding = ElfData::from_u8(data[5])?;
    let class = ElfClass::from_u8(data[4])?;

    Ok(ElfIdent {
        class,
        data: data_encoding,
        version: data[6],
        osabi: data[7],
    })
}

/// Parse ELF header
pub fn parse_header(data: &[u8]) -> Result<ElfHeader> {
    let ident = parse_ident(data)?;

    let header_size = ident.class.header_size();
    if data.len() < header_size {
        return Err(ElfError::Truncated {
            offset: 0,
            needed: header_size,
        });
    }

    let endian = ident.data;

    let e_type = data.read_u16(16, endian)?;
    let e_machine = data.read_u16(18, endian)?;
    let e_version = data.read_u32(20, endian)?;

    let (e_entry, e_phoff, e_shoff, e_flags, e_phnum, e_shnum, e_shstrndx) = match ident.class {
        ElfClass::Elf32 => (
            data.read_u32(24, endian)? as u64,
            data.read_u32(28, endian)? as u64,
            data.read_u32(32, endian)? as u64,
            data.read_u32(36, endian)?,
            data.read_u16(44, endian)?,
            data.read_u16(48, endian)?,
            data.read_u16(50, endian)?,
        ),
        ElfClass::Elf64 => (
            data.read_u64(24, endian)?,
            data.read_u64(32, endian)?,
            data.read_u64(40, endian)?,
            data.read_u32(48, endian)?,
            data.read_u16(56, endian)?,
            data.read_u16(60, endian)?,
            data.read_u16(62, endian)?,
        ),
    };

    Ok(ElfHeader {
        ident,
        e_type,
        e_machine,
        e_version,
        e_entry,
        e_phoff,
        e_shoff,
        e_flags,
        e_phnum,
        e_shnum,
        e_shstrndx,
    })
}
