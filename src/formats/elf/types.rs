//! Core ELF types and constants

use thiserror::Error;

/// ELF parsing errors
#[derive(Debug, Clone, Error)]
pub enum ElfError {
    #[error("invalid ELF file, bad magic number")]
    InvalidMagic,
    #[error("invalid ELF file, only 32/64 bit ELF files are supported (class {0})")]
    UnsupportedClass(u8),
    #[error("invalid ELF file, unknown endianness setting ({0})")]
    UnsupportedData(u8),
    #[error("invalid ELF file, no program headers")]
    NoProgramHeaders,
    #[error("invalid ELF file, no loadable segments")]
    NoLoadableSegments,
    #[error("Truncated at {offset:#x}, needed {needed} bytes")]
    Truncated { offset: usize, needed: usize },
    #[error("Invalid offset: {offset:#x}")]
    InvalidOffset { offset: usize },
    #[error("invalid ELF file, segment {segment} file offset overflows at +{offset:#x}")]
    SegmentOffsetOverflow { segment: usize, offset: u64 },
    #[error("Invalid section index: {0}")]
    InvalidSectionIndex(u32),
    #[error("String not UTF-8")]
    InvalidString,
    #[error("Symbol resolution is supported for ELF32 images only")]
    Elf64SymbolsUnsupported,
    #[error("Symbol Table not found in elf object, symbols stripped?")]
    NoSymbolTable,
}

pub type Result<T> = std::result::Result<T, ElfError>;

/// ELF magic number
pub const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Size of the identification block at the start of every ELF file.
pub const EI_NIDENT: usize = 16;

/// ELF class (32-bit or 64-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32 = 1,
    Elf64 = 2,
}

impl ElfClass {
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            1 => Ok(ElfClass::Elf32),
            2 => Ok(ElfClass::Elf64),
            _ => Err(ElfError::UnsupportedClass(val)),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 64,
        }
    }

    /// Size of the file header, identification included.
    pub fn header_size(&self) -> usize {
        match self {
            ElfClass::Elf32 => 52,
            ElfClass::Elf64 => 64,
        }
    }

    /// Size of one program header table entry.
    pub fn program_header_size(&self) -> usize {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 56,
        }
    }

    /// Size of one section header table entry.
    pub fn section_header_size(&self) -> usize {
        match self {
            ElfClass::Elf32 => 40,
            ElfClass::Elf64 => 64,
        }
    }

    /// Size of one symbol table entry.
    pub fn symbol_size(&self) -> usize {
        match self {
            ElfClass::Elf32 => 16,
            ElfClass::Elf64 => 24,
        }
    }
}

/// ELF data encoding (endianness)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfData {
    Little = 1,
    Big = 2,
}

impl ElfData {
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            1 => Ok(ElfData::Little),
            2 => Ok(ElfData::Big),
            _ => Err(ElfError::UnsupportedData(val)),
        }
    }

    pub fn is_little_endian(&self) -> bool {
        matches!(self, ElfData::Little)
    }
}

/// ELF identification (first 16 bytes)
#[derive(Debug, Clone, Copy)]
pub struct ElfIdent {
    pub class: ElfClass,
    pub data: ElfData,
    pub version: u8,
    pub osabi: u8,
}

/// ELF header, every field already in host byte order
#[derive(Debug, Clone, Copy)]
pub struct ElfHeader {
    pub ident: ElfIdent,
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_phnum: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

impl ElfHeader {
    pub fn entry_point(&self) -> u64 {
        self.e_entry
    }
}

/// Program header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

impl ProgramHeader {
    /// A `PT_LOAD` segment with bytes in the file.
    pub fn is_loadable(&self) -> bool {
        self.p_type == PT_LOAD && self.p_filesz != 0
    }
}

/// Program header types
pub const PT_NULL: u32 = 0;
pub const PT_LOAD: u32 = 1;

/// Program header flags
pub const PF_X: u32 = 0x1;
pub const PF_W: u32 = 0x2;
pub const PF_R: u32 = 0x4;

/// Section header
#[derive(Debug, Clone, Copy)]
pub struct SectionHeader {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
}

/// Section types
pub const SHT_NULL: u32 = 0;
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;

/// Special section indices
pub const SHN_UNDEF: u16 = 0;

/// Symbol entry
#[derive(Debug, Clone, Copy)]
pub struct Symbol {
    pub st_name: u32,
    pub st_value: u64,
    pub st_size: u64,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
}

impl Symbol {
    pub fn is_undefined(&self) -> bool {
        self.st_shndx == SHN_UNDEF
    }
}
