//! Symbol table parsing

use crate::formats::elf::types::*;
use crate::formats::elf::utils::{read_cstring, EndianRead};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of resolving one requested name; `address` stays `None` when the
/// name matched neither a section nor a defined symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolAddress {
    pub name: String,
    pub address: Option<u64>,
}

/// Symbol table
pub struct SymbolTable<'a> {
    symbols: Vec<Symbol>,
    strings: &'a [u8],
    by_name: HashMap<&'a str, usize>,
}

impl<'a> SymbolTable<'a> {
    /// Parse symbol table from section data
    ///
    /// Only defined symbols are indexed by name. When a name repeats, the
    /// entry that comes last in the table wins.
    pub fn parse(
        symbol_data: &[u8],
        string_data: &'a [u8],
        class: ElfClass,
        endian: ElfData,
    ) -> Result<Self> {
        let entry_size = class.symbol_size();

        let mut symbols = Vec::with_capacity(symbol_data.len() / entry_size);
        let mut by_name = HashMap::new();

        for (index, entry) in symbol_data.chunks_exact(entry_size).enumerate() {
            let symbol = parse_symbol(entry, class, endian)?;

            if !symbol.is_undefined() {
                if let Ok(name) = read_cstring(string_data, symbol.st_name as usize) {
                    by_name.insert(name, index);
                }
            }

            symbols.push(symbol);
        }

        Ok(Self {
            symbols,
            strings: string_data,
            by_name,
        })
    }

    /// Get symbol by index
    pub fn by_index(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    /// Get defined symbol by name
    pub fn by_name(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).and_then(|&idx| self.by_index(idx))
    }

    /// Value of the defined symbol `name`
    pub fn address_of(&self, name: &str) -> Option<u64> {
        self.by_name(name).map(|s| s.st_value)
    }

    /// Get symbol name
    pub fn symbol_name(&self, symbol: &Symbol) -> Option<&'a str> {
        if symbol.st_name == 0 {
            return None;
        }
        read_cstring(self.strings, symbol.st_name as usize).ok()
    }

    /// Count total symbols
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

/// Parse a single symbol entry
fn parse_symbol(data: &[u8], class: ElfClass, endian: ElfData) -> Result<Symbol> {
    match class {
        ElfClass::Elf32 => {
            if data.len() < 16 {
                return Err(ElfError::Truncated {
                    offset: 0,
                    needed: 16,
                });
            }
            Ok(Symbol {
                st_name: data.read_u32(0, endian)?,
                st_value: data.read_u32(4, endian)? as u64,
                st_size: data.read_u32(8, endian)? as u64,
                st_info: data[12],
                st_other: data[13],
                st_shndx: data.read_u16(14, endian)?,
            })
        }
        ElfClass::Elf64 => {
            if data.len() < 24 {
                return Err(ElfError::Truncated {
                    offset: 0,
                    needed: 24,
                });
            }
            Ok(Symbol {
                st_name: data.read_u32(0, endian)?,
                st_info: data[4],
                st_other: data[5],
                st_shndx: data.read_u16(6, endian)?,
                st_value: data.read_u64(8, endian)?,
                st_size: data.read_u64(16, endian)?,
            })
        }
    }
}
