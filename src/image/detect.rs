//! Image type identification.
//!
//! An explicit type string maps directly onto [`ImageType`]. Without one, the
//! first [`SNIFF_LEN`] bytes of the file are matched against the ELF magic and
//! the IHEX and S-record line grammars. The sniff only picks a decoder; it does
//! not validate the file.

use crate::error::{ImageError, Result};
use crate::formats::elf::ELF_MAGIC;
use crate::io::{FileIo, FileMode, IOLimits};
use crate::log_error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Number of leading bytes inspected by [`sniff`].
pub const SNIFF_LEN: usize = 9;

/// The six image encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    #[serde(rename = "bin")]
    Binary,
    #[serde(rename = "ihex")]
    IHex,
    #[serde(rename = "elf")]
    Elf,
    #[serde(rename = "mem")]
    Memory,
    #[serde(rename = "s19")]
    SRecord,
    #[serde(rename = "build")]
    Builder,
}

impl ImageType {
    /// Type string accepted by [`ImageType::from_str`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Binary => "bin",
            ImageType::IHex => "ihex",
            ImageType::Elf => "elf",
            ImageType::Memory => "mem",
            ImageType::SRecord => "s19",
            ImageType::Builder => "build",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bin" => Ok(ImageType::Binary),
            "ihex" => Ok(ImageType::IHex),
            "elf" => Ok(ImageType::Elf),
            "mem" => Ok(ImageType::Memory),
            "s19" => Ok(ImageType::SRecord),
            "build" => Ok(ImageType::Builder),
            other => Err(log_error!(ImageError::UnknownType(other.to_string()))),
        }
    }
}

/// Classify a file prefix. Fewer than [`SNIFF_LEN`] bytes is always binary.
pub fn sniff(prefix: &[u8]) -> ImageType {
    let b = match prefix.get(..SNIFF_LEN) {
        Some(b) => b,
        None => return ImageType::Binary,
    };

    if b.starts_with(ELF_MAGIC) {
        ImageType::Elf
    } else if b[0] == b':'
        && b[1..7].iter().all(u8::is_ascii_hexdigit)
        && b[7] == b'0'
        && (b'0'..=b'5').contains(&b[8])
    {
        ImageType::IHex
    } else if b[0] == b'S'
        && b[1..4].iter().all(u8::is_ascii_hexdigit)
        && (b'0'..=b'8').contains(&b[1])
    {
        ImageType::SRecord
    } else {
        ImageType::Binary
    }
}

/// Sniff the file at `path`.
pub fn detect_file<P: AsRef<Path>>(path: P, limits: &IOLimits) -> Result<ImageType> {
    let mut file = FileIo::open(path.as_ref(), FileMode::Binary, limits)?;
    let mut prefix = [0u8; SNIFF_LEN];
    let read = file.read(&mut prefix)?;
    let image_type = sniff(&prefix[..read]);
    debug!(
        path = %path.as_ref().display(),
        bytes = read,
        %image_type,
        "image type detected"
    );
    Ok(image_type)
}
