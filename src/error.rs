//! Error types for the image loader.
//!
//! Every public operation returns [`ImageError`]. The variants follow the
//! failure classes callers act on: format and checksum errors are fatal to an
//! open, `TemporarilyUnavailable` may be retried, `OutOfRange` is a usage error.

use crate::formats::elf::ElfError;
use crate::io::error::IoError;
use thiserror::Error;

/// Main error type for image operations.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Malformed magic, bad record grammar, unsupported record or missing table
    #[error("Invalid image format: {0}")]
    Format(String),

    /// A record checksum did not match its contents
    #[error("Incorrect record checksum in {format} file at line {line}")]
    Checksum { format: &'static str, line: usize },

    /// Explicit type string not in the known vocabulary
    #[error("Unknown image type: {0}, use one of: bin, ihex, elf, mem, s19, build")]
    UnknownType(String),

    /// Live target read failed; the caller may retry later
    #[error("Target memory at {address:#x} temporarily unavailable: {reason}")]
    TemporarilyUnavailable { address: u64, reason: String },

    /// File open, seek or read failure, including short reads
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Cooperative shutdown was observed
    #[error("Operation interrupted by shutdown request")]
    Interrupted,

    /// Read past the end of a section
    #[error("Read past end of section {section}: {offset:#x} + {size:#x} > {section_size:#x}")]
    OutOfRange {
        section: usize,
        offset: u64,
        size: u64,
        section_size: u64,
    },

    /// Section index does not exist in this image
    #[error("Invalid section index {index} (image has {count} sections)")]
    InvalidSection { index: usize, count: usize },

    /// Only builder images accept new sections
    #[error("Cannot add sections to a {0} image")]
    NotABuilder(&'static str),

    /// Buffer allocation failed
    #[error("Out of memory allocating {requested} bytes")]
    OutOfMemory { requested: usize },

    /// A `mem` locator named no registered target
    #[error("Target '{0}' not defined")]
    TargetNotFound(String),

    /// Loader configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for image operations
pub type Result<T> = std::result::Result<T, ImageError>;

impl From<ElfError> for ImageError {
    fn from(err: ElfError) -> Self {
        ImageError::Format(err.to_string())
    }
}

impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> Self {
        ImageError::Io(IoError::StdIo(err))
    }
}

impl ImageError {
    /// True for errors a caller may retry once conditions change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImageError::TemporarilyUnavailable { .. })
    }

    /// True for usage errors: bad ranges, bad indices, wrong image type.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ImageError::OutOfRange { .. }
                | ImageError::InvalidSection { .. }
                | ImageError::NotABuilder(_)
        )
    }
}

/// Reserve `additional` bytes in `buf`, mapping allocation failure to `OutOfMemory`.
pub(crate) fn try_reserve(buf: &mut Vec<u8>, additional: usize) -> Result<()> {
    buf.try_reserve(additional)
        .map_err(|_| ImageError::OutOfMemory {
            requested: additional,
        })
}
