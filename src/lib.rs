//! Multi-format firmware image loader.
//!
//! Raw binary, Intel HEX, Motorola S-record, ELF32/ELF64, live target memory
//! and programmatically built images all decode into the same model: an
//! ordered list of loadable sections plus an optional start address.
//!
//! ```no_run
//! use fwimage::Image;
//!
//! let mut image = Image::open("firmware.hex", None)?;
//! for (index, section) in image.sections().to_vec().iter().enumerate() {
//!     let crc = image.section_checksum(index)?;
//!     println!("{} crc={:#010x}", section, crc);
//! }
//! # Ok::<(), fwimage::ImageError>(())
//! ```

/// CRC-32 checksum engine
pub mod checksum;
/// Loader configuration
pub mod config;
/// Error types
pub mod error;
/// Per-format decoders
pub mod formats;
/// Image model and loader
pub mod image;
/// File access primitive
pub mod io;
/// Tracing setup
pub mod logging;
/// Cooperative cancellation
pub mod shutdown;

pub use checksum::{calculate_checksum, calculate_checksum_with, Crc32};
pub use config::LoaderConfig;
pub use error::{ImageError, Result};
pub use formats::elf::symbols::SymbolAddress;
pub use formats::memory::{SharedTarget, TargetError, TargetMemory};
pub use image::{
    Image, ImageLoader, ImageSummary, ImageType, Section, SectionFlags, SectionSummary,
};
pub use shutdown::{
    clear_shutdown_request, request_shutdown, GlobalShutdown, ShutdownPoll, ShutdownToken,
};
