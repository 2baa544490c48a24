//! Per-format decoders.
//!
//! Each decoder turns one encoding into the shared [`Section`] model. The
//! record formats (IHEX, S-record) decode eagerly into an arena; ELF and live
//! memory keep a handle and read on demand.
//!
//! [`Section`]: crate::image::section::Section

pub mod binary;
pub mod builder;
pub mod elf;
pub mod ihex;
pub mod memory;
mod records;
pub mod srec;
