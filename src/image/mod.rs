//! The uniform image model.
//!
//! [`ImageLoader::open`] identifies the encoding, runs one decoder and hands
//! back an [`Image`]: an ordered list of [`Section`]s plus an optional start
//! address. Section content is then read through [`Image::read_section`],
//! whatever the encoding.

pub mod detect;
pub mod section;

pub use detect::{detect_file, sniff, ImageType, SNIFF_LEN};
pub use section::{Section, SectionFlags};

use crate::checksum::calculate_checksum_with;
use crate::config::LoaderConfig;
use crate::error::{try_reserve, ImageError, Result};
use crate::formats::elf::symbols::SymbolAddress;
use crate::formats::elf::ElfImage;
use crate::formats::memory::{MemoryImage, SharedTarget, MEMORY_SECTION_SIZE};
use crate::formats::{binary, builder, ihex, srec};
use crate::io::{FileIo, FileMode};
use crate::log_error;
use crate::shutdown::{GlobalShutdown, ShutdownPoll};
use section::Backing;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Per-encoding state kept alive for section reads.
#[derive(Debug)]
enum FormatState {
    Binary { file: FileIo },
    IHex { arena: Vec<u8> },
    Elf(ElfImage),
    Memory(MemoryImage),
    SRecord { arena: Vec<u8> },
    Builder,
}

/// Opens images with a shared configuration.
///
/// Live targets for `mem` images are registered by name; the locator passed
/// to [`open`](Self::open) is looked up in that registry.
#[derive(Clone, Default)]
pub struct ImageLoader {
    config: LoaderConfig,
    base_address: Option<u64>,
    targets: HashMap<String, SharedTarget>,
}

impl fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLoader")
            .field("config", &self.config)
            .field("base_address", &self.base_address)
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ImageLoader {
    pub fn new(config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Shift every decoded section by `offset` at open time.
    pub fn with_base_address(mut self, offset: u64) -> Self {
        self.base_address = Some(offset);
        self
    }

    /// Register a live target under `name` for `mem` images.
    pub fn with_target(mut self, name: impl Into<String>, target: SharedTarget) -> Self {
        self.targets.insert(name.into(), target);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Open `locator` as the given type, or sniff the file when `type_hint` is `None`.
    pub fn open(&self, locator: &str, type_hint: Option<&str>) -> Result<Image> {
        let image_type = match type_hint {
            Some(name) => name.parse()?,
            None => detect_file(locator, &self.config.io)?,
        };

        let mut image = match image_type {
            ImageType::Binary => {
                let file = FileIo::open(locator, FileMode::Binary, &self.config.io)?;
                Image::new(
                    image_type,
                    vec![binary::section_for(&file)],
                    None,
                    FormatState::Binary { file },
                )
            }
            ImageType::IHex => {
                let mut file = FileIo::open(locator, FileMode::Text, &self.config.io)?;
                let decoded = ihex::decode(&mut file, self.config.max_ihex_sections)
                    .map_err(|e| log_error!(e, "failed buffering IHEX image"))?;
                Image::new(
                    image_type,
                    decoded.sections,
                    decoded.start_address,
                    FormatState::IHex {
                        arena: decoded.arena,
                    },
                )
            }
            ImageType::SRecord => {
                let mut file = FileIo::open(locator, FileMode::Text, &self.config.io)?;
                let decoded = srec::decode(&mut file)
                    .map_err(|e| log_error!(e, "failed buffering S19 image"))?;
                Image::new(
                    image_type,
                    decoded.sections,
                    decoded.start_address,
                    FormatState::SRecord {
                        arena: decoded.arena,
                    },
                )
            }
            ImageType::Elf => {
                let file = FileIo::open(locator, FileMode::Binary, &self.config.io)?;
                let layout = ElfImage::read_headers(file)?;
                Image::new(
                    image_type,
                    layout.sections,
                    Some(layout.start_address),
                    FormatState::Elf(layout.image),
                )
            }
            ImageType::Memory => {
                let target = self
                    .targets
                    .get(locator)
                    .ok_or_else(|| log_error!(ImageError::TargetNotFound(locator.to_string())))?;
                Image::new(
                    image_type,
                    vec![Section::new(
                        0,
                        MEMORY_SECTION_SIZE,
                        SectionFlags::empty(),
                        Backing::Source,
                    )],
                    None,
                    FormatState::Memory(MemoryImage::new(
                        locator,
                        target.clone(),
                        self.config.memory_cache_size,
                    )),
                )
            }
            ImageType::Builder => Image::new(image_type, Vec::new(), None, FormatState::Builder),
        };

        if let Some(offset) = self.base_address {
            for section in image.sections.iter_mut() {
                section.relocate(offset);
            }
            debug!(offset = format_args!("{:#x}", offset), "image relocated");
        }

        info!(
            locator,
            image_type = %image.image_type,
            sections = image.sections.len(),
            "image opened"
        );
        Ok(image)
    }
}

/// A decoded image: sections plus optional start address.
#[derive(Debug)]
pub struct Image {
    image_type: ImageType,
    sections: Vec<Section>,
    start_address: Option<u64>,
    state: FormatState,
}

impl Image {
    fn new(
        image_type: ImageType,
        sections: Vec<Section>,
        start_address: Option<u64>,
        state: FormatState,
    ) -> Self {
        Self {
            image_type,
            sections,
            start_address,
            state,
        }
    }

    /// Open with the default loader configuration.
    pub fn open(locator: &str, type_hint: Option<&str>) -> Result<Self> {
        ImageLoader::default().open(locator, type_hint)
    }

    /// An empty image that accepts [`add_section`](Self::add_section).
    pub fn builder() -> Self {
        Self::new(ImageType::Builder, Vec::new(), None, FormatState::Builder)
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn start_address(&self) -> Option<u64> {
        self.start_address
    }

    /// Read `size` bytes at `offset` within section `index`.
    ///
    /// ELF sections may return fewer bytes than asked for when the range
    /// reaches past the segment's file contents; the missing tail is zero
    /// in memory and left for the caller to fill.
    pub fn read_section(&mut self, index: usize, offset: u64, size: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        try_reserve(&mut buf, size)?;
        buf.resize(size, 0);
        let read = self.read_section_into(index, offset, &mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// Read into `buf`, returning how many bytes were supplied.
    pub fn read_section_into(&mut self, index: usize, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let count = self.sections.len();
        let section = self
            .sections
            .get(index)
            .ok_or(ImageError::InvalidSection { index, count })?;

        let size = buf.len() as u64;
        if offset.checked_add(size).map_or(true, |end| end > section.size()) {
            debug!(
                index,
                offset = format_args!("{:#x}", offset),
                size = format_args!("{:#x}", size),
                section_size = format_args!("{:#x}", section.size()),
                "read past end of section"
            );
            return Err(ImageError::OutOfRange {
                section: index,
                offset,
                size,
                section_size: section.size(),
            });
        }

        match (&mut self.state, &section.backing) {
            (FormatState::Binary { file }, Backing::Source) => binary::read(file, offset, buf),
            (FormatState::IHex { arena }, Backing::Arena(start))
            | (FormatState::SRecord { arena }, Backing::Arena(start)) => {
                let from = start + offset as usize;
                buf.copy_from_slice(&arena[from..from + buf.len()]);
                Ok(buf.len())
            }
            (FormatState::Elf(elf), Backing::Segment(segment)) => {
                elf.read_segment(*segment, offset, buf)
            }
            (FormatState::Memory(memory), Backing::Source) => {
                memory.read(section.base_address().wrapping_add(offset), buf)
            }
            (FormatState::Builder, Backing::Owned(data)) => {
                let from = offset as usize;
                buf.copy_from_slice(&data[from..from + buf.len()]);
                Ok(buf.len())
            }
            (state, backing) => Err(ImageError::Format(format!(
                "section {} backing {:?} does not belong to a {} image ({:?})",
                index, backing, self.image_type, state
            ))),
        }
    }

    /// Append a block to a builder image, merging with the last section
    /// when it continues it exactly.
    pub fn add_section(&mut self, base_address: u64, flags: SectionFlags, data: &[u8]) -> Result<()> {
        if !matches!(self.state, FormatState::Builder) {
            return Err(log_error!(ImageError::NotABuilder(self.image_type.as_str())));
        }
        builder::append(&mut self.sections, base_address, flags, data)
    }

    /// Resolve names to addresses using the ELF section and symbol tables.
    pub fn resolve_symbols(&mut self, names: &[&str]) -> Result<Vec<SymbolAddress>> {
        match &mut self.state {
            FormatState::Elf(elf) => elf.resolve_symbols(names),
            _ => Err(log_error!(ImageError::Format(format!(
                "Symbol resolution needs an ELF image, this one is {}",
                self.image_type
            )))),
        }
    }

    /// CRC-32 over the full contents of section `index`.
    pub fn section_checksum(&mut self, index: usize) -> Result<u32> {
        self.section_checksum_with(index, &GlobalShutdown)
    }

    /// [`section_checksum`](Self::section_checksum) with a caller-chosen
    /// cancellation poll.
    pub fn section_checksum_with(&mut self, index: usize, shutdown: &dyn ShutdownPoll) -> Result<u32> {
        let size = self
            .section(index)
            .ok_or(ImageError::InvalidSection {
                index,
                count: self.sections.len(),
            })?
            .size();
        let data = self.read_section(index, 0, size as usize)?;
        calculate_checksum_with(&data, shutdown)
    }

    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            image_type: self.image_type,
            start_address: self.start_address,
            sections: self
                .sections
                .iter()
                .enumerate()
                .map(|(index, s)| SectionSummary {
                    index,
                    base_address: s.base_address(),
                    size: s.size(),
                    flags: s.flags(),
                })
                .collect(),
        }
    }

    /// Release the image and everything it holds.
    pub fn close(self) {
        debug!(
            image_type = %self.image_type,
            sections = self.sections.len(),
            "image closed"
        );
    }
}

/// Serializable description of an image's layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub image_type: ImageType,
    pub start_address: Option<u64>,
    pub sections: Vec<SectionSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub index: usize,
    pub base_address: u64,
    pub size: u64,
    pub flags: SectionFlags,
}

impl ImageSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Total bytes across all sections.
    pub fn total_size(&self) -> u64 {
        self.sections.iter().map(|s| s.size).sum()
    }
}
