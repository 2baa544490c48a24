//! Append-only assembly of an image from caller-supplied blocks.

use crate::error::{try_reserve, Result};
use crate::image::section::{Backing, Section, SectionFlags};
use tracing::trace;

/// Append `data` at `base` to a builder's section list.
///
/// Bytes that continue the last section exactly (adjacent address, equal
/// flags) extend it in place. Anything else becomes a new section with its
/// own copy of `data`. Earlier sections are never revisited.
pub(crate) fn append(
    sections: &mut Vec<Section>,
    base: u64,
    flags: SectionFlags,
    data: &[u8],
) -> Result<()> {
    if let Some(last) = sections.last_mut() {
        let adjacent = last.base_address().checked_add(last.size()) == Some(base);
        if adjacent && last.flags() == flags {
            if let Backing::Owned(buffer) = &mut last.backing {
                try_reserve(buffer, data.len())?;
                buffer.extend_from_slice(data);
                last.grow(data.len() as u64);
                trace!(
                    base = format_args!("{:#x}", last.base_address()),
                    size = last.size(),
                    "builder section extended"
                );
                return Ok(());
            }
        }
    }

    let mut buffer = Vec::new();
    try_reserve(&mut buffer, data.len())?;
    buffer.extend_from_slice(data);
    sections.push(Section::new(
        base,
        data.len() as u64,
        flags,
        Backing::Owned(buffer),
    ));
    trace!(
        base = format_args!("{:#x}", base),
        size = data.len(),
        count = sections.len(),
        "builder section added"
    );
    Ok(())
}
