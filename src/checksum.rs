//! CRC-32 checksum matching the one debug probes and gdb compute on target.
//!
//! MSB-first, polynomial 0x04C11DB7, initial value all-ones, no final XOR
//! (the CRC-32/MPEG-2 parameter set). The lookup table is evaluated at compile
//! time.

use crate::error::{ImageError, Result};
use crate::shutdown::{GlobalShutdown, ShutdownPoll};
use tracing::debug;

/// Bytes processed between two shutdown polls.
pub const CHECKSUM_CHUNK_SIZE: usize = 32768;

const POLYNOMIAL: u32 = 0x04c1_1db7;

static CRC32_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            c = if c & 0x8000_0000 != 0 {
                (c << 1) ^ POLYNOMIAL
            } else {
                c << 1
            };
            j += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Running checksum state, for callers that feed data in pieces.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    crc: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self { crc: 0xffff_ffff }
    }
}

impl Crc32 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.crc;
        for &byte in data {
            crc = (crc << 8) ^ CRC32_TABLE[(((crc >> 24) ^ byte as u32) & 0xff) as usize];
        }
        self.crc = crc;
    }

    pub fn value(&self) -> u32 {
        self.crc
    }
}

/// Checksum `data`, polling the process-wide shutdown flag between chunks.
pub fn calculate_checksum(data: &[u8]) -> Result<u32> {
    calculate_checksum_with(data, &GlobalShutdown)
}

/// Checksum `data`, polling `shutdown` after every chunk.
///
/// Returns `ImageError::Interrupted` as soon as a poll reports a pending shutdown.
pub fn calculate_checksum_with(data: &[u8], shutdown: &dyn ShutdownPoll) -> Result<u32> {
    debug!(len = data.len(), "Calculating checksum");

    let mut crc = Crc32::new();
    for chunk in data.chunks(CHECKSUM_CHUNK_SIZE) {
        crc.update(chunk);
        if shutdown.is_shutdown_pending() {
            return Err(ImageError::Interrupted);
        }
    }

    debug!(checksum = format_args!("{:#010x}", crc.value()), "Calculating checksum done");
    Ok(crc.value())
}
