//! Live target memory viewed as an image.
//!
//! The whole 32-bit address space is one section. Reads go through a single
//! aligned cache block that is refilled from the target on every miss.

use crate::error::{try_reserve, ImageError, Result};
use crate::log_error;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Size of the single section exposed by a memory image.
pub const MEMORY_SECTION_SIZE: u64 = 0xffff_ffff;

/// Failure reported by a target memory accessor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target not halted")]
    NotHalted,
    #[error("memory access fault at {address:#x}")]
    AccessFault { address: u64 },
    #[error("target disconnected")]
    Disconnected,
    #[error("{0}")]
    Other(String),
}

/// Read access to the memory of a live target.
pub trait TargetMemory: Send {
    /// Fill `buf` with target memory starting at `address`.
    fn read_buffer(&mut self, address: u64, buf: &mut [u8]) -> std::result::Result<(), TargetError>;
}

/// Target handle shared between a loader's registry and the images it opens.
pub type SharedTarget = Arc<Mutex<dyn TargetMemory>>;

pub struct MemoryImage {
    target_name: String,
    target: SharedTarget,
    cache: Option<Vec<u8>>,
    cache_address: u64,
    cache_size: usize,
}

impl fmt::Debug for MemoryImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryImage")
            .field("target", &self.target_name)
            .field("cached", &self.cache.is_some())
            .field("cache_address", &self.cache_address)
            .field("cache_size", &self.cache_size)
            .finish()
    }
}

impl MemoryImage {
    /// `cache_size` must be a nonzero power of two (checked by the loader config).
    pub fn new(target_name: impl Into<String>, target: SharedTarget, cache_size: usize) -> Self {
        Self {
            target_name: target_name.into(),
            target,
            cache: None,
            cache_address: 0,
            cache_size,
        }
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Base of the cached block, if one is loaded.
    pub fn cached_block(&self) -> Option<u64> {
        self.cache.as_ref().map(|_| self.cache_address)
    }

    /// Drop the cache; the next read refills it from the target.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    fn block_base(&self, address: u64) -> u64 {
        address & !(self.cache_size as u64 - 1)
    }

    fn is_cached(&self, address: u64) -> bool {
        self.cache.is_some()
            && address >= self.cache_address
            && address - self.cache_address < self.cache_size as u64
    }

    fn refill(&mut self, address: u64) -> Result<()> {
        let block = self.block_base(address);

        let mut cache = match self.cache.take() {
            Some(cache) => cache,
            None => {
                let mut cache = Vec::new();
                try_reserve(&mut cache, self.cache_size)?;
                cache.resize(self.cache_size, 0);
                cache
            }
        };

        let outcome = match self.target.lock() {
            Ok(mut target) => target.read_buffer(block, &mut cache),
            Err(_) => Err(TargetError::Other("target lock poisoned".to_string())),
        };

        // a failed fill leaves the cache dropped
        if let Err(err) = outcome {
            return Err(log_error!(ImageError::TemporarilyUnavailable {
                address: block,
                reason: err.to_string(),
            }));
        }

        debug!(target_name = %self.target_name, block = format_args!("{:#x}", block), "memory cache refilled");
        self.cache = Some(cache);
        self.cache_address = block;
        Ok(())
    }

    /// Copy `buf.len()` bytes of target memory starting at `address`.
    pub(crate) fn read(&mut self, address: u64, buf: &mut [u8]) -> Result<usize> {
        let mut done = 0;

        while done < buf.len() {
            let current = address.wrapping_add(done as u64);
            if !self.is_cached(current) {
                self.refill(current)?;
            }

            let cache = match self.cache.as_ref() {
                Some(cache) => cache,
                None => break,
            };
            let start = (current - self.cache_address) as usize;
            let count = (buf.len() - done).min(self.cache_size - start);
            buf[done..done + count].copy_from_slice(&cache[start..start + count]);
            done += count;
        }

        Ok(done)
    }
}
