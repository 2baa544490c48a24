//! Configuration for the image loader.
//!
//! Provides centralized configuration for all decoders with sensible defaults.
//! Configurations round-trip through JSON so tools can keep them in a file.

use crate::error::{ImageError, Result};
use crate::io::IOLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default size of the live-memory cache block in bytes.
pub const DEFAULT_MEMORY_CACHE_SIZE: usize = 2048;

/// Default upper bound on the number of sections an IHEX file may produce.
pub const DEFAULT_MAX_IHEX_SECTIONS: usize = 512;

/// Master configuration for opening images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// I/O limits applied to every file-backed image.
    pub io: IOLimits,
    /// Size of the aligned block fetched per live-memory cache miss.
    pub memory_cache_size: usize,
    /// Maximum number of sections an IHEX decode may produce.
    pub max_ihex_sections: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            io: IOLimits::default(),
            memory_cache_size: DEFAULT_MEMORY_CACHE_SIZE,
            max_ihex_sections: DEFAULT_MAX_IHEX_SECTIONS,
        }
    }
}

impl LoaderConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ImageError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ImageError::InvalidConfig(e.to_string()))
    }

    /// Check value constraints the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.memory_cache_size.is_power_of_two() {
            return Err(ImageError::InvalidConfig(format!(
                "memory_cache_size must be a nonzero power of two, got {}",
                self.memory_cache_size
            )));
        }
        if self.max_ihex_sections == 0 {
            return Err(ImageError::InvalidConfig(
                "max_ihex_sections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
