//! Sequential file access for image decoders.
//!
//! This module provides a `FileIo` handle with the small set of operations the
//! decoders need: seek, read, read-exact, read-line, size and end-of-file. The
//! file is memory-mapped read-only and a cursor tracks the current position, so
//! seeks are free and line scans never copy more than one line.

pub mod error;

use crate::io::error::{IoError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Defines the resource limits for I/O operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024 * 1024, // 256MB
        }
    }
}

/// How line reads treat line terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Lines end at `\n`; any `\r` is kept.
    Binary,
    /// Lines end at `\n` and a trailing `\r` is dropped.
    Text,
}

/// A read-only file handle with a cursor.
pub struct FileIo {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
    mode: FileMode,
    position: u64,
    file_size: u64,
}

impl std::fmt::Debug for FileIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIo")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("position", &self.position)
            .field("file_size", &self.file_size)
            .finish()
    }
}

impl FileIo {
    /// Opens and memory-maps a file.
    ///
    /// Fails with `IoError::FileTooLarge` if the file exceeds `limits.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, mode: FileMode, limits: &IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            mode = ?mode,
            "Opening image file"
        );

        if file_size > limits.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = limits.max_file_size,
                "File is too large"
            );
            return Err(IoError::FileTooLarge {
                limit: limits.max_file_size,
                found: file_size,
            });
        }

        let mmap = if file_size == 0 {
            None
        } else {
            // Safety: read-only map of a regular file; the handle never hands out
            // references that outlive `self`.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            mode,
            position: 0,
            file_size,
        })
    }

    /// Returns the path the handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the total size of the underlying file in bytes.
    pub fn size(&self) -> u64 {
        self.file_size
    }

    /// Returns the current cursor position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once the cursor has reached the end of the file.
    pub fn is_eof(&self) -> bool {
        self.position >= self.file_size
    }

    /// Moves the cursor to an absolute offset.
    ///
    /// Seeking past the end is allowed; subsequent reads return no data.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        trace!(path = %self.path.display(), offset, "Seek");
        self.position = offset;
        Ok(())
    }

    fn remaining(&self) -> &[u8] {
        match &self.mmap {
            Some(map) if self.position < self.file_size => &map[self.position as usize..],
            _ => &[],
        }
    }

    /// Reads up to `buf.len()` bytes and returns how many were read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.remaining();
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n as u64;
        Ok(n)
    }

    /// Fills `buf` completely or fails with `IoError::Truncated`.
    ///
    /// The cursor does not move on failure.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let available = self.remaining().len();
        if available < buf.len() {
            return Err(IoError::Truncated {
                offset: self.position,
                needed: buf.len(),
                available,
            });
        }
        self.read(buf)?;
        Ok(())
    }

    /// Reads exactly `len` bytes into a fresh buffer.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Returns the next line without its terminator, or `None` at end of file.
    pub fn read_line(&mut self) -> Result<Option<Bytes>> {
        let rest = self.remaining();
        if rest.is_empty() {
            return Ok(None);
        }

        let (line, consumed) = match memchr::memchr(b'\n', rest) {
            Some(nl) => (&rest[..nl], nl + 1),
            None => (rest, rest.len()),
        };
        let line = match (self.mode, line.last()) {
            (FileMode::Text, Some(b'\r')) => &line[..line.len() - 1],
            _ => line,
        };

        let out = Bytes::copy_from_slice(line);
        self.position += consumed as u64;
        Ok(Some(out))
    }
}
