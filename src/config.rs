//! Configuration record: the two knobs a caller may set before `create`,
//! plus the "auto" resolution rules that turn zero/unset values into the
//! concrete `(blocksize, cuesize)` pair persisted in the header.
//!
//! Mirrors the teacher's `PackOptions`: a plain, constructible/settable
//! struct with a `Default` impl for the zero state and builder-style
//! setters. The struct itself never rejects a value — only [`resolve`]
//! (run once, at `create`) validates against the header codec's bounds.

use std::fs::File;

use crate::error::{BobError, Result};
use crate::header::{Header, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::syscall;

/// `cuesize`'s auto value, and the floor a too-small explicit `cuesize`
/// is bumped back up to, as a multiple of the resolved blocksize.
const AUTO_CUESIZE_BLOCKS: u64 = 32;

/// Ceiling on `cuesize` regardless of what the caller requests.
const MAX_CUESIZE: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    blocksize: u64,
    cuesize: u64,
}

impl Config {
    pub fn with_blocksize(mut self, n: u64) -> Self {
        self.blocksize = n;
        self
    }

    pub fn with_cuesize(mut self, n: u64) -> Self {
        self.cuesize = n;
        self
    }

    pub fn blocksize(&self) -> u64 {
        self.blocksize
    }

    pub fn cuesize(&self) -> u64 {
        self.cuesize
    }

    /// Turn the requested (possibly zero/auto) values into a concrete,
    /// validated `Header`. `file` is the freshly created container file,
    /// consulted via `fstatvfs` when `blocksize` is auto.
    pub(crate) fn resolve(&self, file: &File) -> Result<Header> {
        let blocksize = if self.blocksize == 0 {
            syscall::probe_block_size(file)
                .filter(|bs| (MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(bs))
                .unwrap_or(DEFAULT_BLOCK_SIZE)
        } else {
            if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.blocksize) {
                return Err(BobError::InvalidArgument(
                    "blocksize out of range [512, 4 MiB]",
                ));
            }
            self.blocksize
        };

        let cuesize = if self.cuesize == 0 {
            blocksize * AUTO_CUESIZE_BLOCKS
        } else {
            let clamped = self.cuesize.min(MAX_CUESIZE);
            let rounded = (clamped / blocksize) * blocksize;
            if rounded < blocksize {
                blocksize * AUTO_CUESIZE_BLOCKS
            } else {
                rounded
            }
        };

        Ok(Header { blocksize, cuesize })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_auto() {
        let cfg = Config::default();
        assert_eq!(cfg.blocksize(), 0);
        assert_eq!(cfg.cuesize(), 0);
    }

    #[test]
    fn builder_setters_roundtrip() {
        let cfg = Config::default().with_blocksize(4096).with_cuesize(8192);
        assert_eq!(cfg.blocksize(), 4096);
        assert_eq!(cfg.cuesize(), 8192);
    }

    #[test]
    fn resolve_auto_cuesize_is_32_blocks() {
        let f = tempfile::tempfile().unwrap();
        let cfg = Config::default().with_blocksize(4096);
        let header = cfg.resolve(&f).unwrap();
        assert_eq!(header.blocksize, 4096);
        assert_eq!(header.cuesize, 4096 * AUTO_CUESIZE_BLOCKS);
    }

    #[test]
    fn resolve_rejects_out_of_range_blocksize() {
        let f = tempfile::tempfile().unwrap();
        let cfg = Config::default().with_blocksize(10);
        assert!(cfg.resolve(&f).is_err());
    }

    #[test]
    fn resolve_too_small_cuesize_falls_back_to_auto() {
        let f = tempfile::tempfile().unwrap();
        let cfg = Config::default().with_blocksize(4096).with_cuesize(100);
        let header = cfg.resolve(&f).unwrap();
        assert_eq!(header.cuesize, 4096 * AUTO_CUESIZE_BLOCKS);
    }

    #[test]
    fn resolve_clamps_cuesize_ceiling() {
        let f = tempfile::tempfile().unwrap();
        let cfg = Config::default().with_blocksize(4096).with_cuesize(u64::MAX);
        let header = cfg.resolve(&f).unwrap();
        assert!(header.cuesize <= MAX_CUESIZE);
        assert_eq!(header.cuesize % 4096, 0);
    }
}
