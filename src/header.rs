//! Segment header codec: magic (first segment only) followed by a
//! sequence of varint-encoded `(configId, value)` pairs terminated by
//! `END`.
//!
//! ```text
//! [ MAGIC "BOB\0" ]?          -- only the very first segment of a file
//! (configId: varint, value: varint)*
//! END: varint = 0
//! ```

use crate::buffered::BufferedFile;
use crate::error::{BobError, Result};
use crate::varint;

pub const MAGIC: [u8; 4] = *b"BOB\0";

pub const CONFIG_END: u64 = 0;
pub const CONFIG_BLOCK_SIZE: u64 = 1;
pub const CONFIG_CUE_SIZE: u64 = 2;

pub const MIN_BLOCK_SIZE: u64 = 512;
pub const MAX_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Default provisional buffer size used before the true blocksize is known
/// (i.e. before the header of an existing file has been read).
pub const DEFAULT_BLOCK_SIZE: u64 = 32 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub blocksize: u64,
    pub cuesize: u64,
}

impl Header {
    /// Serialize the header's varint-pair body (magic is written
    /// separately by the caller, only for the first segment).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&varint::encode_vec(CONFIG_BLOCK_SIZE));
        out.extend_from_slice(&varint::encode_vec(self.blocksize));
        out.extend_from_slice(&varint::encode_vec(CONFIG_CUE_SIZE));
        out.extend_from_slice(&varint::encode_vec(self.cuesize));
        out.extend_from_slice(&varint::encode_vec(CONFIG_END));
        out
    }

    /// Write MAGIC (if `first_segment`) then the header body into `bf`.
    pub fn write(&self, bf: &mut BufferedFile, first_segment: bool) -> Result<()> {
        if first_segment {
            bf.write(&MAGIC)?;
        }
        bf.write(&self.encode())?;
        Ok(())
    }

    /// Read MAGIC (if `first_segment`) then decode and validate the header
    /// body from `bf`. Returns the resolved header; bounds/alignment
    /// failures are reported as [`BobError::Corrupt`].
    pub fn read(bf: &mut BufferedFile, first_segment: bool) -> Result<Self> {
        if first_segment {
            let mut magic = [0u8; 4];
            bf.read(&mut magic)?;
            if magic != MAGIC {
                return Err(BobError::Corrupt("bad magic".into()));
            }
        }

        let mut blocksize = None;
        let mut cuesize = None;

        loop {
            let id = read_varint(bf)?;
            match id {
                CONFIG_END => break,
                CONFIG_BLOCK_SIZE => blocksize = Some(read_varint(bf)?),
                CONFIG_CUE_SIZE => cuesize = Some(read_varint(bf)?),
                other => {
                    return Err(BobError::Corrupt(format!("unknown config id {other}")));
                }
            }
        }

        let blocksize = blocksize
            .ok_or_else(|| BobError::Corrupt("header missing blocksize".into()))?;
        let cuesize =
            cuesize.ok_or_else(|| BobError::Corrupt("header missing cuesize".into()))?;

        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&blocksize) {
            return Err(BobError::Corrupt(format!(
                "blocksize {blocksize} out of range [{MIN_BLOCK_SIZE}, {MAX_BLOCK_SIZE}]"
            )));
        }
        if cuesize < blocksize || cuesize % blocksize != 0 {
            return Err(BobError::Corrupt(format!(
                "cuesize {cuesize} is not a multiple of blocksize {blocksize} ≥ blocksize"
            )));
        }

        bf.rebind_after_header(blocksize as usize)?;

        Ok(Self { blocksize, cuesize })
    }
}

fn read_varint(bf: &mut BufferedFile) -> Result<u64> {
    let mut dec = varint::Decoder::new();
    loop {
        let byte = bf.read_byte()?;
        if let Some(v) = dec.step(byte)? {
            return Ok(v);
        }
    }
}
