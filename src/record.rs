//! Record log parser / replayer: reads a stream of `(blockId, payload)`
//! records from a segment body and replays them into an in-memory
//! reconstruction buffer, producing the final "current" bytes.
//!
//! Only one record kind exists today (`REWRITE`), so replay degenerates to
//! "keep the payload of the last record seen, discard everything before
//! it" — but the loop is written to reject any other kind as a format
//! error rather than silently skip it, so a future record kind can be
//! added without weakening this parser's guarantees for old files.
//!
//! Block id `0` is reserved as a padding sentinel rather than a real
//! record kind: rounding the final block up to alignment (see
//! `BufferedFile::pad_to_block_boundary`) extends the segment with a
//! zero-filled hole past the last real record, and the first byte of
//! that hole decodes as a one-byte varint `0`. Seeing it ends replay the
//! same as physical EOF would; anything else unrecognized is still a
//! format error.

use crate::buffered::BufferedFile;
use crate::error::{BobError, Result};
use crate::varint;

pub const BLOCK_REWRITE: u64 = 1;
pub const BLOCK_PAD: u64 = 0;

/// Replay every record in the current segment body, returning the bytes
/// of the last `REWRITE` record seen (or an empty buffer if the segment
/// has no records yet — a freshly created, unwritten-to container).
///
/// Consumes `bf` until EOF; does not transition `bf` into write mode —
/// callers do that explicitly via [`BufferedFile::finish_parse`] once
/// replay across every segment is complete.
pub fn replay(bf: &mut BufferedFile) -> Result<Vec<u8>> {
    let mut current = Vec::new();

    loop {
        if bf.is_eof()? {
            return Ok(current);
        }

        let block_id = read_varint(bf)?;
        match block_id {
            BLOCK_REWRITE => {
                let len = read_varint(bf)? as usize;
                let mut payload = vec![0u8; len];
                bf.read(&mut payload)?;
                current = payload;
            }
            BLOCK_PAD => return Ok(current),
            other => {
                return Err(BobError::Corrupt(format!("unknown record kind {other}")));
            }
        }
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

/// Encode a single `REWRITE` record: `[REWRITE varint][len varint][bytes]`.
pub fn encode_rewrite(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 * varint::MAX_ENCODED_LEN + bytes.len());
    out.extend_from_slice(&varint::encode_vec(BLOCK_REWRITE));
    out.extend_from_slice(&varint::encode_vec(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out
}
