//! Buffered block-aligned file — the dual-purpose scratch buffer that
//! serves both parse-time reads and post-parse writes from the same
//! memory.
//!
//! `pos` and `written` are the only state threaded between calls. Before
//! parsing finishes the buffer is a *read* window: `pos <= written`, and
//! `[pos, written)` holds prefetched-but-unconsumed input. After parsing
//! finishes (`finish_parse`) the buffer is a *write* window: `written <=
//! pos`, and `[written, pos)` holds dirty bytes not yet flushed to the fd.
//! The crate models this as one `Vec<u8>` with two cursors rather than a
//! tagged `Reading`/`Writing` enum — both modes share the same backing
//! allocation, and the single documented transition between them
//! (`finish_parse`) is just a cursor reset, not a move between variants.
//!
//! Invariant maintained throughout: the file descriptor's actual offset
//! always equals `buffer_start + written`, where `buffer_start` is the
//! absolute file offset the current buffer window began at. Every method
//! below preserves this; it is what lets `commit` and the write slow path
//! avoid any explicit `lseek` of their own.

use std::fs::File;

use crate::error::{BobError, Result};
use crate::syscall;

fn ceil_to_multiple(value: u64, multiple: u64) -> u64 {
    if value == 0 {
        0
    } else {
        value.div_ceil(multiple) * multiple
    }
}

pub struct BufferedFile {
    file: File,
    blocksize: usize,
    buf: Vec<u8>,
    pos: usize,
    written: usize,
}

impl BufferedFile {
    /// Wrap `file` with a fresh `blocksize`-sized scratch buffer, positioned
    /// as an empty write window (`pos = written = 0`). Used by `create` and
    /// by the cue manager when starting a new segment.
    pub fn new_write(file: File, blocksize: usize) -> Self {
        Self {
            file,
            blocksize,
            buf: vec![0u8; blocksize],
            pos: 0,
            written: 0,
        }
    }

    /// Wrap `file` with a fresh `blocksize`-sized scratch buffer, positioned
    /// as an empty read window (`pos = written = 0`), ready for
    /// [`read`](Self::read) to pull in the header during `open`.
    pub fn new_read(file: File, blocksize: usize) -> Self {
        Self {
            file,
            blocksize,
            buf: vec![0u8; blocksize],
            pos: 0,
            written: 0,
        }
    }

    pub fn blocksize(&self) -> usize {
        self.blocksize
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn into_file(self) -> File {
        self.file
    }

    // ── Write path ───────────────────────────────────────────────────────

    /// Append `data` to the write buffer, flushing and pre-allocating as
    /// needed. Preserves `pos`/`written` as documented above.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        debug_assert!(self.written <= self.pos);
        let count = data.len();

        // Fast path: fits in the remainder of the current block.
        if self.pos + count <= self.blocksize {
            self.buf[self.pos..self.pos + count].copy_from_slice(data);
            self.pos += count;
            return Ok(());
        }

        // Slow path: this write crosses one or more block boundaries.
        let blocksize = self.blocksize as u64;
        let aligned = ceil_to_multiple((self.pos + count) as u64, blocksize);

        // Reserve every byte from the fd's current offset (buffer_start +
        // written) out to the aligned boundary. Reserving slightly more
        // than strictly necessary (the as-yet-unflushed `[written, pos)`
        // prefix is already destined to hold real data) is harmless —
        // KEEP_SIZE reservations are overwritten by the writes below.
        let reserve = aligned - self.written as u64;
        syscall::preallocate_next(&self.file, reserve)?;

        // Flush the dirty prefix so the fd is caught up to `pos`.
        self.commit()?;

        let surplus = self.blocksize - self.pos;
        let remaining = count - surplus;
        let full_blocks = remaining / self.blocksize;
        let towrite = surplus + full_blocks * self.blocksize;

        syscall::write_all(&self.file, &data[..towrite])?;

        let tail = &data[towrite..];
        self.buf[..tail.len()].copy_from_slice(tail);
        self.written = 0;
        self.pos = tail.len();

        Ok(())
    }

    /// Reset to an empty write window at the fd's current offset, with
    /// nothing buffered. Used by the cue manager after seeking to a fresh
    /// cue boundary, where `buffer_start` becomes that boundary itself.
    pub fn reset_write_window(&mut self) {
        self.pos = 0;
        self.written = 0;
    }

    /// Flush `[written, pos)` to the fd and advance `written = pos`.
    /// Idempotent when the buffer is already clean.
    ///
    /// Note: this does *not* reset `written` to 0 when `pos == blocksize`
    /// (a full block was just flushed). That looks like it should matter,
    /// but the next `write` call's slow-path branch (`pos + count >
    /// blocksize`) takes over realignment in that case regardless — see
    /// the design notes for why "helpfully" resetting the cursors here
    /// would be redundant, not incorrect, but is avoided to keep this
    /// method's postcondition exactly `written == pos`.
    pub fn commit(&mut self) -> Result<()> {
        if self.written < self.pos {
            syscall::write_all(&self.file, &self.buf[self.written..self.pos])?;
            self.written = self.pos;
        }
        Ok(())
    }

    /// Transition from a read buffer (end of parse) to a write buffer
    /// aligned to a block boundary: the next `write` call takes the slow
    /// path and realigns before emitting any user bytes.
    pub fn finish_parse(&mut self) {
        self.pos = self.blocksize;
        self.written = self.blocksize;
    }

    /// Extend the file's logical length up to the next multiple of
    /// `blocksize`, past the fd's current offset, without moving that
    /// offset or touching the buffer. The gap is a sparse hole (a
    /// `set_len` past current EOF reads back as zero, same as an unwritten
    /// `fallocate` reservation) rather than a real write, so it costs no
    /// disk space until something overwrites it.
    ///
    /// Must be called with the buffer fully flushed (`written == pos`) —
    /// callers only reach for this right after `commit`.
    pub fn pad_to_block_boundary(&self) -> Result<()> {
        debug_assert_eq!(self.written, self.pos);
        let offset = syscall::tell(&self.file)?;
        let aligned = ceil_to_multiple(offset, self.blocksize as u64);
        if aligned > offset {
            self.file.set_len(aligned)?;
        }
        Ok(())
    }

    /// Reconcile the provisional buffer size used to read the header with
    /// the `true_blocksize` the header actually declares. No-op if they
    /// already match.
    ///
    /// The common case is `written >= true_blocksize`: the provisional
    /// buffer (sized [`crate::header::DEFAULT_BLOCK_SIZE`]) prefetched more
    /// than one true block's worth of data. The surplus belongs to the next
    /// block, not this one, so it is pushed back onto the fd with a
    /// relative seek, leaving the fd positioned exactly one true block past
    /// `buffer_start`; `written` is then set to `true_blocksize` to match.
    /// `pos` (the header's already-consumed length) is untouched — it is
    /// always far smaller than `true_blocksize` in practice since
    /// `MIN_BLOCK_SIZE` is 512 bytes.
    ///
    /// If instead `true_blocksize` exceeds what the provisional buffer
    /// prefetched (only possible when the resolved blocksize is larger than
    /// the default probe buffer), top the buffer up to `true_blocksize`
    /// with further reads instead of rewinding.
    pub fn rebind_after_header(&mut self, true_blocksize: usize) -> Result<()> {
        if true_blocksize == self.blocksize {
            return Ok(());
        }

        if self.written >= true_blocksize {
            let surplus = (self.written - true_blocksize) as i64;
            syscall::seek_cur(&self.file, -surplus)?;
            let mut new_buf = vec![0u8; true_blocksize];
            new_buf.copy_from_slice(&self.buf[..true_blocksize]);
            self.buf = new_buf;
            self.blocksize = true_blocksize;
            self.written = true_blocksize;
        } else {
            let mut new_buf = vec![0u8; true_blocksize];
            new_buf[..self.written].copy_from_slice(&self.buf[..self.written]);
            self.buf = new_buf;
            self.blocksize = true_blocksize;
            while self.written < true_blocksize {
                let n = syscall::read(&self.file, &mut self.buf[self.written..true_blocksize])?;
                if n == 0 {
                    break;
                }
                self.written += n;
            }
        }
        Ok(())
    }

    // ── Read path (parse-time only) ─────────────────────────────────────

    /// Fill `out` completely, refilling the buffer from the fd as needed.
    /// Returns a corrupt-sequence error if EOF is hit while a read is
    /// still outstanding.
    pub fn read(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            if self.pos == self.written {
                if !self.refill()? {
                    return Err(BobError::Corrupt(
                        "unexpected EOF while reading a record".into(),
                    ));
                }
                continue;
            }
            let avail = self.written - self.pos;
            let take = avail.min(out.len() - filled);
            out[filled..filled + take].copy_from_slice(&self.buf[self.pos..self.pos + take]);
            self.pos += take;
            filled += take;
        }
        Ok(())
    }

    /// Read one byte, for the varint decoder's byte-at-a-time protocol.
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read(&mut b)?;
        Ok(b[0])
    }

    /// Attempt a refill; returns `true` iff zero bytes remained available
    /// and the underlying read returned EOF (buffer genuinely exhausted).
    pub fn is_eof(&mut self) -> Result<bool> {
        if self.pos < self.written {
            return Ok(false);
        }
        Ok(!self.refill()?)
    }

    /// Refill `[written, blocksize)` from the fd. Resets cursors to 0 first
    /// if the buffer was fully consumed. Returns `false` at EOF.
    fn refill(&mut self) -> Result<bool> {
        if self.written == self.blocksize {
            self.pos = 0;
            self.written = 0;
        }
        let n = syscall::read(&self.file, &mut self.buf[self.written..self.blocksize])?;
        if n == 0 {
            return Ok(false);
        }
        self.written += n;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};

    fn tempfile() -> File {
        tempfile::tempfile().unwrap()
    }

    #[test]
    fn fast_path_write_stays_in_buffer() {
        let mut bf = BufferedFile::new_write(tempfile(), 64);
        bf.write(b"hello").unwrap();
        assert_eq!(bf.pos, 5);
        assert_eq!(bf.written, 0);
        // Nothing flushed yet — file should be empty.
        let meta = bf.file().metadata().unwrap();
        assert_eq!(meta.len(), 0);
    }

    #[test]
    fn commit_flushes_dirty_prefix() {
        let mut bf = BufferedFile::new_write(tempfile(), 64);
        bf.write(b"hello").unwrap();
        bf.commit().unwrap();
        assert_eq!(bf.written, bf.pos);
        let mut f = bf.into_file();
        f.seek(SeekFrom::Start(0)).unwrap();
        let mut out = vec![0u8; 5];
        std::io::Read::read_exact(&mut f, &mut out).unwrap();
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn slow_path_crosses_block_boundary() {
        let mut bf = BufferedFile::new_write(tempfile(), 8);
        bf.write(b"1234567").unwrap(); // 7 bytes, fits
        bf.write(b"89ABCDEF").unwrap(); // crosses the 8-byte boundary
        bf.commit().unwrap();
        let mut f = bf.into_file();
        let len = f.metadata().unwrap().len();
        assert!(len >= 15);
        f.seek(SeekFrom::Start(0)).unwrap();
        let mut out = vec![0u8; 15];
        std::io::Read::read_exact(&mut f, &mut out).unwrap();
        assert_eq!(&out, b"123456789ABCDEF");
    }

    #[test]
    fn read_refills_across_boundary() {
        let mut f = tempfile();
        std::io::Write::write_all(&mut f, b"abcdefgh").unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        let mut bf = BufferedFile::new_read(f, 4);
        let mut out = vec![0u8; 8];
        bf.read(&mut out).unwrap();
        assert_eq!(&out, b"abcdefgh");
    }

    #[test]
    fn read_past_eof_is_corrupt() {
        let mut f = tempfile();
        std::io::Write::write_all(&mut f, b"ab").unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        let mut bf = BufferedFile::new_read(f, 4);
        let mut out = vec![0u8; 4];
        assert!(bf.read(&mut out).is_err());
    }
}
