//! Public handle layer: `Bob`, the owning, single-threaded API object that
//! wraps one open container.
//!
//! Carries the buffered file, the resolved header, the running cue-start
//! offset, and an in-memory copy of the currently committed bytes
//! (`data`) plus `offset` marking where the user-visible payload begins
//! inside it. `offset > 0` exactly when `data` is the most recently
//! written `REWRITE` record, so [`Bob::current`] can borrow straight out
//! of it instead of copying.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use crate::buffered::BufferedFile;
use crate::config::Config;
use crate::cue;
use crate::error::Result;
use crate::header::{Header, DEFAULT_BLOCK_SIZE};
use crate::record;
use crate::syscall;

/// Unlinks a just-created path on drop unless [`disarm`](Self::disarm) is
/// called — the Rust realization of "release resources acquired so far on
/// a mid-`create` failure, then propagate the original error."
struct UnlinkGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> UnlinkGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for UnlinkGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(self.path);
        }
    }
}

pub struct Bob {
    bf: BufferedFile,
    header: Header,
    /// Absolute offset the current (last) cue segment starts at.
    cue_start: u64,
    data: Vec<u8>,
    offset: usize,
}

impl Bob {
    /// Create a new container at `path`. Fails with
    /// `io::ErrorKind::AlreadyExists` if the path is already occupied.
    pub fn create<P: AsRef<Path>>(cfg: Config, path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        let mut guard = UnlinkGuard::new(path);
        let result = Self::create_inner(cfg, file);
        if result.is_ok() {
            guard.disarm();
        }
        result
    }

    fn create_inner(cfg: Config, file: File) -> Result<Self> {
        let header = cfg.resolve(&file)?;
        let mut bf = BufferedFile::new_write(file, header.blocksize as usize);

        syscall::preallocate_next(bf.file(), header.blocksize)?;
        header.write(&mut bf, true)?;
        bf.commit()?;

        Ok(Self {
            bf,
            header,
            cue_start: 0,
            data: Vec::new(),
            offset: 0,
        })
    }

    /// Open an existing container at `path`, replaying its record log and
    /// positioning the handle for append.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let start = syscall::seek_data(&file, 0).unwrap_or(0);
        syscall::seek_set(&file, start)?;

        let mut bf = BufferedFile::new_read(file, DEFAULT_BLOCK_SIZE as usize);
        let first_segment = start == 0;
        let header = Header::read(&mut bf, first_segment)?;

        let data = record::replay(&mut bf)?;
        bf.finish_parse();

        let cue_start = (start / header.cuesize) * header.cuesize;

        Ok(Self {
            bf,
            header,
            cue_start,
            data,
            offset: 0,
        })
    }

    /// Replace the stored object with `bytes`, rolling to a new cue
    /// segment and reclaiming the previous one if `bytes` doesn't fit in
    /// the cue remainder.
    pub fn set(&mut self, bytes: &[u8]) -> Result<()> {
        let record = record::encode_rewrite(bytes);

        let remaining = cue::cue_remaining(&self.bf, self.header.cuesize)?;
        let mut rolled = false;
        if (record.len() as u64) > remaining {
            self.cue_start = cue::new_cue(&mut self.bf, &self.header, self.header.cuesize)?;
            rolled = true;
        }

        self.bf.write(&record)?;
        self.bf.commit()?;

        if rolled {
            cue::zap(&self.bf, self.cue_start)?;
        }

        let varint_len = crate::varint::encode_vec(bytes.len() as u64).len();
        self.offset = 1 + varint_len;
        self.data = record;

        Ok(())
    }

    /// Commit the write buffer, round the file out to a full block, and
    /// force it to durable storage.
    pub fn flush(&mut self) -> Result<()> {
        self.bf.commit()?;
        self.bf.pad_to_block_boundary()?;
        syscall::fsync(self.bf.file())?;
        Ok(())
    }

    /// Commit, pad to a block boundary, fsync, and release the handle.
    /// Each step is attempted independently; the first error encountered
    /// is returned, but an earlier failure does not suppress the later
    /// steps.
    pub fn close(mut self) -> Result<()> {
        let commit_result = self.bf.commit();
        let pad_result = self.bf.pad_to_block_boundary();
        let sync_result = syscall::fsync(self.bf.file());
        commit_result?;
        pad_result?;
        sync_result?;
        Ok(())
    }

    /// Borrow the currently committed bytes. Empty for a freshly created
    /// container with no `set` yet.
    pub fn current(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    pub fn resolved_blocksize(&self) -> u64 {
        self.header.blocksize
    }

    pub fn resolved_cuesize(&self) -> u64 {
        self.header.cuesize
    }
}

/// Maps `io::ErrorKind::AlreadyExists` through unchanged; present so the
/// CLI (and callers generally) can match on it without reaching into
/// `BobError::Io`'s inner `io::Error` by hand.
pub fn is_already_exists(err: &crate::error::BobError) -> bool {
    matches!(err, crate::error::BobError::Io(e) if e.kind() == io::ErrorKind::AlreadyExists)
}
