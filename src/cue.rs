//! Cue manager: tracks remaining space in the current cue block and
//! drives the roll-to-a-new-segment-plus-reclaim-the-old-one policy.
//!
//! A "cue" is the interval, in bytes, between forced full rewrites: every
//! `cuesize` bytes from the start of the file, a fresh self-contained
//! segment begins (magic-less header, then records). Rolling to a new cue
//! is what lets the library eventually hole-punch everything before it —
//! there is always one complete, parseable segment at the end of the
//! file, so a crash between opening a new cue and finishing its first
//! write still leaves the prior segment recoverable.

use crate::buffered::BufferedFile;
use crate::error::Result;
use crate::header::Header;
use crate::syscall;

/// Bytes still available in the cue block starting at the fd's current
/// offset, given `cuesize`. Zero iff the offset sits exactly on a cue
/// boundary.
pub fn cue_remaining(bf: &BufferedFile, cuesize: u64) -> Result<u64> {
    let offset = syscall::tell(bf.file())?;
    let into_cue = offset % cuesize;
    if into_cue == 0 {
        Ok(0)
    } else {
        Ok(cuesize - into_cue)
    }
}

/// Seek the fd to the next cue-aligned offset at or after its current
/// position, reset `bf`'s cursors to an empty write window there, and
/// write a fresh magic-less segment header. Returns the offset the new
/// segment starts at — the boundary before which everything is now dead
/// and eligible for [`zap`].
pub fn new_cue(bf: &mut BufferedFile, header: &Header, cuesize: u64) -> Result<u64> {
    let offset = syscall::tell(bf.file())?;
    let boundary = offset.div_ceil(cuesize) * cuesize;
    syscall::seek_set(bf.file(), boundary)?;
    bf.reset_write_window();
    header.write(bf, false)?;
    Ok(boundary)
}

/// Punch a hole over `[0, start)`, releasing the physical storage backing
/// every segment before the one that begins at `start`. A no-op when
/// `start == 0` (no prior segment to reclaim).
pub fn zap(bf: &BufferedFile, start: u64) -> Result<()> {
    syscall::punch_hole(bf.file(), start)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::DEFAULT_BLOCK_SIZE;

    #[test]
    fn cue_remaining_at_boundary_is_zero() {
        let f = tempfile::tempfile().unwrap();
        let bf = BufferedFile::new_write(f, DEFAULT_BLOCK_SIZE as usize);
        let remaining = cue_remaining(&bf, 1024).unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn new_cue_aligns_and_writes_header() {
        let f = tempfile::tempfile().unwrap();
        let mut bf = BufferedFile::new_write(f, 64);
        bf.write(b"0123456789").unwrap(); // 10 bytes into the first cue
        bf.commit().unwrap();

        let header = Header { blocksize: 64, cuesize: 128 };
        let boundary = new_cue(&mut bf, &header, 128).unwrap();
        assert_eq!(boundary, 128);

        bf.commit().unwrap();
        let meta = bf.file().metadata().unwrap();
        assert!(meta.len() >= 128);
    }
}
