//! Thin wrappers around the OS calls the buffered layer and cue manager
//! need: read/write/lseek/fallocate/fsync, plus the `fstatvfs` probe used to
//! auto-select a block size.
//!
//! Every wrapper retries transparently on `EINTR`. `write_all` loops until
//! the requested count is drained or a non-`EINTR` error occurs; everything
//! else returns immediately on success and once on any non-`EINTR` error.
//! Unix-only: `fallocate` and `SEEK_DATA` are Linux extensions and this
//! crate does not attempt a portable fallback (see the Open Questions in
//! the design notes).

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

/// Run `f`, retrying as long as it fails with `EINTR`.
fn retry_eintr<T>(mut f: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match f() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

fn cvt(rc: libc::ssize_t) -> io::Result<usize> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

/// `pread(2)` at `offset`. May return short; callers loop as needed.
pub fn pread(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let fd = file.as_raw_fd();
    retry_eintr(|| unsafe {
        cvt(libc::pread(
            fd,
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            offset as libc::off_t,
        ))
    })
}

/// `pwrite(2)` at `offset`, looping internally until `buf` is fully drained.
pub fn pwrite_all(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    let fd = file.as_raw_fd();
    while !buf.is_empty() {
        let n = retry_eintr(|| unsafe {
            cvt(libc::pwrite(
                fd,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                offset as libc::off_t,
            ))
        })?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "pwrite wrote 0 bytes"));
        }
        buf = &buf[n..];
        offset += n as u64;
    }
    Ok(())
}

/// `write(2)` at the fd's current offset, looping until `buf` is fully
/// drained or a non-`EINTR` error occurs.
pub fn write_all(file: &File, mut buf: &[u8]) -> io::Result<()> {
    let fd = file.as_raw_fd();
    while !buf.is_empty() {
        let n = retry_eintr(|| unsafe {
            cvt(libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()))
        })?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "write wrote 0 bytes"));
        }
        buf = &buf[n..];
    }
    Ok(())
}

/// `read(2)` at the fd's current offset. May return short (including 0 at
/// EOF); callers interpret that.
pub fn read(file: &File, buf: &mut [u8]) -> io::Result<usize> {
    let fd = file.as_raw_fd();
    retry_eintr(|| unsafe {
        cvt(libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()))
    })
}

/// `lseek(2)` to an absolute offset from the start of the file.
pub fn seek_set(file: &File, offset: u64) -> io::Result<u64> {
    seek_raw(file, offset as libc::off_t, libc::SEEK_SET)
}

/// `lseek(2)` relative to the current position.
pub fn seek_cur(file: &File, delta: i64) -> io::Result<u64> {
    seek_raw(file, delta as libc::off_t, libc::SEEK_CUR)
}

/// Return the fd's current offset without moving it.
pub fn tell(file: &File) -> io::Result<u64> {
    seek_cur(file, 0)
}

/// `lseek(2, SEEK_DATA)` — find the first byte of real data at or after
/// `offset`, skipping any punched hole. Used once, at `open`, to find the
/// start of the surviving segment after a prior reclaim.
pub fn seek_data(file: &File, offset: u64) -> io::Result<u64> {
    seek_raw(file, offset as libc::off_t, libc::SEEK_DATA)
}

fn seek_raw(file: &File, offset: libc::off_t, whence: libc::c_int) -> io::Result<u64> {
    let fd = file.as_raw_fd();
    let rc = retry_eintr(|| {
        let rc = unsafe { libc::lseek(fd, offset, whence) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(rc)
        }
    })?;
    Ok(rc as u64)
}

/// Reserve `len` bytes on disk starting at the fd's current offset, with
/// `FALLOC_FL_KEEP_SIZE` semantics: the reservation does not extend the
/// file's logical length as reported by `stat`.
pub fn preallocate_next(file: &File, len: u64) -> io::Result<()> {
    let fd = file.as_raw_fd();
    let offset = tell(file)? as libc::off_t;
    retry_eintr(|| {
        let rc = unsafe {
            libc::fallocate(fd, libc::FALLOC_FL_KEEP_SIZE, offset, len as libc::off_t)
        };
        if rc != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    })
}

/// Punch a hole covering `[0, end)`, releasing physical storage while
/// leaving the file's logical length unchanged (`FALLOC_FL_KEEP_SIZE |
/// FALLOC_FL_PUNCH_HOLE`). This is how a reclaimed dead prefix is returned
/// to the filesystem.
pub fn punch_hole(file: &File, end: u64) -> io::Result<()> {
    if end == 0 {
        return Ok(());
    }
    let fd = file.as_raw_fd();
    retry_eintr(|| {
        let rc = unsafe {
            libc::fallocate(
                fd,
                libc::FALLOC_FL_KEEP_SIZE | libc::FALLOC_FL_PUNCH_HOLE,
                0,
                end as libc::off_t,
            )
        };
        if rc != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    })
}

/// `fsync(2)` — force the fd's dirty pages to durable storage.
pub fn fsync(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    retry_eintr(|| {
        let rc = unsafe { libc::fsync(fd) };
        if rc != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    })
}

/// Probe the filesystem's preferred I/O block size for `path`'s parent
/// directory via `fstatvfs`. Returns `None` if the probe fails or reports a
/// nonsensical value — callers fall back to the default block size.
pub fn probe_block_size(file: &File) -> Option<u64> {
    let fd = file.as_raw_fd();
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::fstatvfs(fd, &mut stat) };
    if rc != 0 || stat.f_bsize == 0 {
        return None;
    }
    Some(stat.f_bsize as u64)
}
