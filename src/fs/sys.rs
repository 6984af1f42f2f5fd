//! Blocking syscall wrappers
//!
//! Thin wrappers over the raw OS calls the pool workers execute.
//! `std::fs` covers the path-level operations it models well; `libc`
//! fills in descriptor-level and metadata calls std does not expose.

use std::ffi::CStr;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::PathBuf;

pub(crate) fn open(path: &CStr, flags: i32, mode: libc::mode_t) -> io::Result<RawFd> {
    let fd = unsafe { libc::open(path.as_ptr(), flags | libc::O_CLOEXEC, mode as libc::c_uint) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(fd)
}

pub(crate) fn close(fd: RawFd) -> io::Result<()> {
    let result = unsafe { libc::close(fd) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Read up to `len` bytes at the descriptor's current position.
pub(crate) fn read(fd: RawFd, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, len) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        buf.truncate(n as usize);
        return Ok(buf);
    }
}

pub(crate) fn pread(fd: RawFd, len: usize, offset: u64) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    loop {
        let n = unsafe {
            libc::pread(
                fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                len,
                offset as libc::off_t,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        buf.truncate(n as usize);
        return Ok(buf);
    }
}

/// Write `data` at the descriptor's current position.
pub(crate) fn write(fd: RawFd, data: &[u8]) -> io::Result<usize> {
    loop {
        let n = unsafe { libc::write(fd, data.as_ptr() as *const libc::c_void, data.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        return Ok(n as usize);
    }
}

pub(crate) fn pwrite(fd: RawFd, data: &[u8], offset: u64) -> io::Result<usize> {
    loop {
        let n = unsafe {
            libc::pwrite(
                fd,
                data.as_ptr() as *const libc::c_void,
                data.len(),
                offset as libc::off_t,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        return Ok(n as usize);
    }
}

pub(crate) fn fstat(fd: RawFd) -> io::Result<libc::stat> {
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::fstat(fd, &mut st) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(st)
}

pub(crate) fn stat(path: &CStr) -> io::Result<libc::stat> {
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::stat(path.as_ptr(), &mut st) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(st)
}

pub(crate) fn lstat(path: &CStr) -> io::Result<libc::stat> {
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::lstat(path.as_ptr(), &mut st) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(st)
}

pub(crate) fn access(path: &CStr, mode: i32) -> io::Result<()> {
    let result = unsafe { libc::access(path.as_ptr(), mode) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn chmod(path: &CStr, mode: libc::mode_t) -> io::Result<()> {
    let result = unsafe { libc::chmod(path.as_ptr(), mode) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn fchmod(fd: RawFd, mode: libc::mode_t) -> io::Result<()> {
    let result = unsafe { libc::fchmod(fd, mode) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn chown(path: &CStr, uid: libc::uid_t, gid: libc::gid_t) -> io::Result<()> {
    let result = unsafe { libc::chown(path.as_ptr(), uid, gid) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn lchown(path: &CStr, uid: libc::uid_t, gid: libc::gid_t) -> io::Result<()> {
    let result = unsafe { libc::lchown(path.as_ptr(), uid, gid) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn fchown(fd: RawFd, uid: libc::uid_t, gid: libc::gid_t) -> io::Result<()> {
    let result = unsafe { libc::fchown(fd, uid, gid) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn utimens(
    path: &CStr,
    atime: libc::timespec,
    mtime: libc::timespec,
    follow_symlinks: bool,
) -> io::Result<()> {
    let flags = if follow_symlinks {
        0
    } else {
        libc::AT_SYMLINK_NOFOLLOW
    };
    let times = [atime, mtime];
    let result = unsafe { libc::utimensat(libc::AT_FDCWD, path.as_ptr(), times.as_ptr(), flags) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn futimens(fd: RawFd, atime: libc::timespec, mtime: libc::timespec) -> io::Result<()> {
    let times = [atime, mtime];
    let result = unsafe { libc::futimens(fd, times.as_ptr()) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn ftruncate(fd: RawFd, len: u64) -> io::Result<()> {
    let result = unsafe { libc::ftruncate(fd, len as libc::off_t) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn truncate(path: &CStr, len: u64) -> io::Result<()> {
    let result = unsafe { libc::truncate(path.as_ptr(), len as libc::off_t) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn fsync(fd: RawFd) -> io::Result<()> {
    let result = unsafe { libc::fsync(fd) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn fdatasync(fd: RawFd) -> io::Result<()> {
    let result = unsafe { libc::fdatasync(fd) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn mkdir(path: &CStr, mode: libc::mode_t) -> io::Result<()> {
    let result = unsafe { libc::mkdir(path.as_ptr(), mode) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Create a unique temporary directory from a `prefixXXXXXX` template.
pub(crate) fn mkdtemp(template: &CStr) -> io::Result<PathBuf> {
    let mut buf = template.to_bytes_with_nul().to_vec();
    let result = unsafe { libc::mkdtemp(buf.as_mut_ptr() as *mut libc::c_char) };
    if result.is_null() {
        return Err(io::Error::last_os_error());
    }
    let len = buf.len() - 1;
    let name = std::ffi::OsStr::from_bytes(&buf[..len]);
    Ok(PathBuf::from(name))
}
