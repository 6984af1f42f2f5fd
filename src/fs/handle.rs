//! File handle
//!
//! A [`FileHandle`] owns exactly one open OS file descriptor for its
//! lifetime and exposes descriptor-scoped operations. Every operation
//! on a closed handle fails with [`FsError::HandleClosed`] before
//! anything is submitted.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crate::runtime::{Encoding, OwnedBuffer, Promise, SubmitPool};

use super::read_context::{self, ReadOutput};
use super::write_loop;
use super::{
    map_promise, sys, validate_mode, validate_time, FileStat, FsError, FsPromise, FsResult,
};

/// Open flags for file handles.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    read: bool,
    write: bool,
    create: bool,
    truncate: bool,
    append: bool,
    mode: u32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            create: false,
            truncate: false,
            append: false,
            mode: 0o666,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Permission bits used when the open creates the file.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub(crate) fn creation_mode(&self) -> u32 {
        self.mode
    }

    pub(crate) fn to_libc_flags(&self) -> i32 {
        let mut flags = 0;

        if self.read && self.write {
            flags |= libc::O_RDWR;
        } else if self.write {
            flags |= libc::O_WRONLY;
        } else {
            flags |= libc::O_RDONLY;
        }

        if self.create {
            flags |= libc::O_CREAT;
        }
        if self.truncate {
            flags |= libc::O_TRUNC;
        }
        if self.append {
            flags |= libc::O_APPEND;
        }

        flags
    }
}

/// Owned wrapper around one open OS file descriptor.
///
/// The descriptor value is mutated only at open and close; individual
/// operations may be in flight concurrently, but ordering between them
/// is the caller's concern.
pub struct FileHandle {
    fd: AtomicI32,
    pool: Arc<SubmitPool>,
}

impl FileHandle {
    pub(crate) fn new(fd: RawFd, pool: Arc<SubmitPool>) -> Self {
        Self {
            fd: AtomicI32::new(fd),
            pool,
        }
    }

    /// Wrap an externally opened descriptor. The handle takes
    /// ownership; `close` (or drop) will close it.
    pub fn from_raw_fd(fd: RawFd) -> Self {
        Self::new(fd, Arc::clone(SubmitPool::global()))
    }

    /// The current descriptor, or `None` after close.
    pub fn raw_fd(&self) -> Option<RawFd> {
        let fd = self.fd.load(Ordering::Acquire);
        if fd < 0 {
            None
        } else {
            Some(fd)
        }
    }

    fn require_fd(&self) -> FsResult<RawFd> {
        self.raw_fd().ok_or(FsError::HandleClosed)
    }

    fn submit<T, F>(&self, op: &'static str, f: F) -> FsResult<FsPromise<T>>
    where
        T: Send + 'static,
        F: FnOnce(RawFd) -> io::Result<T> + Send + 'static,
    {
        let fd = self.require_fd()?;
        let (promise, resolver) = Promise::new();
        self.pool.submit_io(
            move || f(fd).map_err(|e| FsError::io(op, e)),
            move |res| resolver.settle(res),
        );
        Ok(promise)
    }

    /// Read up to `len` bytes from the current position.
    ///
    /// A zero-length request completes with an empty buffer without
    /// touching the OS layer.
    pub fn read(&self, len: usize) -> FsResult<FsPromise<OwnedBuffer>> {
        self.require_fd()?;
        if len == 0 {
            return Ok(Promise::settled(Ok(OwnedBuffer::new())));
        }
        self.submit("read", move |fd| sys::read(fd, len).map(OwnedBuffer::from_vec))
    }

    /// Read up to `len` bytes at `position` without moving the cursor.
    pub fn read_at(&self, position: u64, len: usize) -> FsResult<FsPromise<OwnedBuffer>> {
        self.require_fd()?;
        if len == 0 {
            return Ok(Promise::settled(Ok(OwnedBuffer::new())));
        }
        self.submit("read", move |fd| {
            sys::pread(fd, len, position).map(OwnedBuffer::from_vec)
        })
    }

    /// Write `data` at the current position; resolves with the number
    /// of bytes actually written (which may be short).
    ///
    /// A zero-length request completes with zero bytes without
    /// touching the OS layer.
    pub fn write(&self, data: &[u8]) -> FsResult<FsPromise<usize>> {
        self.require_fd()?;
        if data.is_empty() {
            return Ok(Promise::settled(Ok(0)));
        }
        let data = data.to_vec();
        self.submit("write", move |fd| sys::write(fd, &data))
    }

    /// Write `data` at `position` without moving the cursor.
    pub fn write_at(&self, position: u64, data: &[u8]) -> FsResult<FsPromise<usize>> {
        self.require_fd()?;
        if data.is_empty() {
            return Ok(Promise::settled(Ok(0)));
        }
        let data = data.to_vec();
        self.submit("write", move |fd| sys::pwrite(fd, &data, position))
    }

    pub fn stat(&self) -> FsResult<FsPromise<FileStat>> {
        self.submit("stat", |fd| sys::fstat(fd).map(|st| FileStat::from_raw(&st)))
    }

    pub fn chmod(&self, mode: u32) -> FsResult<FsPromise<()>> {
        let mode = validate_mode(mode)?;
        self.submit("chmod", move |fd| sys::fchmod(fd, mode))
    }

    pub fn chown(&self, uid: u32, gid: u32) -> FsResult<FsPromise<()>> {
        self.submit("chown", move |fd| sys::fchown(fd, uid, gid))
    }

    pub fn utimes(&self, atime_secs: f64, mtime_secs: f64) -> FsResult<FsPromise<()>> {
        let atime = validate_time(atime_secs, "atime")?;
        let mtime = validate_time(mtime_secs, "mtime")?;
        self.submit("utimes", move |fd| sys::futimens(fd, atime, mtime))
    }

    pub fn truncate(&self, len: u64) -> FsResult<FsPromise<()>> {
        self.submit("truncate", move |fd| sys::ftruncate(fd, len))
    }

    /// Flush data and metadata to disk.
    pub fn sync(&self) -> FsResult<FsPromise<()>> {
        self.submit("sync", sys::fsync)
    }

    /// Flush data (not metadata) to disk.
    pub fn datasync(&self) -> FsResult<FsPromise<()>> {
        self.submit("datasync", sys::fdatasync)
    }

    /// Read the whole file through the chunked reader.
    ///
    /// The handle keeps ownership of the descriptor: the reader never
    /// issues an OS close for it, it only synthesizes the final
    /// completion one pool tick later.
    pub fn read_file(&self) -> FsResult<FsPromise<OwnedBuffer>> {
        let fd = self.require_fd()?;
        let (promise, resolver) = Promise::new();
        read_context::start(Arc::clone(&self.pool), fd, false, None, resolver);
        Ok(map_promise(promise, |out| Ok(out.into_bytes())))
    }

    /// Read the whole file and decode it as UTF-8.
    pub fn read_file_string(&self) -> FsResult<FsPromise<String>> {
        self.read_file_encoded(Encoding::Utf8)
    }

    /// Read the whole file and decode it with `encoding`.
    pub fn read_file_encoded(&self, encoding: Encoding) -> FsResult<FsPromise<String>> {
        let fd = self.require_fd()?;
        let (promise, resolver) = Promise::new();
        read_context::start(Arc::clone(&self.pool), fd, false, Some(encoding), resolver);
        Ok(map_promise(promise, ReadOutput::into_text))
    }

    /// Write the whole payload through the chunked writer.
    ///
    /// A zero-length payload short-circuits to success with no I/O.
    pub fn write_file(&self, data: &[u8]) -> FsResult<FsPromise<()>> {
        let fd = self.require_fd()?;
        if data.is_empty() {
            return Ok(Promise::settled(Ok(())));
        }
        let (promise, resolver) = Promise::new();
        write_loop::start(
            Arc::clone(&self.pool),
            fd,
            false,
            OwnedBuffer::from_slice(data),
            resolver,
        );
        Ok(promise)
    }

    /// Append the payload; identical to [`write_file`](Self::write_file)
    /// on a handle opened with append mode.
    pub fn append(&self, data: &[u8]) -> FsResult<FsPromise<()>> {
        self.write_file(data)
    }

    /// Close the descriptor. All later operations on this handle fail
    /// with an invalid-handle error.
    pub fn close(&self) -> FsResult<FsPromise<()>> {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd < 0 {
            return Err(FsError::HandleClosed);
        }
        let (promise, resolver) = Promise::new();
        self.pool.submit_io(
            move || sys::close(fd).map_err(|e| FsError::io("close", e)),
            move |res| resolver.settle(res),
        );
        Ok(promise)
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd >= 0 {
            tracing::warn!(fd, "file handle dropped without close");
            let _ = sys::close(fd);
        }
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("fd", &self.fd.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn open_handle(path: &str, options: OpenOptions) -> (FileHandle, Arc<SubmitPool>) {
        let pool = Arc::new(SubmitPool::new(2));
        let c = CString::new(path).unwrap();
        let fd = sys::open(&c, options.to_libc_flags(), options.creation_mode() as libc::mode_t)
            .unwrap();
        (FileHandle::new(fd, Arc::clone(&pool)), pool)
    }

    #[test]
    fn test_write_then_read_at() {
        let path = "/tmp/lyre_handle_rw.txt";
        let (handle, _pool) = open_handle(
            path,
            OpenOptions::new().write(true).create(true).truncate(true),
        );

        handle.write(b"hello world").unwrap().wait().unwrap();
        let bytes = handle.read_at(6, 5).unwrap().wait().unwrap();
        assert_eq!(bytes.as_slice(), b"world");

        handle.close().unwrap().wait().unwrap();
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_zero_length_requests_skip_submission() {
        let path = "/tmp/lyre_handle_zero.txt";
        std::fs::write(path, b"data").unwrap();
        let (handle, pool) = open_handle(path, OpenOptions::new().read(true).write(true));

        let before = pool.submitted();
        let buf = handle.read(0).unwrap().wait().unwrap();
        assert!(buf.is_empty());
        let written = handle.write(b"").unwrap().wait().unwrap();
        assert_eq!(written, 0);
        assert_eq!(pool.submitted(), before);

        handle.close().unwrap().wait().unwrap();
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_operations_fail_after_close() {
        let path = "/tmp/lyre_handle_closed.txt";
        std::fs::write(path, b"data").unwrap();
        let (handle, _pool) = open_handle(path, OpenOptions::new());

        handle.close().unwrap().wait().unwrap();
        assert!(matches!(handle.read(16), Err(FsError::HandleClosed)));
        assert!(matches!(handle.stat(), Err(FsError::HandleClosed)));
        assert!(matches!(handle.close(), Err(FsError::HandleClosed)));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_stat_reports_size() {
        let path = "/tmp/lyre_handle_stat.txt";
        std::fs::write(path, b"12345").unwrap();
        let (handle, _pool) = open_handle(path, OpenOptions::new());

        let stat = handle.stat().unwrap().wait().unwrap();
        assert!(stat.is_file());
        assert_eq!(stat.size, 5);

        handle.close().unwrap().wait().unwrap();
        std::fs::remove_file(path).ok();
    }
}
