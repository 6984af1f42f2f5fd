//! Promise-based path operations
//!
//! The [`Fs`] facade validates arguments synchronously, submits the
//! blocking call to its pool, and settles a promise with the result.
//! Path-based `read_file`/`write_file`/`append_file` open internally
//! and guarantee the descriptor is closed on every exit path.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::runtime::{Encoding, OwnedBuffer, Promise, SubmitPool};

use super::handle::{FileHandle, OpenOptions};
use super::read_context::{self, ReadOutput};
use super::write_loop;
use super::{
    map_promise, path_cstring, sys, validate_mode, validate_path, validate_time, FileStat,
    FsError, FsPromise, FsResult,
};

/// Facade over the promise-based filesystem operation surface.
///
/// Holds the submission pool its operations run on; the module-level
/// functions delegate to a process-wide instance.
pub struct Fs {
    pool: Arc<SubmitPool>,
}

impl Default for Fs {
    fn default() -> Self {
        Self::new()
    }
}

impl Fs {
    /// Facade bound to the global submission pool.
    pub fn new() -> Self {
        Self::with_pool(Arc::clone(SubmitPool::global()))
    }

    /// Facade bound to a specific pool. Tests use this together with
    /// the pool's submission counter.
    pub fn with_pool(pool: Arc<SubmitPool>) -> Self {
        Self { pool }
    }

    /// The process-wide facade used by the module-level functions.
    pub fn global() -> &'static Fs {
        &GLOBAL_FS
    }

    pub fn pool(&self) -> &Arc<SubmitPool> {
        &self.pool
    }

    fn submit<T, F>(&self, op: &'static str, f: F) -> FsPromise<T>
    where
        T: Send + 'static,
        F: FnOnce() -> io::Result<T> + Send + 'static,
    {
        let (promise, resolver) = Promise::new();
        self.pool.submit_io(
            move || f().map_err(|e| FsError::io(op, e)),
            move |res| resolver.settle(res),
        );
        promise
    }

    // =========================================================================
    // Metadata and entry operations
    // =========================================================================

    /// Test accessibility of `path`; `mode` takes the `libc::F_OK` /
    /// `R_OK` / `W_OK` / `X_OK` bits.
    pub fn access(&self, path: impl AsRef<Path>, mode: i32) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path.as_ref())?;
        Ok(self.submit("access", move || sys::access(&c, mode)))
    }

    pub fn stat(&self, path: impl AsRef<Path>) -> FsResult<FsPromise<FileStat>> {
        let c = path_cstring(path.as_ref())?;
        Ok(self.submit("stat", move || {
            sys::stat(&c).map(|st| FileStat::from_raw(&st))
        }))
    }

    pub fn lstat(&self, path: impl AsRef<Path>) -> FsResult<FsPromise<FileStat>> {
        let c = path_cstring(path.as_ref())?;
        Ok(self.submit("lstat", move || {
            sys::lstat(&c).map(|st| FileStat::from_raw(&st))
        }))
    }

    /// Directory entry names in OS order.
    pub fn readdir(&self, path: impl AsRef<Path>) -> FsResult<FsPromise<Vec<String>>> {
        let path = validate_path(path.as_ref())?;
        Ok(self.submit("readdir", move || {
            let mut names = Vec::new();
            for entry in std::fs::read_dir(&path)? {
                names.push(entry?.file_name().to_string_lossy().into_owned());
            }
            Ok(names)
        }))
    }

    pub fn readlink(&self, path: impl AsRef<Path>) -> FsResult<FsPromise<PathBuf>> {
        let path = validate_path(path.as_ref())?;
        Ok(self.submit("readlink", move || std::fs::read_link(&path)))
    }

    pub fn realpath(&self, path: impl AsRef<Path>) -> FsResult<FsPromise<PathBuf>> {
        let path = validate_path(path.as_ref())?;
        Ok(self.submit("realpath", move || std::fs::canonicalize(&path)))
    }

    // =========================================================================
    // Entry creation, removal, movement
    // =========================================================================

    pub fn symlink(
        &self,
        target: impl AsRef<Path>,
        link: impl AsRef<Path>,
    ) -> FsResult<FsPromise<()>> {
        let target = validate_path(target.as_ref())?;
        let link = validate_path(link.as_ref())?;
        Ok(self.submit("symlink", move || {
            std::os::unix::fs::symlink(&target, &link)
        }))
    }

    pub fn link(
        &self,
        existing: impl AsRef<Path>,
        new: impl AsRef<Path>,
    ) -> FsResult<FsPromise<()>> {
        let existing = validate_path(existing.as_ref())?;
        let new = validate_path(new.as_ref())?;
        Ok(self.submit("link", move || std::fs::hard_link(&existing, &new)))
    }

    pub fn unlink(&self, path: impl AsRef<Path>) -> FsResult<FsPromise<()>> {
        let path = validate_path(path.as_ref())?;
        Ok(self.submit("unlink", move || std::fs::remove_file(&path)))
    }

    pub fn rename(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
    ) -> FsResult<FsPromise<()>> {
        let from = validate_path(from.as_ref())?;
        let to = validate_path(to.as_ref())?;
        Ok(self.submit("rename", move || std::fs::rename(&from, &to)))
    }

    /// Copy `from` to `to`, resolving with the number of bytes copied.
    pub fn copy_file(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
    ) -> FsResult<FsPromise<u64>> {
        let from = validate_path(from.as_ref())?;
        let to = validate_path(to.as_ref())?;
        Ok(self.submit("copy", move || std::fs::copy(&from, &to)))
    }

    pub fn truncate(&self, path: impl AsRef<Path>, len: u64) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path.as_ref())?;
        Ok(self.submit("truncate", move || sys::truncate(&c, len)))
    }

    pub fn mkdir(&self, path: impl AsRef<Path>, mode: u32) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path.as_ref())?;
        let mode = validate_mode(mode)?;
        Ok(self.submit("mkdir", move || sys::mkdir(&c, mode)))
    }

    /// Create a unique temporary directory; `prefix` gains six random
    /// characters. Resolves with the created path.
    pub fn mkdtemp(&self, prefix: impl AsRef<Path>) -> FsResult<FsPromise<PathBuf>> {
        use std::os::unix::ffi::OsStrExt;
        let prefix = validate_path(prefix.as_ref())?;
        let mut template = prefix.as_os_str().as_bytes().to_vec();
        template.extend_from_slice(b"XXXXXX");
        let c = std::ffi::CString::new(template)
            .map_err(|_| FsError::InvalidArg("path must not contain NUL bytes".into()))?;
        Ok(self.submit("mkdtemp", move || sys::mkdtemp(&c)))
    }

    // =========================================================================
    // Permissions, ownership, times
    // =========================================================================

    pub fn chmod(&self, path: impl AsRef<Path>, mode: u32) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path.as_ref())?;
        let mode = validate_mode(mode)?;
        Ok(self.submit("chmod", move || sys::chmod(&c, mode)))
    }

    /// Change the mode of a symlink itself.
    ///
    /// Synthesized from symlink-mode open + `fchmod` + guaranteed
    /// close; on platforms without symlink-mode open this is a policy
    /// error raised before anything is opened.
    #[allow(unused_variables)]
    pub fn lchmod(&self, path: impl AsRef<Path>, mode: u32) -> FsResult<FsPromise<()>> {
        let mode = validate_mode(mode)?;
        #[cfg(target_os = "macos")]
        {
            let c = path_cstring(path.as_ref())?;
            return Ok(self.submit("lchmod", move || {
                let fd = sys::open(&c, libc::O_SYMLINK | libc::O_WRONLY, 0)?;
                // The descriptor is closed on both the success and
                // failure paths; the chmod error wins over a close error.
                let result = sys::fchmod(fd, mode);
                let close_result = sys::close(fd);
                result.and(close_result)
            }));
        }
        #[cfg(not(target_os = "macos"))]
        {
            let _ = mode;
            Err(FsError::NotSupported("lchmod"))
        }
    }

    pub fn chown(&self, path: impl AsRef<Path>, uid: u32, gid: u32) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path.as_ref())?;
        Ok(self.submit("chown", move || sys::chown(&c, uid, gid)))
    }

    pub fn lchown(&self, path: impl AsRef<Path>, uid: u32, gid: u32) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path.as_ref())?;
        Ok(self.submit("lchown", move || sys::lchown(&c, uid, gid)))
    }

    pub fn utimes(
        &self,
        path: impl AsRef<Path>,
        atime_secs: f64,
        mtime_secs: f64,
    ) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path.as_ref())?;
        let atime = validate_time(atime_secs, "atime")?;
        let mtime = validate_time(mtime_secs, "mtime")?;
        Ok(self.submit("utimes", move || sys::utimens(&c, atime, mtime, true)))
    }

    /// Like [`utimes`](Self::utimes) but applied to a symlink itself.
    pub fn lutimes(
        &self,
        path: impl AsRef<Path>,
        atime_secs: f64,
        mtime_secs: f64,
    ) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path.as_ref())?;
        let atime = validate_time(atime_secs, "atime")?;
        let mtime = validate_time(mtime_secs, "mtime")?;
        Ok(self.submit("lutimes", move || sys::utimens(&c, atime, mtime, false)))
    }

    // =========================================================================
    // Open and whole-file operations
    // =========================================================================

    /// Open `path`, resolving with a [`FileHandle`] the caller must
    /// eventually close.
    pub fn open(
        &self,
        path: impl AsRef<Path>,
        options: OpenOptions,
    ) -> FsResult<FsPromise<FileHandle>> {
        let c = path_cstring(path.as_ref())?;
        let flags = options.to_libc_flags();
        let mode = validate_mode(options.creation_mode())?;
        let pool = Arc::clone(&self.pool);
        Ok(self.submit("open", move || {
            sys::open(&c, flags, mode).map(|fd| FileHandle::new(fd, pool))
        }))
    }

    fn read_file_impl(
        &self,
        path: &Path,
        encoding: Option<Encoding>,
    ) -> FsResult<FsPromise<ReadOutput>> {
        let c = path_cstring(path)?;
        let pool = Arc::clone(&self.pool);
        let (promise, resolver) = Promise::new();
        self.pool.submit_io(
            move || sys::open(&c, libc::O_RDONLY, 0),
            move |res| match res {
                Err(e) => resolver.settle(Err(FsError::io("open", e))),
                // The context owns the descriptor from here and closes
                // it on every exit path.
                Ok(fd) => read_context::start(pool, fd, true, encoding, resolver),
            },
        );
        Ok(promise)
    }

    /// Read the entire file at `path`.
    pub fn read_file(&self, path: impl AsRef<Path>) -> FsResult<FsPromise<OwnedBuffer>> {
        let promise = self.read_file_impl(path.as_ref(), None)?;
        Ok(map_promise(promise, |out| Ok(out.into_bytes())))
    }

    /// Read the entire file at `path` as UTF-8 text.
    pub fn read_file_string(&self, path: impl AsRef<Path>) -> FsResult<FsPromise<String>> {
        self.read_file_encoded(path, Encoding::Utf8)
    }

    /// Read the entire file at `path`, decoding with `encoding`.
    pub fn read_file_encoded(
        &self,
        path: impl AsRef<Path>,
        encoding: Encoding,
    ) -> FsResult<FsPromise<String>> {
        let promise = self.read_file_impl(path.as_ref(), Some(encoding))?;
        Ok(map_promise(promise, ReadOutput::into_text))
    }

    fn write_file_impl(&self, path: &Path, flags: i32, data: &[u8]) -> FsResult<FsPromise<()>> {
        let c = path_cstring(path)?;
        let data = OwnedBuffer::from_slice(data);
        let pool = Arc::clone(&self.pool);
        let (promise, resolver) = Promise::new();
        self.pool.submit_io(
            move || sys::open(&c, flags, 0o666),
            move |res| match res {
                Err(e) => resolver.settle(Err(FsError::io("open", e))),
                Ok(fd) => write_loop::start(pool, fd, true, data, resolver),
            },
        );
        Ok(promise)
    }

    /// Create or replace the file at `path` with `data`.
    pub fn write_file(&self, path: impl AsRef<Path>, data: &[u8]) -> FsResult<FsPromise<()>> {
        self.write_file_impl(
            path.as_ref(),
            libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            data,
        )
    }

    /// Append `data` to the file at `path`, creating it if absent.
    pub fn append_file(&self, path: impl AsRef<Path>, data: &[u8]) -> FsResult<FsPromise<()>> {
        self.write_file_impl(
            path.as_ref(),
            libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND,
            data,
        )
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_FS: Fs = Fs::new();
}

// =============================================================================
// Module-level convenience operations on the global pool
// =============================================================================

/// Open `path` with the global facade.
pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> FsResult<FsPromise<FileHandle>> {
    Fs::global().open(path, options)
}

/// Read the entire file at `path`.
pub fn read_file(path: impl AsRef<Path>) -> FsResult<FsPromise<OwnedBuffer>> {
    Fs::global().read_file(path)
}

/// Read the entire file at `path` as UTF-8 text.
pub fn read_file_string(path: impl AsRef<Path>) -> FsResult<FsPromise<String>> {
    Fs::global().read_file_string(path)
}

/// Create or replace the file at `path` with `data`.
pub fn write_file(path: impl AsRef<Path>, data: &[u8]) -> FsResult<FsPromise<()>> {
    Fs::global().write_file(path, data)
}

/// Append `data` to the file at `path`, creating it if absent.
pub fn append_file(path: impl AsRef<Path>, data: &[u8]) -> FsResult<FsPromise<()>> {
    Fs::global().append_file(path, data)
}
