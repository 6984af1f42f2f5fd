//! Asynchronous filesystem core
//!
//! Presents every filesystem primitive as an operation that validates
//! its arguments synchronously, submits the blocking OS call to the
//! I/O pool, and settles a [`Promise`] with the result or a typed
//! failure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FILESYSTEM CORE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ops: Fs facade with path-based promise operations          │
//! │  handle: FileHandle with descriptor-scoped operations       │
//! │  read_context: chunked whole-file read state machine        │
//! │  write_loop: chunked whole-buffer write loop                │
//! │  sys: blocking syscall wrappers run on pool threads         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation failures are returned synchronously from the operation
//! entry point, before any submission; OS errors arrive through the
//! promise and are never retried.

pub mod handle;
pub mod ops;
pub mod read_context;
pub(crate) mod sys;
pub mod write_loop;

pub use handle::{FileHandle, OpenOptions};
pub use ops::{append_file, open, read_file, read_file_string, write_file, Fs};

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::runtime::Promise;

/// Upper bound on a single sub-read or sub-write issued by the chunked
/// loops.
pub const CHUNK_CEILING: usize = 16384;

/// Largest file size the whole-file reader will buffer.
pub const MAX_BUFFER_LENGTH: u64 = i32::MAX as u64;

/// Errors produced by the filesystem core.
#[derive(Debug, Error)]
pub enum FsError {
    /// Argument validation failed before any I/O was submitted.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// An OS call failed; `source` preserves the system error identity.
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The file exceeds the maximum representable buffer length.
    #[error("file is too large to read into a single buffer")]
    TooLarge,

    /// The operation is not available on this platform.
    #[error("{0} is not supported on this platform")]
    NotSupported(&'static str),

    /// The handle's descriptor was already closed.
    #[error("file handle is closed")]
    HandleClosed,

    /// The submission was cancelled before it ran.
    #[error("operation was cancelled")]
    Cancelled,

    /// Decoding the read bytes with the requested encoding failed.
    #[error("decode failed: {0}")]
    Decode(String),
}

impl FsError {
    pub(crate) fn io(op: &'static str, source: std::io::Error) -> Self {
        FsError::Io { op, source }
    }

    /// The raw OS error number, when the failure came from a syscall.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            FsError::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Promise settling with a filesystem result.
pub type FsPromise<T> = Promise<FsResult<T>>;

/// Chain a fallible transformation onto a promise's success value.
pub(crate) fn map_promise<T, U, F>(promise: FsPromise<T>, f: F) -> FsPromise<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnOnce(T) -> FsResult<U> + Send + 'static,
{
    let (mapped, resolver) = Promise::new();
    promise.on_settled(move |res| resolver.settle(res.and_then(f)));
    mapped
}

/// Snapshot of an entry's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: u64,
    pub blksize: u64,
    pub blocks: u64,
    /// Access time in milliseconds since the epoch.
    pub atime_ms: i64,
    /// Modification time in milliseconds since the epoch.
    pub mtime_ms: i64,
    /// Status-change time in milliseconds since the epoch.
    pub ctime_ms: i64,
}

impl FileStat {
    pub(crate) fn from_raw(st: &libc::stat) -> Self {
        Self {
            dev: st.st_dev as u64,
            ino: st.st_ino as u64,
            mode: st.st_mode as u32,
            nlink: st.st_nlink as u64,
            uid: st.st_uid as u32,
            gid: st.st_gid as u32,
            rdev: st.st_rdev as u64,
            size: st.st_size.max(0) as u64,
            blksize: st.st_blksize as u64,
            blocks: st.st_blocks as u64,
            atime_ms: st.st_atime as i64 * 1000 + st.st_atime_nsec as i64 / 1_000_000,
            mtime_ms: st.st_mtime as i64 * 1000 + st.st_mtime_nsec as i64 / 1_000_000,
            ctime_ms: st.st_ctime as i64 * 1000 + st.st_ctime_nsec as i64 / 1_000_000,
        }
    }

    pub fn is_file(&self) -> bool {
        self.mode & libc::S_IFMT as u32 == libc::S_IFREG as u32
    }

    pub fn is_dir(&self) -> bool {
        self.mode & libc::S_IFMT as u32 == libc::S_IFDIR as u32
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & libc::S_IFMT as u32 == libc::S_IFLNK as u32
    }
}

// =============================================================================
// Argument validation
// =============================================================================

/// Validate a path argument and convert to OS-native separators.
///
/// Rejects empty paths and paths with interior NUL bytes before
/// anything reaches the I/O layer.
pub(crate) fn validate_path(path: &Path) -> FsResult<PathBuf> {
    let bytes = path.as_os_str().as_bytes();
    if bytes.is_empty() {
        return Err(FsError::InvalidArg("path must not be empty".into()));
    }
    if bytes.contains(&0) {
        return Err(FsError::InvalidArg(
            "path must not contain NUL bytes".into(),
        ));
    }
    // Separators are already native on Unix.
    Ok(path.to_path_buf())
}

/// Validated path as a C string for raw syscalls.
pub(crate) fn path_cstring(path: &Path) -> FsResult<CString> {
    let checked = validate_path(path)?;
    CString::new(checked.as_os_str().as_bytes())
        .map_err(|_| FsError::InvalidArg("path must not contain NUL bytes".into()))
}

/// Validate a permission mode argument.
pub(crate) fn validate_mode(mode: u32) -> FsResult<libc::mode_t> {
    if mode > 0o7777 {
        return Err(FsError::InvalidArg(format!(
            "mode must be in range 0..=0o7777, got 0o{:o}",
            mode
        )));
    }
    Ok(mode as libc::mode_t)
}

/// Validate a time argument (seconds since the epoch) and split it
/// into whole seconds and nanoseconds.
pub(crate) fn validate_time(secs: f64, name: &str) -> FsResult<libc::timespec> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(FsError::InvalidArg(format!(
            "{} must be a finite non-negative number of seconds",
            name
        )));
    }
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1e9).round() as i64;
    Ok(libc::timespec {
        tv_sec: whole as libc::time_t,
        tv_nsec: nanos.clamp(0, 999_999_999) as _,
    })
}
