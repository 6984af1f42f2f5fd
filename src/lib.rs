//! Lyre Native Core - I/O and Inspection for the Lyre Runtime
//!
//! The native layer bridging synchronous-looking script code to
//! non-blocking OS calls, plus the deep value-inspection engine used
//! for debugging and logging output.
//!
//! # Features
//!
//! - **Promise-based file operations**: every filesystem primitive
//!   validates its arguments synchronously, runs on a worker pool, and
//!   settles a one-shot promise with a result or a typed failure
//! - **FileHandle lifecycle**: one descriptor per handle, invalid after
//!   close, never closed out from under an owner
//! - **Chunked streaming**: whole-file reads and writes move through
//!   bounded chunks with strict byte accounting
//! - **Cycle-safe inspection**: deterministic rendering of arbitrary,
//!   possibly circular values within bounded time and output size
//! - **Configurable layout**: break length, compact grouping, sorting,
//!   color styling
//!
//! # Example
//!
//! ```no_run
//! use lyre::fs;
//! use lyre::inspect::{inspect, Value};
//!
//! fs::write_file("/tmp/greeting.txt", b"hello").unwrap().wait().unwrap();
//! let bytes = fs::read_file("/tmp/greeting.txt").unwrap().wait().unwrap();
//! assert_eq!(bytes.as_slice(), b"hello");
//!
//! let value = Value::array(vec![1.into(), 2.into(), 3.into()]);
//! assert_eq!(inspect(&value), "[ 1, 2, 3 ]");
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐
//! │  fs (promises)   │     │  inspect (values)    │
//! └────────┬─────────┘     └──────────┬───────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌──────────────────┐     ┌──────────────────────┐
//! │ chunked contexts │     │ category formatters  │
//! └────────┬─────────┘     └──────────┬───────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌──────────────────┐     ┌──────────────────────┐
//! │ runtime::submit  │     │ layout engine        │
//! └──────────────────┘     └──────────────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod fs;
pub mod inspect;
pub mod runtime;

// Re-export commonly used types
pub use config::{ConfigError, ConfigResult, LyreConfig};
pub use fs::{
    FileHandle, FileStat, Fs, FsError, FsPromise, FsResult, OpenOptions, CHUNK_CEILING,
    MAX_BUFFER_LENGTH,
};
pub use inspect::{inspect, inspect_with, Compact, Getters, InspectOptions, Sorted, Value};
pub use runtime::{CancelToken, Encoding, OwnedBuffer, Promise, SubmitPool};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_fs_and_inspect_surfaces() {
        let path = "/tmp/lyre_lib_smoke.txt";
        fs::write_file(path, b"smoke").unwrap().wait().unwrap();
        let bytes = fs::read_file(path).unwrap().wait().unwrap();
        assert_eq!(bytes.as_slice(), b"smoke");
        std::fs::remove_file(path).ok();

        let value = Value::object(vec![("ok", true.into())]);
        assert_eq!(inspect(&value), "{ ok: true }");
    }
}
