//! Runtime support for the native core.
//!
//! Contains the I/O submission pool and the byte-container type shared
//! by the filesystem layer:
//!
//! - `submit`: a worker-thread pool implementing the submit/on-complete
//!   contract every asynchronous file operation is built on, plus the
//!   one-shot `Promise` completion cell used to hand results back.
//! - `buffer`: `OwnedBuffer`, the owned byte container passed through
//!   chunked reads and writes.

pub mod buffer;
pub mod submit;

pub use buffer::{Encoding, OwnedBuffer};
pub use submit::{CancelToken, Promise, Resolver, SubmitPool};
