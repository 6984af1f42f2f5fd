//! Chunked whole-file read state machine
//!
//! One-shot context created per whole-file read. Stats the descriptor
//! to learn the size, then issues bounded sequential reads until the
//! declared size is reached or end of file arrives early, then closes
//! (or, for caller-owned descriptors, synthesizes the close completion
//! one pool tick later) and delivers the assembled result exactly once.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::{Encoding, OwnedBuffer, Resolver, SubmitPool};

use super::{sys, FileStat, FsError, FsResult, CHUNK_CEILING, MAX_BUFFER_LENGTH};

/// Result of a whole-file read: raw bytes, or text when an encoding
/// was requested.
#[derive(Debug, Clone)]
pub enum ReadOutput {
    Bytes(OwnedBuffer),
    Text(String),
}

impl ReadOutput {
    pub fn into_bytes(self) -> OwnedBuffer {
        match self {
            ReadOutput::Bytes(buf) => buf,
            ReadOutput::Text(s) => OwnedBuffer::from_vec(s.into_bytes()),
        }
    }

    pub fn into_text(self) -> FsResult<String> {
        match self {
            ReadOutput::Text(s) => Ok(s),
            ReadOutput::Bytes(buf) => buf.decode(Encoding::Utf8).map_err(FsError::Decode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// Issuing bounded reads at the current offset.
    Reading,
    /// Closing (or synthesizing the close of) the descriptor.
    Closing,
}

struct ReadFileContext {
    pool: Arc<SubmitPool>,
    fd: RawFd,
    /// Whether the context opened the descriptor itself. A
    /// caller-owned descriptor is never closed via the OS call.
    close_fd: bool,
    /// Declared size from stat; 0 means unknown (streaming mode).
    size: u64,
    /// Cumulative bytes transferred.
    read: u64,
    /// Pre-sized buffer for the known-size mode.
    buffer: Option<OwnedBuffer>,
    /// Ordered chunk list for the unknown-size mode.
    chunks: Vec<OwnedBuffer>,
    encoding: Option<Encoding>,
    /// First error captured while reading; takes priority over any
    /// close-time error.
    err: Option<FsError>,
    state: ReadState,
    resolver: Option<Resolver<FsResult<ReadOutput>>>,
}

impl ReadFileContext {
    fn chunk_len(&self) -> usize {
        if self.size == 0 {
            CHUNK_CEILING
        } else {
            ((self.size - self.read).min(CHUNK_CEILING as u64)) as usize
        }
    }
}

type Ctx = Arc<Mutex<ReadFileContext>>;

/// Start a whole-file read on `fd`, delivering the assembled result
/// through `resolver`.
pub(crate) fn start(
    pool: Arc<SubmitPool>,
    fd: RawFd,
    close_fd: bool,
    encoding: Option<Encoding>,
    resolver: Resolver<FsResult<ReadOutput>>,
) {
    let ctx: Ctx = Arc::new(Mutex::new(ReadFileContext {
        pool: Arc::clone(&pool),
        fd,
        close_fd,
        size: 0,
        read: 0,
        buffer: None,
        chunks: Vec::new(),
        encoding,
        err: None,
        state: ReadState::Reading,
        resolver: Some(resolver),
    }));

    let after = Arc::clone(&ctx);
    pool.submit_io(move || sys::fstat(fd), move |res| after_stat(after, res));
}

fn after_stat(ctx: Ctx, res: io::Result<libc::stat>) {
    {
        let mut guard = ctx.lock();
        match res {
            Err(e) => {
                guard.err = Some(FsError::io("stat", e));
                guard.state = ReadState::Closing;
            }
            Ok(st) => {
                let stat = FileStat::from_raw(&st);
                // Only a regular file's reported size is trusted;
                // everything else streams with unknown size.
                let size = if stat.is_file() { stat.size } else { 0 };
                if size > MAX_BUFFER_LENGTH {
                    guard.err = Some(FsError::TooLarge);
                    guard.state = ReadState::Closing;
                } else {
                    guard.size = size;
                    if size > 0 {
                        guard.buffer = Some(OwnedBuffer::zeroed(size as usize));
                    }
                }
            }
        }
    }
    dispatch(ctx);
}

/// Run the next transition for the context's current state.
fn dispatch(ctx: Ctx) {
    let state = ctx.lock().state;
    match state {
        ReadState::Reading => read_step(ctx),
        ReadState::Closing => close_step(ctx),
    }
}

fn read_step(ctx: Ctx) {
    let (pool, fd, len) = {
        let guard = ctx.lock();
        (Arc::clone(&guard.pool), guard.fd, guard.chunk_len())
    };
    let after = Arc::clone(&ctx);
    pool.submit_io(move || sys::read(fd, len), move |res| after_read(after, res));
}

fn after_read(ctx: Ctx, res: io::Result<Vec<u8>>) {
    {
        let mut guard = ctx.lock();
        match res {
            Err(e) => {
                guard.err = Some(FsError::io("read", e));
                guard.state = ReadState::Closing;
            }
            Ok(bytes) if bytes.is_empty() => {
                // End of file, even when short of the declared size:
                // the file may have changed under us.
                tracing::trace!(read = guard.read, size = guard.size, "read context eof");
                guard.state = ReadState::Closing;
            }
            Ok(bytes) => {
                let n = bytes.len() as u64;
                if guard.size == 0 {
                    guard.chunks.push(OwnedBuffer::from_vec(bytes));
                    guard.read += n;
                } else {
                    let offset = guard.read as usize;
                    if let Some(buffer) = guard.buffer.as_mut() {
                        buffer.write_at(offset, &bytes);
                    }
                    guard.read += n;
                    if guard.read >= guard.size {
                        guard.state = ReadState::Closing;
                    }
                }
            }
        }
    }
    dispatch(ctx);
}

fn close_step(ctx: Ctx) {
    let (pool, fd, close_fd) = {
        let guard = ctx.lock();
        (Arc::clone(&guard.pool), guard.fd, guard.close_fd)
    };
    let after = Arc::clone(&ctx);
    if close_fd {
        pool.submit_io(
            move || sys::close(fd),
            move |res| after_close(after, res.err().map(|e| FsError::io("close", e))),
        );
    } else {
        // Caller-owned descriptor: never close it via the OS call,
        // only synthesize the completion asynchronously.
        pool.submit(move || after_close(after, None));
    }
}

fn after_close(ctx: Ctx, close_err: Option<FsError>) {
    let (resolver, result) = {
        let mut guard = ctx.lock();
        let resolver = guard.resolver.take();
        let result = if let Some(err) = guard.err.take() {
            Err(err)
        } else if let Some(err) = close_err {
            Err(err)
        } else {
            let read = guard.read as usize;
            let buffer = if guard.size == 0 {
                OwnedBuffer::concat(&guard.chunks, read)
            } else {
                let mut buffer = guard.buffer.take().unwrap_or_default();
                if (read as u64) < guard.size {
                    // Transfer ended short: return exactly the bytes
                    // actually read.
                    buffer.truncate(read);
                }
                buffer
            };
            match guard.encoding {
                None => Ok(ReadOutput::Bytes(buffer)),
                Some(encoding) => buffer
                    .decode(encoding)
                    .map(ReadOutput::Text)
                    .map_err(FsError::Decode),
            }
        };
        (resolver, result)
    };
    if let Some(resolver) = resolver {
        resolver.settle(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Promise;
    use std::ffi::CString;

    fn read_with_context(path: &str, close_fd: bool) -> FsResult<ReadOutput> {
        let pool = Arc::new(SubmitPool::new(2));
        let c = CString::new(path).unwrap();
        let fd = sys::open(&c, libc::O_RDONLY, 0).unwrap();
        let (promise, resolver) = Promise::new();
        start(Arc::clone(&pool), fd, close_fd, None, resolver);
        let result = promise.wait();
        if !close_fd {
            sys::close(fd).unwrap();
        }
        result
    }

    #[test]
    fn test_reads_across_chunk_boundary() {
        let path = "/tmp/lyre_readctx_chunks.bin";
        let data: Vec<u8> = (0..CHUNK_CEILING + 123).map(|i| (i % 251) as u8).collect();
        std::fs::write(path, &data).unwrap();

        let out = read_with_context(path, true).unwrap();
        assert_eq!(out.into_bytes().as_slice(), &data[..]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_empty_file_yields_empty_buffer() {
        let path = "/tmp/lyre_readctx_empty.bin";
        std::fs::write(path, b"").unwrap();

        let out = read_with_context(path, true).unwrap();
        assert!(out.into_bytes().is_empty());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_caller_owned_descriptor_stays_open() {
        let path = "/tmp/lyre_readctx_userfd.bin";
        std::fs::write(path, b"payload").unwrap();

        let pool = Arc::new(SubmitPool::new(2));
        let c = CString::new(path).unwrap();
        let fd = sys::open(&c, libc::O_RDONLY, 0).unwrap();

        let (promise, resolver) = Promise::new();
        start(Arc::clone(&pool), fd, false, None, resolver);
        let out = promise.wait().unwrap();
        assert_eq!(out.into_bytes().as_slice(), b"payload");

        // The descriptor must still be usable after the read.
        assert!(sys::fstat(fd).is_ok());
        sys::close(fd).unwrap();
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_unknown_size_streaming_mode() {
        // A character device has no trusted size; the reader streams.
        let out = read_with_context("/dev/null", true).unwrap();
        assert!(out.into_bytes().is_empty());
    }

    #[test]
    fn test_text_decode_on_completion() {
        let path = "/tmp/lyre_readctx_text.txt";
        std::fs::write(path, "héllo").unwrap();

        let pool = Arc::new(SubmitPool::new(2));
        let c = CString::new(path).unwrap();
        let fd = sys::open(&c, libc::O_RDONLY, 0).unwrap();
        let (promise, resolver) = Promise::new();
        start(Arc::clone(&pool), fd, true, Some(Encoding::Utf8), resolver);
        match promise.wait().unwrap() {
            ReadOutput::Text(s) => assert_eq!(s, "héllo"),
            other => panic!("expected text, got {:?}", other),
        }

        std::fs::remove_file(path).ok();
    }
}
