//! Chunked whole-buffer write loop
//!
//! Issues bounded sub-writes against the remaining unwritten suffix of
//! the payload until zero bytes remain, then closes the descriptor when
//! the context opened it. Each sub-write's byte count is subtracted
//! before the next iteration; a failure aborts the loop and surfaces
//! immediately.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::{OwnedBuffer, Resolver, SubmitPool};

use super::{sys, FsError, FsResult, CHUNK_CEILING};

struct WriteFileContext {
    pool: Arc<SubmitPool>,
    fd: RawFd,
    /// Whether the context opened the descriptor itself and must
    /// close it on every exit path.
    close_fd: bool,
    data: OwnedBuffer,
    written: usize,
    /// First error captured while writing; takes priority over any
    /// close-time error.
    err: Option<FsError>,
    resolver: Option<Resolver<FsResult<()>>>,
}

type Ctx = Arc<Mutex<WriteFileContext>>;

/// Start a whole-buffer write of `data` to `fd`, delivering completion
/// through `resolver`.
///
/// Callers short-circuit zero-length payloads with no open descriptor
/// themselves; a zero-length payload reaching this loop with an open
/// descriptor skips straight to the close step without issuing writes.
pub(crate) fn start(
    pool: Arc<SubmitPool>,
    fd: RawFd,
    close_fd: bool,
    data: OwnedBuffer,
    resolver: Resolver<FsResult<()>>,
) {
    let ctx: Ctx = Arc::new(Mutex::new(WriteFileContext {
        pool,
        fd,
        close_fd,
        data,
        written: 0,
        err: None,
        resolver: Some(resolver),
    }));
    write_step(ctx);
}

fn write_step(ctx: Ctx) {
    let (pool, fd, chunk) = {
        let guard = ctx.lock();
        let remaining = guard.data.len() - guard.written;
        if remaining == 0 || guard.err.is_some() {
            drop(guard);
            return finish(ctx);
        }
        let take = remaining.min(CHUNK_CEILING);
        let chunk = guard.data.as_slice()[guard.written..guard.written + take].to_vec();
        (Arc::clone(&guard.pool), guard.fd, chunk)
    };
    let after = Arc::clone(&ctx);
    pool.submit_io(
        move || sys::write(fd, &chunk),
        move |res| after_write(after, res),
    );
}

fn after_write(ctx: Ctx, res: io::Result<usize>) {
    {
        let mut guard = ctx.lock();
        match res {
            Err(e) => guard.err = Some(FsError::io("write", e)),
            Ok(n) => guard.written += n,
        }
    }
    write_step(ctx);
}

/// Close when the context owns the descriptor, then settle, keeping
/// any write error over a close error.
fn finish(ctx: Ctx) {
    let (pool, fd, close_fd) = {
        let guard = ctx.lock();
        (Arc::clone(&guard.pool), guard.fd, guard.close_fd)
    };
    if close_fd {
        let after = Arc::clone(&ctx);
        pool.submit_io(
            move || sys::close(fd),
            move |res| settle(after, res.err().map(|e| FsError::io("close", e))),
        );
    } else {
        settle(ctx, None);
    }
}

fn settle(ctx: Ctx, close_err: Option<FsError>) {
    let (resolver, result) = {
        let mut guard = ctx.lock();
        let resolver = guard.resolver.take();
        let result = match guard.err.take() {
            Some(err) => Err(err),
            None => match close_err {
                Some(err) => Err(err),
                None => Ok(()),
            },
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

    fn write_with_loop(path: &str, data: &[u8]) {
        let pool = Arc::new(SubmitPool::new(2));
        let c = CString::new(path).unwrap();
        let fd = sys::open(
            &c,
            libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            0o644,
        )
        .unwrap();
        let (promise, resolver) = Promise::new();
        start(pool, fd, true, OwnedBuffer::from_slice(data), resolver);
        promise.wait().unwrap();
    }

    #[test]
    fn test_write_small_payload() {
        let path = "/tmp/lyre_writeloop_small.bin";
        write_with_loop(path, b"hello");
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_write_across_chunk_boundary() {
        let path = "/tmp/lyre_writeloop_chunks.bin";
        let data: Vec<u8> = (0..CHUNK_CEILING * 2 + 77).map(|i| (i % 253) as u8).collect();
        write_with_loop(path, &data);
        assert_eq!(std::fs::read(path).unwrap(), data);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_zero_length_payload_closes_only() {
        let path = "/tmp/lyre_writeloop_zero.bin";
        write_with_loop(path, b"");
        assert_eq!(std::fs::read(path).unwrap(), b"");
        std::fs::remove_file(path).ok();
    }
}
