//! I/O submission pool
//!
//! A bounded pool of worker threads implementing the submit/on-complete
//! contract: blocking OS work is submitted as a job, and its completion
//! callback fires exactly once on a pool thread, never inline with the
//! submitting call.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::LyreConfig;

/// A unit of blocking work handed to the pool.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker-thread pool for blocking I/O.
pub struct SubmitPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    submitted: AtomicU64,
}

impl SubmitPool {
    /// Create a pool with the given number of worker threads (minimum 1).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(threads);
        for n in 0..threads {
            let rx: Receiver<Job> = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("lyre-io-{}", n))
                .spawn(move || {
                    tracing::debug!(worker = n, "io worker started");
                    while let Ok(job) = rx.recv() {
                        job();
                    }
                })
                .expect("failed to spawn io worker");
            workers.push(handle);
        }
        Self {
            tx: Some(tx),
            workers,
            submitted: AtomicU64::new(0),
        }
    }

    /// Submit a job for execution on a pool thread.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let seq = self.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(seq, "io job submitted");
        if let Some(tx) = &self.tx {
            // Send only fails after shutdown; jobs submitted during
            // teardown are dropped.
            let _ = tx.send(Box::new(job));
        }
    }

    /// Submit a blocking operation and deliver its result to `on_complete`.
    ///
    /// The completion callback runs on a pool thread, exactly once,
    /// never inline with this call.
    pub fn submit_io<T, Op, Done>(&self, op: Op, on_complete: Done)
    where
        T: Send + 'static,
        Op: FnOnce() -> T + Send + 'static,
        Done: FnOnce(T) + Send + 'static,
    {
        self.submit(move || {
            let result = op();
            on_complete(result);
        });
    }

    /// Submit a job that observes a cancellation token.
    ///
    /// The job receives `true` when the token was cancelled before the
    /// job started running. A cancellation that races with a running
    /// job is not interrupted; the job's own completion is delivered.
    pub fn submit_cancellable<F>(&self, token: CancelToken, job: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.submit(move || {
            job(token.is_cancelled());
        });
    }

    /// Total number of jobs submitted over the pool's lifetime.
    ///
    /// Used by tests to assert that short-circuited operations never
    /// reach the OS layer.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// The process-wide pool used by the module-level fs operations.
    pub fn global() -> &'static Arc<SubmitPool> {
        &GLOBAL_POOL
    }
}

impl Drop for SubmitPool {
    fn drop(&mut self) {
        // Closing the channel lets every worker drain and exit.
        self.tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_POOL: Arc<SubmitPool> = {
        let threads = LyreConfig::find_and_load(
            &std::env::current_dir().unwrap_or_else(|_| "/".into()),
        )
        .map(|c| c.io.worker_threads)
        .unwrap_or_else(|_| LyreConfig::default().io.worker_threads);
        Arc::new(SubmitPool::new(threads))
    };
}

/// Cooperative cancellation flag for in-flight submissions.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// =============================================================================
// Promise: one-shot completion cell
// =============================================================================

enum SettleState<T> {
    /// Not yet settled; an optional callback consumes the value on settle.
    Pending(Option<Box<dyn FnOnce(T) + Send>>),
    /// Settled; value waiting to be taken by `wait`.
    Settled(Option<T>),
}

struct PromiseInner<T> {
    state: Mutex<SettleState<T>>,
    cv: Condvar,
}

/// The consuming half of a one-shot completion.
///
/// Created together with a [`Resolver`]; settles exactly once with the
/// operation's result.
pub struct Promise<T> {
    inner: Arc<PromiseInner<T>>,
}

/// The producing half of a one-shot completion.
pub struct Resolver<T> {
    inner: Arc<PromiseInner<T>>,
}

impl<T: Send + 'static> Promise<T> {
    /// Create a pending promise and its resolver.
    pub fn new() -> (Promise<T>, Resolver<T>) {
        let inner = Arc::new(PromiseInner {
            state: Mutex::new(SettleState::Pending(None)),
            cv: Condvar::new(),
        });
        (
            Promise {
                inner: Arc::clone(&inner),
            },
            Resolver { inner },
        )
    }

    /// Create a promise that is already settled with `value`.
    ///
    /// Used by operations that short-circuit without submitting any
    /// work (zero-length reads and writes, validation failures).
    pub fn settled(value: T) -> Promise<T> {
        Promise {
            inner: Arc::new(PromiseInner {
                state: Mutex::new(SettleState::Settled(Some(value))),
                cv: Condvar::new(),
            }),
        }
    }

    /// Block the calling thread until the promise settles, then take
    /// the result.
    pub fn wait(self) -> T {
        let mut state = self.inner.state.lock();
        loop {
            match &mut *state {
                SettleState::Settled(value) => {
                    return value.take().expect("promise waited on twice");
                }
                SettleState::Pending(_) => {
                    self.inner.cv.wait(&mut state);
                }
            }
        }
    }

    /// True once the promise has settled.
    pub fn is_settled(&self) -> bool {
        matches!(&*self.inner.state.lock(), SettleState::Settled(_))
    }

    /// Consume the promise, running `f` with the result once available.
    ///
    /// If the promise is already settled, `f` runs on the current
    /// thread; otherwise it runs on the thread that settles.
    pub fn on_settled<F>(self, f: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        match &mut *state {
            SettleState::Settled(value) => {
                let value = value.take().expect("promise already consumed");
                drop(state);
                f(value);
            }
            SettleState::Pending(slot) => {
                *slot = Some(Box::new(f));
            }
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settled = matches!(&*self.inner.state.lock(), SettleState::Settled(_));
        f.debug_struct("Promise")
            .field("settled", &settled)
            .finish()
    }
}

impl<T: Send + 'static> Resolver<T> {
    /// Settle the promise. Consumes the resolver; a promise settles at
    /// most once.
    pub fn settle(self, value: T) {
        let callback = {
            let mut state = self.inner.state.lock();
            match std::mem::replace(&mut *state, SettleState::Settled(None)) {
                SettleState::Pending(Some(cb)) => Some((cb, value)),
                SettleState::Pending(None) => {
                    *state = SettleState::Settled(Some(value));
                    self.inner.cv.notify_all();
                    None
                }
                SettleState::Settled(prev) => {
                    // Settling twice is a contract violation upstream;
                    // keep the first result.
                    *state = SettleState::Settled(prev);
                    None
                }
            }
        };
        if let Some((cb, value)) = callback {
            cb(value);
        }
    }
}
