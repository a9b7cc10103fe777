//! Job records handed to worker threads.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Identifier of a scheduled job: the index of the slot it occupies.
pub type JobId = u32;

/// View of the worker executing a job, passed to the job callback.
pub struct WorkerRef<'a> {
    pub(super) index: usize,
    pub(super) stop: &'a AtomicBool,
}

impl WorkerRef<'_> {
    /// Index of the executing worker.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the pool is shutting down. Long callbacks should poll this
    /// and return early when set.
    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// A unit of work: a one-shot closure plus whatever it captured.
///
/// The captured payload travels with the closure, so its destructors run
/// exactly once no matter what happens to the job: inside the call when a
/// worker invokes it, or when the un-invoked `Job` is dropped because the
/// queue rejected it or shut down with the job still queued.
pub struct Job {
    run: Box<dyn FnOnce(&WorkerRef<'_>) + Send + 'static>,
}

impl Job {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&WorkerRef<'_>) + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    pub(super) fn invoke(self, cx: &WorkerRef<'_>) {
        (self.run)(cx)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").finish_non_exhaustive()
    }
}
