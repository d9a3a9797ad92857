//! Core data types shared by the copy and verify engines: tasks, the
//! progress-event stream, the verify summary, and cooperative cancellation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single file to copy, with its mirrored destination pre-computed by the
/// caller. Immutable once enqueued -- workers do no path math.
#[derive(Debug, Clone)]
pub struct CopyTask {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// A single file to re-hash and compare against an expected digest.
#[derive(Debug, Clone)]
pub struct VerifyTask {
    pub path: PathBuf,
    pub expected: String,
}

/// One completed copy's digest, paired with the destination path it was
/// computed for. Rendered by `engine::manifest::render_line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashLine {
    pub digest: String,
    pub dest: PathBuf,
}

/// A progress update emitted by the Supervisor to its caller. Exactly one
/// variant's fields are set per event -- there is no shared "kind" field to
/// get out of sync with the payload.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Periodic, throttled at >=100ms per file per worker.
    FileProgress {
        path: PathBuf,
        bytes_so_far: u64,
        bytes_total: u64,
    },
    /// Exactly once per task, whether it succeeded or failed.
    FileDone {
        path: PathBuf,
        completed_files: u64,
        total_files: u64,
    },
    /// Emitted at run start (0/total) and after each FileDone.
    Overall {
        completed_files: u64,
        total_files: u64,
    },
}

/// A sink for `ProgressEvent`s, invoked only from the Supervisor's loop.
/// Implementations must not perform slow work -- the call backs up the pool.
pub trait ProgressSink: Send {
    fn on_event(&mut self, event: ProgressEvent);
}

/// A sink that discards every event. The default when the caller doesn't
/// care about progress.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&mut self, _event: ProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent) + Send,
{
    fn on_event(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Outcome of a verify-run, including partial results on cancellation.
#[derive(Debug, Clone, Default)]
pub struct VerifySummary {
    pub total: u64,
    pub ok: u64,
    pub mismatched: u64,
    pub errors: u64,
    pub mismatched_paths: Vec<PathBuf>,
    pub error_paths: Vec<PathBuf>,
}

/// A one-shot cancellation flag, observable by the Supervisor and workers.
/// Once set, it is never unset; clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Trip the flag. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
