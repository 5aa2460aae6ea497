//!
//! Progress and cancellation shared between an engine and its caller
//!
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

///
/// Status record polled by the caller.
///
/// Clones share the same record, so the caller keeps one clone and hands
/// another to the worker. `progress` is in arbitrary units (usually percent)
/// and each engine call adds its `border` to it while running.
///
#[derive(Debug, Clone, Default)]
pub struct TaskStatus {
    progress: Arc<AtomicUsize>,
    cancel: Arc<AtomicBool>,
}

impl TaskStatus {
    pub fn new() -> TaskStatus {
        TaskStatus::default()
    }
    ///
    /// Status with its own progress counter but the cancellation flag of
    /// `self`, for one of many concurrent tasks.
    ///
    pub fn subtask(&self) -> TaskStatus {
        TaskStatus {
            progress: Arc::new(AtomicUsize::new(0)),
            cancel: Arc::clone(&self.cancel),
        }
    }
    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }
    pub fn set_progress(&self, value: usize) {
        self.progress.store(value, Ordering::Relaxed);
    }
    /// request the engines to stop at the next sequence position
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
    pub fn is_canceled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
    ///
    /// Checkpoint of a row: `done` of `total` rows are finished.
    /// Maps them linearly onto `start..start+border` and returns the
    /// cancellation flag.
    ///
    pub(crate) fn checkpoint(&self, start: usize, border: usize, done: usize, total: usize) -> bool {
        let step = (border as f64 / total as f64 * done as f64) as usize;
        self.set_progress(start + step);
        self.is_canceled()
    }
}
