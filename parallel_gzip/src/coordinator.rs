//! First-error tracking and cooperative cancellation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tracing::{debug, error};

use crate::block::Block;
use crate::error::{PipelineError, Result, Stage};
use crate::queue::BoundedQueue;
use crate::reorder::ReorderBuffer;

/// Shared failure state for one pipeline run.
///
/// The first reported error wins; every report flips the cancellation flag
/// and force-wakes all waits in the intake queue and the reorder buffer, so
/// each stage observes cancellation at its next wake-up and unwinds.
pub struct Coordinator<'a> {
    error: OnceLock<PipelineError>,
    cancelled: AtomicBool,
    queue: &'a BoundedQueue<Block>,
    reorder: &'a ReorderBuffer<Block>,
}

impl<'a> Coordinator<'a> {
    /// Creates a coordinator that can wake `queue` and `reorder` on cancel.
    pub fn new(queue: &'a BoundedQueue<Block>, reorder: &'a ReorderBuffer<Block>) -> Self {
        Self {
            error: OnceLock::new(),
            cancelled: AtomicBool::new(false),
            queue,
            reorder,
        }
    }

    /// Records `err` if it is the first fatal error, then cancels the run.
    pub fn report_fatal(&self, stage: Stage, err: PipelineError) {
        match self.error.set(err) {
            Ok(()) => {
                if let Some(first) = self.error.get() {
                    error!(%stage, error = %first, "fatal error, cancelling pipeline");
                }
            }
            Err(later) => {
                debug!(%stage, error = %later, "discarding error reported after the first");
            }
        }
        self.cancel();
    }

    /// Requests cancellation and wakes every blocked stage. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            debug!("cancellation requested");
        }
        self.queue.close();
        self.reorder.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Runs a stage body, turning a panic into a fatal error for `stage`.
    pub fn guard<T>(&self, stage: Stage, body: impl FnOnce() -> T) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(value) => Some(value),
            Err(_) => {
                self.report_fatal(stage, PipelineError::Panicked { stage });
                None
            }
        }
    }

    /// Consumes the coordinator once every thread has joined.
    pub fn into_result(self) -> Result<()> {
        match self.error.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
