//! Parallel transform stage.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::ThreadPoolBuilder;
use tracing::debug;

use crate::block::Block;
use crate::codec::{BlockCodec, Mode};
use crate::coordinator::Coordinator;
use crate::error::{PipelineError, Result, Stage};
use crate::frame;
use crate::queue::BoundedQueue;
use crate::reorder::ReorderBuffer;

/// Fixed set of symmetric workers pulling from the intake queue and pushing
/// into the reorder buffer.
pub(crate) struct WorkerPool<'a, C: ?Sized> {
    codec: &'a C,
    mode: Mode,
    workers: usize,
    max_frame_len: usize,
    queue: &'a BoundedQueue<Block>,
    reorder: &'a ReorderBuffer<Block>,
    coordinator: &'a Coordinator<'a>,
}

impl<'a, C: BlockCodec + ?Sized> WorkerPool<'a, C> {
    pub fn new(
        codec: &'a C,
        mode: Mode,
        workers: usize,
        max_frame_len: usize,
        queue: &'a BoundedQueue<Block>,
        reorder: &'a ReorderBuffer<Block>,
        coordinator: &'a Coordinator<'a>,
    ) -> Self {
        Self {
            codec,
            mode,
            workers: workers.max(1),
            max_frame_len,
            queue,
            reorder,
            coordinator,
        }
    }

    /// Runs every worker to completion on a dedicated thread pool.
    ///
    /// Blocks the calling thread until all workers have exited. The last
    /// worker to exit finishes the reorder buffer.
    pub fn run(&self) {
        let pool = match ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("pgz-worker-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(err) => {
                self.coordinator.report_fatal(Stage::Worker, err.into());
                return;
            }
        };

        let remaining = AtomicUsize::new(self.workers);
        pool.scope(|s| {
            for id in 0..self.workers {
                let remaining = &remaining;
                s.spawn(move |_| {
                    self.coordinator.guard(Stage::Worker, || self.work(id));
                    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        debug!("last worker exited");
                        self.reorder.finish();
                    }
                });
            }
        });
    }

    fn work(&self, id: usize) {
        debug!(worker = id, "worker started");
        let mut processed = 0u64;

        while !self.coordinator.is_cancelled() {
            let Some(mut block) = self.queue.pop() else {
                break;
            };
            if let Err(err) = self.transform(&mut block) {
                self.coordinator.report_fatal(Stage::Worker, err);
                break;
            }
            if self.reorder.insert(block).is_err() {
                break;
            }
            processed += 1;
        }

        debug!(worker = id, blocks = processed, "worker exited");
    }

    fn transform(&self, block: &mut Block) -> Result<()> {
        let sequence = block.sequence;
        match self.mode {
            Mode::Compress => {
                let mut framed = self
                    .codec
                    .compress(&block.payload)
                    .map_err(|source| PipelineError::Codec { sequence, source })?;
                // A frame the reader would refuse must never be written.
                if framed.len() > self.max_frame_len {
                    return Err(PipelineError::FrameTooLarge {
                        sequence,
                        len: framed.len(),
                    });
                }
                frame::stamp_length(&mut framed, sequence)?;
                block.payload = framed;
            }
            Mode::Decompress => {
                block.payload = self
                    .codec
                    .decompress(&block.payload)
                    .map_err(|err| PipelineError::corrupt(sequence, err.to_string()))?;
            }
        }
        Ok(())
    }
}
