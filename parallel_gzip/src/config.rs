//! Run settings shared by every stage.
//!
//! A [`PipelineConfig`] starts from the defaults below and is adjusted with
//! the `with_*` builders, which clamp out-of-range values instead of failing.
//! The one cross-field rule, that a compressed block must always fit in a
//! frame the decompressor accepts, is checked by [`PipelineConfig::validate`]
//! when a run starts.
//!
//! # Examples
//!
//! ```
//! use parallel_gzip::{Mode, PipelineConfig};
//!
//! let config = PipelineConfig::default()
//!     .with_block_size(256 * 1024)
//!     .with_workers(4)
//!     .with_level(9);
//! assert!(config.validate(Mode::Compress).is_ok());
//!
//! let oversized = PipelineConfig::default().with_block_size(128 << 20);
//! assert!(oversized.validate(Mode::Compress).is_err());
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::codec::Mode;
use crate::error::{PipelineError, Result};

/// Raw block size used when splitting input for compression.
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;

/// Blocks allowed between the reader and the worker pool.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// In-order blocks allowed to wait for the writer.
pub const DEFAULT_REORDER_CAPACITY: usize = 50;

/// Upper bound on a declared frame length when decompressing.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 << 20;

/// Tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Raw bytes per block when compressing. Ignored when decompressing,
    /// where frames carry their own length.
    pub block_size: usize,
    /// Capacity of the intake queue between the reader and the workers.
    pub queue_capacity: usize,
    /// Ready blocks the reorder buffer holds before workers wait.
    pub reorder_capacity: usize,
    pub workers: usize,
    /// Gzip level, 0-9.
    pub level: u32,
    /// Largest frame, header included, the reader accepts and the workers
    /// may produce.
    pub max_frame_len: usize,
    /// Minimum time between two progress updates.
    pub progress_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reorder_capacity: DEFAULT_REORDER_CAPACITY,
            workers: default_workers(),
            level: 6,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            progress_interval: Duration::from_millis(100),
        }
    }
}

impl PipelineConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_reorder_capacity(mut self, capacity: usize) -> Self {
        self.reorder_capacity = capacity.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Checks that a run in `mode` can only write frames it can read back.
    ///
    /// Compression fails with [`PipelineError::BlockSizeTooLarge`] when the
    /// worst-case frame for `block_size` exceeds `max_frame_len`.
    pub fn validate(&self, mode: Mode) -> Result<()> {
        if mode == Mode::Compress && worst_case_frame_len(self.block_size) > self.max_frame_len {
            return Err(PipelineError::BlockSizeTooLarge {
                block_size: self.block_size,
                max_frame_len: self.max_frame_len,
            });
        }
        Ok(())
    }
}

/// Upper bound on the frame a gzip member of `block_size` raw bytes needs.
///
/// Follows zlib's `deflateBound`: incompressible input falls back to stored
/// deflate blocks, plus a fixed allowance for the gzip header and trailer.
pub fn worst_case_frame_len(block_size: usize) -> usize {
    block_size
        .saturating_add(block_size >> 12)
        .saturating_add(block_size >> 14)
        .saturating_add(block_size >> 25)
        .saturating_add(64)
}

/// One worker per available processor.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
