//! Error types for a pipeline run.
//!
//! Every stage reports failures as a [`PipelineError`]; only the first one
//! reported reaches the caller. [`PipelineError::kind`] groups them so a
//! front end can choose a message without matching every variant.

use std::fmt;
use std::io;

use thiserror::Error;

/// Fatal errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt input in block {sequence}: {reason}")]
    CorruptInput { sequence: u64, reason: String },

    #[error("codec failure in block {sequence}: {source}")]
    Codec {
        sequence: u64,
        #[source]
        source: io::Error,
    },

    #[error("block {sequence} compressed to {len} bytes, more than a frame can hold")]
    FrameTooLarge { sequence: u64, len: usize },

    #[error(
        "block size {block_size} can produce frames over the {max_frame_len} byte frame limit"
    )]
    BlockSizeTooLarge {
        block_size: usize,
        max_frame_len: usize,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{stage} thread panicked")]
    Panicked { stage: Stage },
}

/// Coarse classification used by callers to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Corrupt,
    Io,
    /// The run was refused before it started.
    Config,
    Internal,
}

/// Pipeline stage that owns a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reader,
    Worker,
    Writer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Reader => "reader",
            Stage::Worker => "worker",
            Stage::Writer => "writer",
        })
    }
}

impl PipelineError {
    /// Shorthand for [`PipelineError::CorruptInput`].
    pub fn corrupt(sequence: u64, reason: impl Into<String>) -> Self {
        Self::CorruptInput {
            sequence,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::CorruptInput { .. } => ErrorKind::Corrupt,
            PipelineError::Io(_) => ErrorKind::Io,
            PipelineError::BlockSizeTooLarge { .. } => ErrorKind::Config,
            PipelineError::Codec { .. }
            | PipelineError::FrameTooLarge { .. }
            | PipelineError::ThreadPool(_)
            | PipelineError::Panicked { .. } => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
