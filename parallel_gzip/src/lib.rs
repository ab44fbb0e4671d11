//! Parallel block-based gzip compressor and decompressor.
//!
//! Input is split into blocks (fixed-size raw chunks when compressing,
//! self-delimiting frames when decompressing), each block is transformed on a
//! worker pool, and the results are written strictly in input order.
//!
//! # Architecture
//!
//! 1. **Reader thread**: numbers blocks and feeds a [`BoundedQueue`]
//! 2. **Worker pool**: applies the [`BlockCodec`] to each block in parallel
//! 3. **Writer thread**: drains a [`ReorderBuffer`] in sequence order
//!
//! A [`Coordinator`] records the first fatal error and wakes every blocked
//! stage so the whole run unwinds without killing threads.
//!
//! Compressed output is a concatenation of gzip members, one per block, so it
//! can also be read by any multi-member gzip decoder.

pub mod block;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod reader;
pub mod reorder;
mod worker;
pub mod writer;

pub use block::{Block, Sequenced};
pub use codec::{BlockCodec, GzipCodec, Mode};
pub use config::PipelineConfig;
pub use coordinator::Coordinator;
pub use error::{ErrorKind, PipelineError, Result, Stage};
pub use pipeline::{run, RunSummary};
pub use progress::{NoProgress, Progress};
pub use queue::BoundedQueue;
pub use reader::StageOutcome;
pub use reorder::ReorderBuffer;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Compresses `source` into a stream of frames written to `sink`.
pub fn compress<R, W>(
    source: R,
    sink: W,
    total: u64,
    config: &PipelineConfig,
    progress: &dyn Progress,
) -> Result<RunSummary>
where
    R: Read + Send,
    W: Write + Send,
{
    let codec = GzipCodec::new(config.level);
    run(Mode::Compress, source, sink, &codec, config, total, progress)
}

/// Decompresses a stream of frames from `source` into `sink`.
pub fn decompress<R, W>(
    source: R,
    sink: W,
    total: u64,
    config: &PipelineConfig,
    progress: &dyn Progress,
) -> Result<RunSummary>
where
    R: Read + Send,
    W: Write + Send,
{
    let codec = GzipCodec::new(config.level);
    run(Mode::Decompress, source, sink, &codec, config, total, progress)
}

/// Runs `mode` from the file at `src` into a newly created file at `dst`.
pub fn process_file(
    mode: Mode,
    src: &Path,
    dst: &Path,
    config: &PipelineConfig,
    progress: &dyn Progress,
) -> Result<RunSummary> {
    let input = File::open(src)?;
    let total = input.metadata()?.len();
    let output = File::create(dst)?;
    let source = BufReader::new(input);
    let sink = BufWriter::new(output);
    match mode {
        Mode::Compress => compress(source, sink, total, config, progress),
        Mode::Decompress => decompress(source, sink, total, config, progress),
    }
}

/// Compresses an in-memory buffer.
pub fn compress_to_vec(data: &[u8], config: &PipelineConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    compress(data, &mut out, data.len() as u64, config, &NoProgress)?;
    Ok(out)
}

/// Decompresses an in-memory buffer of frames.
pub fn decompress_to_vec(data: &[u8], config: &PipelineConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decompress(data, &mut out, data.len() as u64, config, &NoProgress)?;
    Ok(out)
}
