//! Sequential intake: splits the source into numbered blocks.

use std::io::{self, Read};

use tracing::debug;

use crate::block::Block;
use crate::codec::Mode;
use crate::coordinator::Coordinator;
use crate::error::{PipelineError, Result, Stage};
use crate::frame::{FrameHeader, HEADER_LEN};
use crate::queue::BoundedQueue;

/// Terminal state of the reader or writer stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Finished,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ReaderReport {
    pub outcome: StageOutcome,
    pub blocks: u64,
    pub bytes: u64,
}

pub(crate) struct Reader<'a, R> {
    source: R,
    mode: Mode,
    block_size: usize,
    max_frame_len: usize,
    queue: &'a BoundedQueue<Block>,
    coordinator: &'a Coordinator<'a>,
    blocks: u64,
    bytes: u64,
}

impl<'a, R: Read> Reader<'a, R> {
    pub fn new(
        source: R,
        mode: Mode,
        block_size: usize,
        max_frame_len: usize,
        queue: &'a BoundedQueue<Block>,
        coordinator: &'a Coordinator<'a>,
    ) -> Self {
        Self {
            source,
            mode,
            block_size: block_size.max(1),
            max_frame_len,
            queue,
            coordinator,
            blocks: 0,
            bytes: 0,
        }
    }

    pub fn run(mut self) -> ReaderReport {
        debug!(mode = ?self.mode, block_size = self.block_size, "reader started");
        let outcome = match self.read_blocks() {
            Ok(true) => {
                // Workers drain what is left, then see the end of the queue.
                self.queue.close();
                StageOutcome::Finished
            }
            Ok(false) => StageOutcome::Cancelled,
            Err(err) => {
                self.coordinator.report_fatal(Stage::Reader, err);
                StageOutcome::Failed
            }
        };
        debug!(?outcome, blocks = self.blocks, bytes = self.bytes, "reader stopped");
        ReaderReport {
            outcome,
            blocks: self.blocks,
            bytes: self.bytes,
        }
    }

    /// Returns `Ok(false)` if the run was cancelled before the source ended.
    fn read_blocks(&mut self) -> Result<bool> {
        loop {
            if self.coordinator.is_cancelled() {
                return Ok(false);
            }

            let sequence = self.blocks;
            let next = match self.mode {
                Mode::Compress => self.next_raw_block(sequence)?,
                Mode::Decompress => self.next_frame(sequence)?,
            };
            let Some(block) = next else {
                return Ok(true);
            };

            let input_len = block.input_len;
            if self.queue.push(block).is_err() {
                return Ok(false);
            }
            self.blocks += 1;
            self.bytes += input_len;
        }
    }

    fn next_raw_block(&mut self, sequence: u64) -> Result<Option<Block>> {
        let mut payload = Vec::with_capacity(self.block_size);
        (&mut self.source)
            .take(self.block_size as u64)
            .read_to_end(&mut payload)?;

        // An empty source still yields one empty block so the output holds
        // a valid frame.
        if payload.is_empty() && sequence > 0 {
            return Ok(None);
        }
        Ok(Some(Block::new(sequence, payload)))
    }

    fn next_frame(&mut self, sequence: u64) -> Result<Option<Block>> {
        let mut raw = [0u8; HEADER_LEN];
        let filled = read_up_to(&mut self.source, &mut raw)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < HEADER_LEN {
            return Err(PipelineError::corrupt(
                sequence,
                format!("truncated frame header ({filled} of {HEADER_LEN} bytes)"),
            ));
        }

        let header = FrameHeader::parse(&raw, sequence, self.max_frame_len)?;
        let mut frame = vec![0u8; header.length as usize];
        frame[..HEADER_LEN].copy_from_slice(&raw);
        self.source
            .read_exact(&mut frame[HEADER_LEN..])
            .map_err(|err| match err.kind() {
                io::ErrorKind::UnexpectedEof => PipelineError::corrupt(
                    sequence,
                    format!("truncated frame body, expected {} bytes", header.body_len()),
                ),
                _ => PipelineError::Io(err),
            })?;

        Ok(Some(Block::new(sequence, frame)))
    }
}

/// Fills `buf` as far as the source allows; returns the number of bytes read.
fn read_up_to<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
