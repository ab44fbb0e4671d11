//! Ordered output stage.

use std::io::{self, Write};
use std::time::Duration;

use tracing::debug;

use crate::block::Block;
use crate::coordinator::Coordinator;
use crate::error::Stage;
use crate::progress::{Progress, Throttle};
use crate::reader::StageOutcome;
use crate::reorder::ReorderBuffer;

/// Thin wrapper around the output sink with an explicit `finish()` that
/// flushes it.
pub struct OutputWriter<W: Write>(W);

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W) -> Self {
        OutputWriter(writer)
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.0.flush()?;
        Ok(self.0)
    }
}

impl<W: Write> Write for OutputWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct WriterReport {
    pub outcome: StageOutcome,
    pub blocks: u64,
    pub processed: u64,
    pub written: u64,
}

pub(crate) struct Writer<'a, W: Write> {
    out: OutputWriter<W>,
    reorder: &'a ReorderBuffer<Block>,
    coordinator: &'a Coordinator<'a>,
    progress: &'a dyn Progress,
    throttle: Throttle,
    total: u64,
    blocks: u64,
    processed: u64,
    written: u64,
}

impl<'a, W: Write> Writer<'a, W> {
    pub fn new(
        sink: W,
        reorder: &'a ReorderBuffer<Block>,
        coordinator: &'a Coordinator<'a>,
        progress: &'a dyn Progress,
        progress_interval: Duration,
        total: u64,
    ) -> Self {
        Self {
            out: OutputWriter::new(sink),
            reorder,
            coordinator,
            progress,
            throttle: Throttle::new(progress_interval),
            total,
            blocks: 0,
            processed: 0,
            written: 0,
        }
    }

    pub fn run(mut self) -> WriterReport {
        debug!("writer started");
        let outcome = match self.drain() {
            Ok(()) if self.coordinator.is_cancelled() => StageOutcome::Cancelled,
            Ok(()) => match self.out.finish() {
                Ok(_) => {
                    self.progress.update(self.processed, self.total);
                    StageOutcome::Finished
                }
                Err(err) => {
                    self.coordinator.report_fatal(Stage::Writer, err.into());
                    StageOutcome::Failed
                }
            },
            Err(err) => {
                self.coordinator.report_fatal(Stage::Writer, err.into());
                StageOutcome::Failed
            }
        };
        debug!(
            ?outcome,
            blocks = self.blocks,
            written = self.written,
            "writer stopped"
        );
        WriterReport {
            outcome,
            blocks: self.blocks,
            processed: self.processed,
            written: self.written,
        }
    }

    fn drain(&mut self) -> io::Result<()> {
        while let Some(block) = self.reorder.take() {
            self.out.write_all(&block.payload)?;
            self.blocks += 1;
            self.processed += block.input_len;
            self.written += block.payload.len() as u64;

            if self.throttle.ready() {
                self.progress.update(self.processed, self.total);
            }
        }
        Ok(())
    }
}
