//! Wires reader, worker pool and writer together for one run.

use std::io::{Read, Write};
use std::thread;

use tracing::{debug, info};

use crate::codec::{BlockCodec, Mode};
use crate::config::PipelineConfig;
use crate::coordinator::Coordinator;
use crate::error::{Result, Stage};
use crate::progress::Progress;
use crate::queue::BoundedQueue;
use crate::reader::{Reader, ReaderReport, StageOutcome};
use crate::reorder::ReorderBuffer;
use crate::worker::WorkerPool;
use crate::writer::{Writer, WriterReport};

/// Counters from a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub blocks: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

/// Runs one pipeline over `source`, writing the transformed stream to `sink`.
///
/// One reader thread and one writer thread are spawned, and the worker pool
/// runs on its own thread pool while the calling thread waits. Returns after
/// every thread has exited. On error the contents written to `sink` so far
/// are undefined; discarding them is up to the caller.
///
/// `total` is the source size passed through to `progress`. The config is
/// validated first; an invalid one fails before any thread starts or any byte
/// is read.
pub fn run<R, W, C>(
    mode: Mode,
    source: R,
    sink: W,
    codec: &C,
    config: &PipelineConfig,
    total: u64,
    progress: &dyn Progress,
) -> Result<RunSummary>
where
    R: Read + Send,
    W: Write + Send,
    C: BlockCodec + ?Sized,
{
    config.validate(mode)?;

    let queue = BoundedQueue::new(config.queue_capacity);
    let reorder = ReorderBuffer::new(config.reorder_capacity);
    let coordinator = Coordinator::new(&queue, &reorder);

    info!(
        ?mode,
        workers = config.workers,
        block_size = config.block_size,
        queue_capacity = queue.capacity(),
        "starting pipeline"
    );

    let (reader_report, writer_report) = thread::scope(|s| {
        let coordinator = &coordinator;

        let reader = Reader::new(
            source,
            mode,
            config.block_size,
            config.max_frame_len,
            &queue,
            coordinator,
        );
        let reader_handle = thread::Builder::new()
            .name("pgz-reader".into())
            .spawn_scoped(s, move || coordinator.guard(Stage::Reader, || reader.run()));
        let reader_handle = match reader_handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                coordinator.report_fatal(Stage::Reader, err.into());
                None
            }
        };

        let writer = Writer::new(
            sink,
            &reorder,
            coordinator,
            progress,
            config.progress_interval,
            total,
        );
        let writer_handle = thread::Builder::new()
            .name("pgz-writer".into())
            .spawn_scoped(s, move || coordinator.guard(Stage::Writer, || writer.run()));
        let writer_handle = match writer_handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                coordinator.report_fatal(Stage::Writer, err.into());
                None
            }
        };

        WorkerPool::new(
            codec,
            mode,
            config.workers,
            config.max_frame_len,
            &queue,
            &reorder,
            coordinator,
        )
        .run();

        let reader_report: Option<ReaderReport> =
            reader_handle.and_then(|handle| handle.join().ok().flatten());
        let writer_report: Option<WriterReport> =
            writer_handle.and_then(|handle| handle.join().ok().flatten());
        (reader_report, writer_report)
    });

    debug!(
        reader = ?reader_report.map(|r| r.outcome),
        writer = ?writer_report.map(|r| r.outcome),
        "stages joined"
    );
    coordinator.into_result()?;

    // Without a fatal error both stages ran to the end of the stream.
    if let (Some(reader), Some(writer)) = (reader_report, writer_report) {
        debug_assert_eq!(reader.outcome, StageOutcome::Finished);
        debug_assert_eq!(writer.outcome, StageOutcome::Finished);
        debug_assert_eq!(reader.blocks, writer.blocks, "writer lost blocks");
    }

    let summary = RunSummary {
        blocks: writer_report.map_or(0, |r| r.blocks),
        input_bytes: reader_report.map_or(0, |r| r.bytes),
        output_bytes: writer_report.map_or(0, |r| r.written),
    };
    debug!(
        ?summary,
        processed = writer_report.map_or(0, |r| r.processed),
        "pipeline finished"
    );
    Ok(summary)
}
