//! Ordered, bounded-parallel rendering of a history traversal.
//!
//! ```text
//! HistorySource -> producer --push--> OrderingQueue --pop--> drain --chunk--> sink writer -> sink
//!                     |                    ^                                 (blocking pool)
//!                     +-- render task -----+ (fills its slot)
//! ```
//!
//! The producer and the drain loop run concurrently on the calling task.
//! Render tasks run on the blocking pool, at most `parallelism` of them at a
//! time, because a task is launched only after its slot was admitted to the
//! queue. The drain loop waits on slots in push order, so output follows
//! traversal order whatever order renders finish in. Writes to the sink
//! happen on a dedicated blocking task fed in that same order.
//!
//! A failed sink write raises the run's [`CancellationSignal`]: the producer
//! admits nothing further, and the drain loop keeps consuming (without
//! writing) until the queue is closed and empty.

use std::io::Write;
use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use lineage_types::RenderOptions;

use crate::cancel::CancellationSignal;
use crate::errors::LogError;
use crate::queue::{OrderedSlots, OrderingQueue, SlotWriter, ordering_queue};
use crate::render::{RenderError, RenderResult, Renderer};
use crate::sink::{Chunk, SinkWriter};
use crate::source::{HistoryNode, HistorySource, SourceError};

/// Render tasks in flight when nothing else is configured.
pub const DEFAULT_PARALLELISM: NonZeroUsize = NonZeroUsize::new(16).unwrap();

/// Counters for one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSummary {
    /// Nodes whose output (rendering or error marker) reached the sink.
    pub written: u64,
    /// Written nodes that carried an error marker.
    pub failed: u64,
    /// Nodes rendered after cancellation and dropped.
    pub discarded: u64,
}

/// A reusable `log` pipeline: renderer, concurrency bound, and the
/// cancellation signal shared with whoever may stop the run.
#[derive(Clone)]
pub struct LogPipeline {
    renderer: Arc<dyn Renderer>,
    parallelism: NonZeroUsize,
    cancel: CancellationSignal,
}

impl LogPipeline {
    pub fn new(renderer: Arc<dyn Renderer>, parallelism: NonZeroUsize) -> Self {
        Self {
            renderer,
            parallelism,
            cancel: CancellationSignal::new(),
        }
    }

    /// Share an externally owned signal (e.g. one raised on Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationSignal) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancel
    }

    /// Render every node `source` yields (up to `options.max_nodes`) into
    /// `sink`, in source order. The sink is written, flushed, and dropped
    /// off the async runtime.
    ///
    /// Resolves once all admitted nodes have been written or discarded and
    /// the sink has been released. The error is the traversal error that
    /// stopped production, else the first sink error.
    pub async fn run<S, W>(
        &self,
        source: &mut S,
        sink: W,
        options: RenderOptions,
    ) -> Result<LogSummary, LogError>
    where
        S: HistorySource + ?Sized,
        W: Write + Send + 'static,
    {
        let options = Arc::new(options);
        let (queue, slots) = ordering_queue(self.parallelism);
        let writer = SinkWriter::spawn(sink, self.parallelism.get(), self.cancel.clone());
        tracing::debug!(
            parallelism = self.parallelism.get(),
            max_nodes = ?options.max_nodes,
            "Starting log pipeline"
        );

        let (produced, dropped) = tokio::join!(
            self.produce(source, queue, &options),
            drain(slots, &writer, &self.cancel),
        );
        let report = writer.finish().await;

        let summary = LogSummary {
            written: report.written,
            failed: report.failed,
            discarded: report.discarded + dropped,
        };
        tracing::debug!(
            written = summary.written,
            failed = summary.failed,
            discarded = summary.discarded,
            "Log pipeline done"
        );

        produced?;
        match report.error {
            Some(err) => Err(LogError::Sink(err)),
            None => Ok(summary),
        }
    }

    async fn produce<S>(
        &self,
        source: &mut S,
        queue: OrderingQueue<RenderResult>,
        options: &Arc<RenderOptions>,
    ) -> Result<u64, SourceError>
    where
        S: HistorySource + ?Sized,
    {
        let limit = options.effective_max_nodes();
        let mut admitted = 0u64;
        let mut outcome = Ok(());

        while admitted < limit && !self.cancel.is_raised() {
            let node = match source.next_node() {
                Ok(Some(node)) => node,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "History traversal failed");
                    outcome = Err(err);
                    break;
                }
            };
            let Some(writer) = queue.push().await else {
                break;
            };
            // The signal may have been raised while `push` waited for room.
            if self.cancel.is_raised() {
                drop(writer);
                break;
            }
            admitted += 1;
            launch_render_task(Arc::clone(&self.renderer), node, Arc::clone(options), writer);
        }

        if self.cancel.is_raised() {
            tracing::debug!(admitted, "Producer stopped by cancellation");
        }
        queue.close();
        outcome.map(|()| admitted)
    }
}

/// Render with [`DEFAULT_PARALLELISM`] and a private cancellation signal.
pub async fn render_history<S, W>(
    source: &mut S,
    renderer: Arc<dyn Renderer>,
    sink: W,
    options: RenderOptions,
) -> Result<LogSummary, LogError>
where
    S: HistorySource + ?Sized,
    W: Write + Send + 'static,
{
    LogPipeline::new(renderer, DEFAULT_PARALLELISM)
        .run(source, sink, options)
        .await
}

fn launch_render_task(
    renderer: Arc<dyn Renderer>,
    node: HistoryNode,
    options: Arc<RenderOptions>,
    writer: SlotWriter<RenderResult>,
) {
    tokio::task::spawn_blocking(move || {
        let hash = node.hash();
        let rendered = catch_unwind(AssertUnwindSafe(|| renderer.render(&node, &options)))
            .unwrap_or(Err(RenderError::Panicked));
        let result = match rendered {
            Ok(bytes) => RenderResult::Rendered(bytes),
            Err(error) => {
                tracing::warn!(commit = %hash.short(), %error, "Render failed");
                RenderResult::Failed { hash, error }
            }
        };
        writer.complete(result);
    });
}

/// Hand slots to the sink writer in push order. Returns how many were
/// dropped here because the run was already cancelled.
async fn drain(
    mut slots: OrderedSlots<RenderResult>,
    writer: &SinkWriter,
    cancel: &CancellationSignal,
) -> u64 {
    let mut dropped = 0;

    while let Some(slot) = slots.pop().await {
        let result = slot.wait().await.unwrap_or(RenderResult::Lost);
        if cancel.is_raised() {
            dropped += 1;
            continue;
        }

        let chunk = Chunk {
            failed: result.is_failed(),
            bytes: result.into_output(),
        };
        if !writer.send(chunk).await {
            cancel.raise();
            dropped += 1;
        }
    }
    dropped
}
