//! The blocking half of the drain loop.
//!
//! Sink writes (and dropping the sink, which for a pager waits on the child
//! process) happen on the blocking pool. The drain loop only hands finished
//! outputs over a bounded channel, so it never sits in a write syscall and
//! whoever polls the run (e.g. a Ctrl-C handler) keeps running while the
//! sink is stuck.

use std::io::{self, Write};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cancel::CancellationSignal;

/// One node's output on its way to the sink.
pub(crate) struct Chunk {
    pub bytes: Vec<u8>,
    /// The bytes are an error marker rather than a rendering.
    pub failed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct WriteReport {
    pub written: u64,
    pub failed: u64,
    pub discarded: u64,
    pub error: Option<io::Error>,
}

pub(crate) struct SinkWriter {
    tx: mpsc::Sender<Chunk>,
    task: JoinHandle<WriteReport>,
}

impl SinkWriter {
    /// Move `sink` onto the blocking pool. At most `capacity` chunks wait
    /// between the drain loop and the sink.
    pub(crate) fn spawn<W>(mut sink: W, capacity: usize, cancel: CancellationSignal) -> Self
    where
        W: Write + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Chunk>(capacity.max(1));
        let task = tokio::task::spawn_blocking(move || {
            let mut report = WriteReport::default();

            while let Some(chunk) = rx.blocking_recv() {
                if cancel.is_raised() {
                    report.discarded += 1;
                    continue;
                }
                match sink.write_all(&chunk.bytes) {
                    Ok(()) => {
                        report.written += 1;
                        report.failed += u64::from(chunk.failed);
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "Sink write failed; draining");
                        cancel.raise();
                        report.discarded += 1;
                        report.error = Some(err);
                    }
                }
            }

            if report.error.is_none()
                && let Err(err) = sink.flush()
            {
                report.error = Some(err);
            }
            drop(sink);
            report
        });
        Self { tx, task }
    }

    /// Queue `chunk`, waiting while the channel is full. `false` once the
    /// writer has gone away.
    pub(crate) async fn send(&self, chunk: Chunk) -> bool {
        self.tx.send(chunk).await.is_ok()
    }

    /// Close the channel and wait for the writer to flush and release the sink.
    pub(crate) async fn finish(self) -> WriteReport {
        drop(self.tx);
        match self.task.await {
            Ok(report) => report,
            Err(err) => WriteReport {
                error: Some(io::Error::other(format!("sink writer stopped: {err}"))),
                ..WriteReport::default()
            },
        }
    }
}
