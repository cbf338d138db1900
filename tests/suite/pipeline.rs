//! Pipeline properties over synthetic sources, renderers, and sinks.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;

use lineage_core::{
    GraphRow, HistoryNode, HistorySource, LogPipeline, RenderError, Renderer, SourceError,
};
use lineage_types::{Commit, CommitMeta, RenderOptions};

use crate::common::SharedBuffer;

struct Numbers {
    queue: VecDeque<HistoryNode>,
    pulled: Arc<AtomicUsize>,
}

impl Numbers {
    fn new(n: u64) -> (Self, Arc<AtomicUsize>) {
        let pulled = Arc::new(AtomicUsize::new(0));
        let queue = (0..n)
            .map(|i| {
                let commit = Commit::root(json!(i), CommitMeta::default());
                HistoryNode::new(commit.hash(), commit, GraphRow::default())
            })
            .collect();
        (
            Self {
                queue,
                pulled: Arc::clone(&pulled),
            },
            pulled,
        )
    }
}

impl HistorySource for Numbers {
    fn next_node(&mut self) -> Result<Option<HistoryNode>, SourceError> {
        let node = self.queue.pop_front();
        if node.is_some() {
            self.pulled.fetch_add(1, Ordering::SeqCst);
        }
        Ok(node)
    }
}

/// Sleeps a pseudo-random time per node and tracks how many renders overlap.
struct Jittery {
    seed: u64,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Jittery {
    fn new(seed: u64) -> Self {
        Self {
            seed,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn delay(&self, i: u64) -> Duration {
        let mixed = (i ^ self.seed)
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        Duration::from_micros((mixed >> 33) % 4_000)
    }
}

impl Renderer for Jittery {
    fn render(&self, node: &HistoryNode, _: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let i = node.commit().value().as_u64().unwrap_or_default();
        std::thread::sleep(self.delay(i));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("node {i}\n").into_bytes())
    }
}

fn expected(n: u64) -> String {
    (0..n).map(|i| format!("node {i}\n")).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn order_and_bound_hold_across_parallelism_levels() {
    for k in [1usize, 2, 3, 8] {
        for (n, seed) in [(0u64, 1u64), (1, 2), (25, 3), (60, 4)] {
            let renderer = Arc::new(Jittery::new(seed));
            let pipeline = LogPipeline::new(
                Arc::clone(&renderer) as Arc<dyn Renderer>,
                NonZeroUsize::new(k).unwrap(),
            );
            let (mut source, pulled) = Numbers::new(n);
            let sink = SharedBuffer::default();

            let summary = pipeline
                .run(&mut source, sink.clone(), RenderOptions::default())
                .await
                .unwrap();

            assert_eq!(sink.text(), expected(n), "k={k} n={n}");
            assert_eq!(summary.written, n);
            assert_eq!(pulled.load(Ordering::SeqCst) as u64, n);
            assert!(renderer.peak.load(Ordering::SeqCst) <= k, "k={k} n={n}");
        }
    }
}

#[derive(Default)]
struct Closing {
    accepted: Vec<u8>,
    calls: usize,
}

/// Accepts `budget` writes, then reports a closed pipe. Clones share state.
#[derive(Clone)]
struct ClosingSink {
    budget: usize,
    state: Arc<Mutex<Closing>>,
}

impl ClosingSink {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            state: Arc::default(),
        }
    }
}

impl Write for ClosingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.calls > self.budget {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        state.accepted.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn closed_sink_stops_a_long_history_promptly() {
    let renderer = Arc::new(Jittery::new(9));
    let pipeline = LogPipeline::new(renderer, NonZeroUsize::new(4).unwrap());
    let (mut source, pulled) = Numbers::new(10_000);
    let sink = ClosingSink::new(5);

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline.run(&mut source, sink.clone(), RenderOptions::default()),
    )
    .await
    .expect("pipeline must unwind after the sink closes");

    assert!(result.unwrap_err().is_broken_pipe());
    let state = sink.state.lock().unwrap();
    assert_eq!(String::from_utf8(state.accepted.clone()).unwrap(), expected(5));
    assert_eq!(state.calls, 6);
    assert!(pulled.load(Ordering::SeqCst) < 100);
}
