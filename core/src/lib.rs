//! History rendering for Lineage.
//!
//! The centre of this crate is [`LogPipeline`]: it pulls nodes from a
//! [`HistorySource`], renders them concurrently with a [`Renderer`], and
//! writes the results to a sink in traversal order.

mod cancel;
pub mod errors;
mod log;
mod pager;
mod pipeline;
mod queue;
mod render;
mod sink;
mod source;

pub use cancel::CancellationSignal;
pub use errors::LogError;
pub use log::log_dataset;
pub use pager::{Pager, PagerSettings};
pub use pipeline::{DEFAULT_PARALLELISM, LogPipeline, LogSummary, render_history};
pub use queue::{OrderedSlots, OrderingQueue, OrderingSlot, SlotWriter, ordering_queue};
pub use render::{CommitRenderer, RenderError, RenderResult, Renderer};
pub use source::{CommitIterator, GraphRow, HistoryNode, HistorySource, SourceError};
