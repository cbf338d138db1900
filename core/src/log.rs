//! `log` over a stored dataset.

use std::io::Write;

use lineage_store::Database;
use lineage_types::{DatasetName, RenderOptions};

use crate::errors::LogError;
use crate::pipeline::{LogPipeline, LogSummary};
use crate::source::CommitIterator;

/// Render the history of `dataset` as seen by the current snapshot.
///
/// The head is resolved before anything is written; an empty dataset or a
/// head missing from the store fails without touching `sink`.
pub async fn log_dataset<W>(
    db: &Database,
    dataset: &DatasetName,
    pipeline: &LogPipeline,
    options: RenderOptions,
    sink: W,
) -> Result<LogSummary, LogError>
where
    W: Write + Send + 'static,
{
    let head = db
        .head(dataset)
        .ok_or_else(|| LogError::NoHead(dataset.clone()))?;
    let mut source = CommitIterator::new(db, head)?;
    tracing::info!(%dataset, head = %head.short(), "Rendering dataset history");
    pipeline.run(&mut source, sink, options).await
}
