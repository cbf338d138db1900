//! Invocation-level failures of a `log` run.
//!
//! Only traversal and sink problems end up here. A node that fails to render
//! is reported inline in the output stream instead.

use std::io;

use thiserror::Error;

use lineage_types::DatasetName;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("dataset {0} has no commits")]
    NoHead(DatasetName),
    #[error("failed to read history: {0}")]
    Source(#[from] SourceError),
    #[error("failed to write output: {0}")]
    Sink(#[source] io::Error),
}

impl LogError {
    /// True when the output side went away, e.g. the user quit the pager.
    #[must_use]
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Sink(err) if err.kind() == io::ErrorKind::BrokenPipe)
    }
}
