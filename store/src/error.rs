use std::path::PathBuf;

use lineage_types::{DatasetNameError, Hash, HashParseError, PathError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to prepare database at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("parent {0} is not in the store")]
    MissingParent(Hash),
    #[error("commit height {actual} does not match its parents (expected {expected})")]
    HeightMismatch { expected: u64, actual: u64 },
    #[error("stored object {hash} is corrupt: {reason}")]
    Corrupt { hash: Hash, reason: String },
}

/// Failure to parse an object spec such as `main.value` or `#<hash>.meta`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("empty object spec")]
    Empty,
    #[error("invalid dataset: {0}")]
    Dataset(#[from] DatasetNameError),
    #[error("invalid hash: {0}")]
    Hash(#[from] HashParseError),
    #[error("invalid path: {0}")]
    Path(#[from] PathError),
}
