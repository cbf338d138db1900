//! Commits: the immutable vertices of a dataset's history graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Hash;

/// Descriptive metadata attached to a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Commit time as Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One vertex of the history graph.
///
/// A commit is addressed by the hash of its canonical JSON encoding, so two
/// commits with identical parents, value, and metadata are the same commit.
/// Construction goes through [`Commit::new`], which keeps `parents` sorted and
/// free of duplicates so the encoding is canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    parents: Vec<Hash>,
    value: Value,
    #[serde(default)]
    meta: CommitMeta,
    height: u64,
}

impl Commit {
    /// Build a commit. `height` is 1 for roots, otherwise one more than the
    /// tallest parent; the store checks this on insert.
    #[must_use]
    pub fn new(mut parents: Vec<Hash>, value: Value, meta: CommitMeta, height: u64) -> Self {
        parents.sort_unstable();
        parents.dedup();
        Self {
            parents,
            value,
            meta,
            height,
        }
    }

    /// A commit with no parents.
    #[must_use]
    pub fn root(value: Value, meta: CommitMeta) -> Self {
        Self::new(Vec::new(), value, meta, 1)
    }

    #[must_use]
    pub fn parents(&self) -> &[Hash] {
        &self.parents
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn meta(&self) -> &CommitMeta {
        &self.meta
    }

    #[must_use]
    pub fn height(&self) -> u64 {
        self.height
    }

    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Canonical byte encoding; the input to [`Commit::hash`].
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        // Struct fields serialize in declaration order and `Value` objects are
        // BTreeMap-backed, so the output is deterministic.
        serde_json::to_vec(self).unwrap_or_default()
    }

    #[must_use]
    pub fn hash(&self) -> Hash {
        Hash::of(&self.encode())
    }

    /// The commit as a JSON object, for resolving value paths such as
    /// `.value` or `.meta.message`.
    #[must_use]
    pub fn as_document(&self) -> Value {
        serde_json::json!({
            "value": self.value,
            "meta": self.meta,
            "parents": self.parents,
            "height": self.height,
        })
    }
}
