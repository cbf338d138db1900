//! History sources: ordered producers of commits for the log pipeline.

use std::collections::{BinaryHeap, HashMap, HashSet};

use thiserror::Error;

use lineage_store::{Database, StoreError};
use lineage_types::{Commit, Hash};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("commit {0} is not in the store")]
    MissingCommit(Hash),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Position of a node in the ancestry graph.
///
/// `lanes_before` columns are drawn on the node's own row, with the node in
/// `column`; rows printed below it (verbose output) use `lanes_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphRow {
    pub column: usize,
    pub lanes_before: usize,
    pub lanes_after: usize,
}

/// One commit as surfaced by a [`HistorySource`].
#[derive(Debug, Clone)]
pub struct HistoryNode {
    hash: Hash,
    commit: Commit,
    graph: GraphRow,
}

impl HistoryNode {
    #[must_use]
    pub fn new(hash: Hash, commit: Commit, graph: GraphRow) -> Self {
        Self {
            hash,
            commit,
            graph,
        }
    }

    #[must_use]
    pub fn hash(&self) -> Hash {
        self.hash
    }

    #[must_use]
    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    #[must_use]
    pub fn graph(&self) -> GraphRow {
        self.graph
    }
}

/// Ordered, lazy sequence of history nodes.
///
/// Called by the pipeline's producer only, one call at a time. `Ok(None)`
/// means the history is exhausted.
pub trait HistorySource {
    fn next_node(&mut self) -> Result<Option<HistoryNode>, SourceError>;
}

/// Walks a commit graph from a head, tallest commits first.
///
/// Every reachable commit is yielded exactly once. Among commits of equal
/// height the larger hash goes first, which keeps the order deterministic.
pub struct CommitIterator<'a> {
    db: &'a Database,
    frontier: BinaryHeap<(u64, Hash)>,
    fetched: HashMap<Hash, Commit>,
    seen: HashSet<Hash>,
    lanes: Vec<Hash>,
}

impl<'a> CommitIterator<'a> {
    /// Start at `head`. Fails if `head` is not a stored commit.
    pub fn new(db: &'a Database, head: Hash) -> Result<Self, SourceError> {
        let commit = db
            .get_commit(&head)?
            .ok_or(SourceError::MissingCommit(head))?;

        let mut iter = Self {
            db,
            frontier: BinaryHeap::new(),
            fetched: HashMap::new(),
            seen: HashSet::new(),
            lanes: Vec::new(),
        };
        iter.enqueue(head, commit);
        Ok(iter)
    }

    fn enqueue(&mut self, hash: Hash, commit: Commit) {
        if self.seen.insert(hash) {
            self.frontier.push((commit.height(), hash));
            self.fetched.insert(hash, commit);
        }
    }

    /// Place `hash` in the lane layout and advance the lanes past it.
    fn layout(&mut self, hash: Hash, parents: &[Hash]) -> GraphRow {
        let column = match self.lanes.iter().position(|lane| *lane == hash) {
            Some(column) => column,
            None => {
                self.lanes.push(hash);
                self.lanes.len() - 1
            }
        };
        let lanes_before = self.lanes.len();

        match parents.split_first() {
            None => {
                self.lanes.remove(column);
            }
            Some((first, rest)) => {
                self.lanes[column] = *first;
                for parent in rest {
                    if !self.lanes.contains(parent) {
                        self.lanes.push(*parent);
                    }
                }
            }
        }

        // Lanes converging on the same commit collapse into the leftmost one.
        let mut unique = HashSet::new();
        self.lanes.retain(|lane| unique.insert(*lane));

        GraphRow {
            column,
            lanes_before,
            lanes_after: self.lanes.len(),
        }
    }
}

impl HistorySource for CommitIterator<'_> {
    fn next_node(&mut self) -> Result<Option<HistoryNode>, SourceError> {
        let Some((_, hash)) = self.frontier.pop() else {
            return Ok(None);
        };
        let commit = self
            .fetched
            .remove(&hash)
            .ok_or(SourceError::MissingCommit(hash))?;

        for parent in commit.parents() {
            if self.seen.contains(parent) {
                continue;
            }
            let parent_commit = self
                .db
                .get_commit(parent)?
                .ok_or(SourceError::MissingCommit(*parent))?;
            self.enqueue(*parent, parent_commit);
        }

        let graph = self.layout(hash, commit.parents());
        tracing::trace!(commit = %hash.short(), column = graph.column, "Visited commit");
        Ok(Some(HistoryNode::new(hash, commit, graph)))
    }
}
