//! Content-addressed commit storage with named dataset heads.
//!
//! Commits are immutable and keyed by their hash; datasets are the only
//! mutable state. Readers see dataset heads through a snapshot taken at open
//! time. [`Database::rebase`] refreshes the snapshot so heads moved by other
//! processes become visible.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde_json::Value;

use lineage_types::{Commit, CommitMeta, DatasetName, Hash};

use crate::StoreError;
use crate::sqlite_util::open_db;

pub struct Database {
    db: Connection,
    heads: BTreeMap<DatasetName, Hash>,
}

/// Default on-disk location: `~/.lineage/lineage.db`.
#[must_use]
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lineage").join("lineage.db"))
}

fn parse_hash_column(raw: &str) -> Result<Hash, StoreError> {
    raw.parse().map_err(|e| StoreError::Corrupt {
        hash: Hash::of(raw.as_bytes()),
        reason: format!("bad hash column {raw:?}: {e}"),
    })
}

impl Database {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS commits (
            hash TEXT PRIMARY KEY,
            height INTEGER NOT NULL,
            body BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS datasets (
            name TEXT PRIMARY KEY,
            head TEXT NOT NULL REFERENCES commits(hash)
        );
    ";

    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = open_db(path)?;
        tracing::debug!(path = %path.display(), "Opened commit store");
        Self::initialize(db)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(db: Connection) -> Result<Self, StoreError> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        db.execute_batch(Self::SCHEMA)?;
        let mut store = Self {
            db,
            heads: BTreeMap::new(),
        };
        store.rebase()?;
        Ok(store)
    }

    /// Reload the dataset-head snapshot from storage.
    pub fn rebase(&mut self) -> Result<(), StoreError> {
        self.heads = self.read_heads()?;
        tracing::trace!(datasets = self.heads.len(), "Rebased dataset snapshot");
        Ok(())
    }

    fn read_heads(&self) -> Result<BTreeMap<DatasetName, Hash>, StoreError> {
        let mut stmt = self.db.prepare("SELECT name, head FROM datasets")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut heads = BTreeMap::new();
        for row in rows {
            let (name, head) = row?;
            let Ok(name) = DatasetName::new(name.clone()) else {
                tracing::warn!("Skipping dataset with invalid name {name:?}");
                continue;
            };
            heads.insert(name, parse_hash_column(&head)?);
        }
        Ok(heads)
    }

    /// Datasets in the current snapshot, sorted by name.
    pub fn datasets(&self) -> impl Iterator<Item = (&DatasetName, &Hash)> {
        self.heads.iter()
    }

    /// Head commit of `dataset` in the current snapshot.
    #[must_use]
    pub fn head(&self, dataset: &DatasetName) -> Option<Hash> {
        self.heads.get(dataset).copied()
    }

    /// Fetch a commit by hash, verifying that its body still hashes to the key.
    pub fn get_commit(&self, hash: &Hash) -> Result<Option<Commit>, StoreError> {
        let body: Option<Vec<u8>> = self
            .db
            .query_row(
                "SELECT body FROM commits WHERE hash = ?1",
                params![hash.to_hex()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            return Ok(None);
        };

        let commit: Commit = serde_json::from_slice(&body).map_err(|e| StoreError::Corrupt {
            hash: *hash,
            reason: e.to_string(),
        })?;
        if commit.hash() != *hash {
            return Err(StoreError::Corrupt {
                hash: *hash,
                reason: "content does not match its address".to_string(),
            });
        }
        Ok(Some(commit))
    }

    /// Store a commit. Every parent must already be stored and the commit's
    /// height must be one more than its tallest parent. Idempotent.
    pub fn put_commit(&mut self, commit: &Commit) -> Result<Hash, StoreError> {
        insert_commit(&self.db, commit)
    }

    /// Commit `value` on top of the dataset's current head and advance the head.
    pub fn commit_value(
        &mut self,
        dataset: &DatasetName,
        value: Value,
        meta: CommitMeta,
    ) -> Result<Hash, StoreError> {
        self.merge_commit(dataset, value, meta, &[])
    }

    /// Like [`Database::commit_value`], with `extra_parents` merged in.
    ///
    /// Reading the head, storing the commit, and moving the head happen in one
    /// write transaction, so concurrent writers cannot drop each other's
    /// commits.
    pub fn merge_commit(
        &mut self,
        dataset: &DatasetName,
        value: Value,
        meta: CommitMeta,
        extra_parents: &[Hash],
    ) -> Result<Hash, StoreError> {
        let tx = self
            .db
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Read the head from storage, not the snapshot, so a stale snapshot
        // cannot drop commits written by another process.
        let current: Option<String> = tx
            .query_row(
                "SELECT head FROM datasets WHERE name = ?1",
                params![dataset.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let mut parents = extra_parents.to_vec();
        if let Some(head) = current {
            parents.push(parse_hash_column(&head)?);
        }
        let height = height_for(&tx, &parents)?;
        let commit = Commit::new(parents, value, meta, height);
        let hash = insert_commit(&tx, &commit)?;

        tx.execute(
            "INSERT INTO datasets (name, head) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET head = excluded.head",
            params![dataset.as_str(), hash.to_hex()],
        )?;
        tx.commit()?;
        self.heads.insert(dataset.clone(), hash);

        tracing::debug!(dataset = %dataset, commit = %hash.short(), "Advanced dataset head");
        Ok(hash)
    }
}

fn height_of(db: &Connection, hash: &Hash) -> Result<Option<u64>, StoreError> {
    let height: Option<i64> = db
        .query_row(
            "SELECT height FROM commits WHERE hash = ?1",
            params![hash.to_hex()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(height.map(|h| h as u64))
}

/// Expected height for a commit with these parents.
fn height_for(db: &Connection, parents: &[Hash]) -> Result<u64, StoreError> {
    let mut tallest = 0;
    for parent in parents {
        let height = height_of(db, parent)?.ok_or(StoreError::MissingParent(*parent))?;
        tallest = tallest.max(height);
    }
    Ok(tallest + 1)
}

fn insert_commit(db: &Connection, commit: &Commit) -> Result<Hash, StoreError> {
    let expected = height_for(db, commit.parents())?;
    if commit.height() != expected {
        return Err(StoreError::HeightMismatch {
            expected,
            actual: commit.height(),
        });
    }

    let hash = commit.hash();
    db.execute(
        "INSERT OR IGNORE INTO commits (hash, height, body) VALUES (?1, ?2, ?3)",
        params![hash.to_hex(), commit.height() as i64, commit.encode()],
    )?;
    Ok(hash)
}
