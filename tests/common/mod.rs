//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tempfile::TempDir;

use lineage_store::Database;
use lineage_types::{CommitMeta, DatasetName, Hash};

/// A scratch home directory holding one database file.
pub struct Fixture {
    home: TempDir,
    db_path: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let home = tempfile::tempdir().expect("create temp home");
        let db_path = home.path().join("data").join("lineage.db");
        Self { home, db_path }
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn open(&self) -> Database {
        Database::open(&self.db_path).expect("open fixture database")
    }

    /// Commit `value` to `dataset` with a message and fixed date.
    pub fn commit(&self, dataset: &str, value: Value, message: &str) -> Hash {
        let mut db = self.open();
        db.commit_value(&dataset_name(dataset), value, meta(message))
            .expect("commit")
    }

    /// `lineage` with this fixture's database, an isolated home, and
    /// deterministic output settings.
    pub fn lineage(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_lineage"));
        cmd.env("HOME", self.home.path())
            .env_remove("LINEAGE_DB")
            .env_remove("LINEAGE_PAGER")
            .env("NO_COLOR", "1")
            .arg("--db")
            .arg(&self.db_path)
            .args(["--no-pager", "--no-color", "--tz", "utc"]);
        cmd
    }

    /// Run the interactive shell with `script` on stdin.
    pub fn shell(&self, script: &str) -> Output {
        let mut child = self
            .lineage()
            .arg("shell")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn lineage shell");
        child
            .stdin
            .take()
            .expect("stdin")
            .write_all(script.as_bytes())
            .expect("write script");
        child.wait_with_output().expect("wait for shell")
    }
}

pub fn dataset_name(raw: &str) -> DatasetName {
    DatasetName::new(raw).expect("valid dataset name")
}

pub fn meta(message: &str) -> CommitMeta {
    CommitMeta {
        date: Some(1_700_000_000),
        message: Some(message.to_string()),
    }
}

pub fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "lineage failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("utf-8 stdout")
}

/// Owned sink whose clones share one buffer, for handing to the pipeline.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("buffer lock").clone()).expect("utf-8 output")
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().expect("buffer lock").is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
