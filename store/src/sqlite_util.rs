//! Filesystem preamble for opening the on-disk store.

use std::fs::OpenOptions;
use std::path::Path;

use rusqlite::Connection;

use crate::StoreError;

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Open a SQLite database at `path`, creating the parent directory and the
/// database file (owner-only on Unix) if they do not exist yet.
pub(crate) fn open_db(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    if !path.exists() {
        let mut options = OpenOptions::new();
        options.create(true).truncate(false).read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path).map_err(|e| io_error(path, e))?;
    }

    Ok(Connection::open(path)?)
}
