//! Persistent commit storage for Lineage.

mod database;
mod error;
mod spec;
mod sqlite_util;

pub use database::{Database, default_db_path};
pub use error::{SpecError, StoreError};
pub use spec::{ObjectSpec, SpecRoot};
