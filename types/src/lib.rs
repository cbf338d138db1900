//! Core domain types for Lineage.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

#![allow(clippy::missing_errors_doc)]

mod commit;
mod dataset;
mod hash;
mod options;
mod path;
mod sanitize;

pub use commit::{Commit, CommitMeta};
pub use dataset::{DatasetName, DatasetNameError};
pub use hash::{Hash, HashParseError};
pub use options::{RenderOptions, TimeZoneParseError, TimeZoneSetting};
pub use path::{PathError, PathSegment, ValuePath};
pub use sanitize::sanitize_terminal_text;

/// Version of the on-disk commit encoding.
pub const FORMAT_VERSION: &str = "1";

/// Shorten `text` to at most `max_chars` characters, appending `...` when cut.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}
