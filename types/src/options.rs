//! Per-invocation rendering options.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use thiserror::Error;

use crate::ValuePath;

/// Time zone used when rendering commit dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneSetting {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized time zone {0:?} (expected \"local\", \"utc\", or an offset like \"+05:30\")")]
pub struct TimeZoneParseError(pub String);

impl TimeZoneSetting {
    /// Express a Unix timestamp in this zone, as a fixed-offset datetime.
    #[must_use]
    pub fn localize(self, unix_seconds: i64) -> Option<DateTime<FixedOffset>> {
        let utc = DateTime::<Utc>::from_timestamp(unix_seconds, 0)?;
        Some(match self {
            Self::Utc => utc.fixed_offset(),
            Self::Local => utc.with_timezone(&Local).fixed_offset(),
            Self::Fixed(offset) => offset.from_utc_datetime(&utc.naive_utc()),
        })
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl FromStr for TimeZoneSetting {
    type Err = TimeZoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "local" | "" => Ok(Self::Local),
            "utc" | "gmt" | "z" => Ok(Self::Utc),
            _ => parse_offset(trimmed)
                .map(Self::Fixed)
                .ok_or_else(|| TimeZoneParseError(s.to_string())),
        }
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Utc => f.write_str("utc"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Options for one `log` invocation. Fixed for the whole run; every render
/// task reads the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Sub-value of each commit to render.
    pub target_path: ValuePath,
    pub use_color: bool,
    pub time_zone: TimeZoneSetting,
    /// Cap on emitted nodes. `None` or non-positive means unbounded.
    pub max_nodes: Option<i64>,
    pub one_line_per_node: bool,
    pub show_ancestry_graph: bool,
    /// Verbose-mode cap on rendered value lines. 0 means unlimited.
    pub max_value_lines: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target_path: ValuePath::commit_value(),
            use_color: false,
            time_zone: TimeZoneSetting::Local,
            max_nodes: None,
            one_line_per_node: true,
            show_ancestry_graph: true,
            max_value_lines: 0,
        }
    }
}

impl RenderOptions {
    /// The node cap with unset and non-positive values mapped to "unbounded".
    #[must_use]
    pub fn effective_max_nodes(&self) -> u64 {
        match self.max_nodes {
            Some(n) if n > 0 => n as u64,
            _ => u64::MAX,
        }
    }

    /// Multi-line layout without the graph column.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.one_line_per_node = false;
        self.show_ancestry_graph = false;
        self
    }
}
