//! Per-commit formatting.
//!
//! The pipeline only knows the [`Renderer`] trait; [`CommitRenderer`] is the
//! stock implementation behind `log`.

use std::fmt::Write;

use crossterm::style::{Color, Stylize};
use serde_json::Value;
use thiserror::Error;

use lineage_types::{Hash, RenderOptions, sanitize_terminal_text, truncate_with_ellipsis};

use crate::source::{GraphRow, HistoryNode};

/// Longest one-line summary before truncation.
const SUMMARY_MAX_CHARS: usize = 100;

const LANE_COLORS: [Color; 6] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("path {path} not found in commit")]
    PathNotFound { path: String },
    #[error("{0}")]
    Format(String),
    #[error("renderer panicked")]
    Panicked,
}

/// Formats one node into bytes.
///
/// Invoked concurrently for different nodes, so implementations must not
/// share mutable state between calls.
pub trait Renderer: Send + Sync + 'static {
    fn render(&self, node: &HistoryNode, options: &RenderOptions) -> Result<Vec<u8>, RenderError>;
}

/// Outcome of one render task, as carried by its ordering slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    Rendered(Vec<u8>),
    Failed { hash: Hash, error: RenderError },
    /// The task ended without filling its slot.
    Lost,
}

impl RenderResult {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        !matches!(self, Self::Rendered(_))
    }

    /// Bytes to emit for this node. Failures become an inline error line.
    #[must_use]
    pub fn into_output(self) -> Vec<u8> {
        match self {
            Self::Rendered(bytes) => bytes,
            Self::Failed { hash, error } => {
                format!("error: failed to render {}: {error}\n", hash.short()).into_bytes()
            }
            Self::Lost => b"error: render task stopped before completing\n".to_vec(),
        }
    }
}

fn paint(text: &str, color: Color, enabled: bool) -> String {
    if enabled {
        text.with(color).to_string()
    } else {
        text.to_string()
    }
}

fn bold(text: &str, enabled: bool) -> String {
    if enabled {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

fn lane(index: usize, glyph: &str, color: bool) -> String {
    paint(glyph, LANE_COLORS[index % LANE_COLORS.len()], color)
}

/// Graph prefix for the node's own row: `*` in its column, `|` elsewhere.
fn node_prefix(row: GraphRow, color: bool) -> String {
    let mut out = String::new();
    for i in 0..row.lanes_before.max(row.column + 1) {
        if i == row.column {
            out.push('*');
        } else {
            out.push_str(&lane(i, "|", color));
        }
        out.push(' ');
    }
    out
}

/// Graph prefix for rows printed below the node.
fn continuation_prefix(row: GraphRow, color: bool) -> String {
    let mut out = String::new();
    for i in 0..row.lanes_after {
        out.push_str(&lane(i, "|", color));
        out.push(' ');
    }
    out
}

fn relative_age(seconds: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };

    match seconds {
        s if s < 0 => "in the future".to_string(),
        s if s < MINUTE => "just now".to_string(),
        s if s < HOUR => plural(s / MINUTE, "minute"),
        s if s < DAY => plural(s / HOUR, "hour"),
        s if s < MONTH => plural(s / DAY, "day"),
        s if s < YEAR => plural(s / MONTH, "month"),
        s => plural(s / YEAR, "year"),
    }
}

/// Stock commit formatter: one line per commit, or a multi-line block with
/// header, message, and the value at the target path.
#[derive(Debug, Clone)]
pub struct CommitRenderer {
    /// Reference time (Unix seconds) for relative dates.
    now: i64,
}

impl Default for CommitRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: chrono::Utc::now().timestamp(),
        }
    }

    /// Use a fixed reference time for relative dates.
    #[must_use]
    pub fn with_now(now: i64) -> Self {
        Self { now }
    }

    fn render_one_line(node: &HistoryNode, target: &Value, options: &RenderOptions) -> String {
        let color = options.use_color;
        let commit = node.commit();

        let summary = commit
            .meta()
            .message
            .as_deref()
            .and_then(|m| m.lines().find(|line| !line.trim().is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| serde_json::to_string(target).unwrap_or_default());
        let summary = sanitize_terminal_text(&summary).replace(['\t', '\r'], " ");

        let mut out = String::new();
        if options.show_ancestry_graph {
            out.push_str(&node_prefix(node.graph(), color));
        }
        out.push_str(&paint(&node.hash().short(), Color::Yellow, color));
        if commit.is_merge() {
            out.push_str(&paint(" (merge)", Color::DarkGrey, color));
        }
        out.push(' ');
        out.push_str(&truncate_with_ellipsis(summary.trim(), SUMMARY_MAX_CHARS));
        out.push('\n');
        out
    }

    fn render_verbose(&self, node: &HistoryNode, target: &Value, options: &RenderOptions) -> String {
        let color = options.use_color;
        let commit = node.commit();
        let (first, rest) = if options.show_ancestry_graph {
            (
                node_prefix(node.graph(), color),
                continuation_prefix(node.graph(), color),
            )
        } else {
            (String::new(), String::new())
        };

        let mut out = String::new();
        let header = format!("commit {}", node.hash());
        let _ = writeln!(out, "{first}{}", paint(&header, Color::Yellow, color));

        if commit.is_merge() {
            let parents: Vec<String> = commit.parents().iter().map(Hash::short).collect();
            let _ = writeln!(out, "{rest}{} {}", bold("Merge:", color), parents.join(" "));
        }

        if let Some(date) = commit.meta().date {
            match options.time_zone.localize(date) {
                Some(local) => {
                    let _ = writeln!(
                        out,
                        "{rest}{}   {} ({})",
                        bold("Date:", color),
                        local.format("%Y-%m-%d %H:%M:%S %z"),
                        relative_age(self.now - date)
                    );
                }
                None => {
                    let _ = writeln!(out, "{rest}{}   <invalid: {date}>", bold("Date:", color));
                }
            }
        }

        if let Some(message) = commit.meta().message.as_deref()
            && !message.trim().is_empty()
        {
            let _ = writeln!(out, "{}", rest.trim_end());
            for line in sanitize_terminal_text(message.trim_end()).lines() {
                let _ = writeln!(out, "{rest}    {line}");
            }
        }

        let pretty = serde_json::to_string_pretty(target).unwrap_or_default();
        let pretty = sanitize_terminal_text(&pretty);
        let total = pretty.lines().count();
        let limit = match options.max_value_lines {
            0 => total,
            n => n,
        };
        let _ = writeln!(out, "{}", rest.trim_end());
        for line in pretty.lines().take(limit) {
            let _ = writeln!(out, "{rest}    {line}");
        }
        if total > limit {
            let _ = writeln!(out, "{rest}    ... ({} more lines)", total - limit);
        }
        let _ = writeln!(out, "{}", rest.trim_end());
        out
    }
}

impl Renderer for CommitRenderer {
    fn render(&self, node: &HistoryNode, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let document = node.commit().as_document();
        let target = options
            .target_path
            .resolve(&document)
            .ok_or_else(|| RenderError::PathNotFound {
                path: options.target_path.to_string(),
            })?;

        let text = if options.one_line_per_node {
            Self::render_one_line(node, target, options)
        } else {
            self.render_verbose(node, target, options)
        };
        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_types::{Commit, CommitMeta, TimeZoneSetting, ValuePath};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn node(value: Value, message: Option<&str>, graph: GraphRow) -> HistoryNode {
        let commit = Commit::root(
            value,
            CommitMeta {
                date: Some(NOW - 3 * 86_400),
                message: message.map(str::to_string),
            },
        );
        HistoryNode::new(commit.hash(), commit, graph)
    }

    fn single_lane() -> GraphRow {
        GraphRow {
            column: 0,
            lanes_before: 1,
            lanes_after: 1,
        }
    }

    fn render(node: &HistoryNode, options: &RenderOptions) -> String {
        let bytes = CommitRenderer::with_now(NOW).render(node, options).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn one_line_uses_message_summary() {
        let n = node(json!(1), Some("first line\nsecond"), single_lane());
        let out = render(&n, &RenderOptions::default());
        assert_eq!(out, format!("* {} first line\n", n.hash().short()));
    }

    #[test]
    fn one_line_falls_back_to_value() {
        let n = node(json!({"a": 1}), None, single_lane());
        let options = RenderOptions {
            show_ancestry_graph: false,
            ..RenderOptions::default()
        };
        assert_eq!(render(&n, &options), format!("{} {{\"a\":1}}\n", n.hash().short()));
    }

    #[test]
    fn one_line_draws_other_lanes() {
        let n = node(
            json!(1),
            Some("m"),
            GraphRow {
                column: 1,
                lanes_before: 3,
                lanes_after: 3,
            },
        );
        let out = render(&n, &RenderOptions::default());
        assert!(out.starts_with("| * | "), "got {out:?}");
    }

    #[test]
    fn verbose_layout() {
        let n = node(json!({"k": "v"}), Some("subject\n\nbody"), single_lane());
        let options = RenderOptions {
            time_zone: TimeZoneSetting::Utc,
            ..RenderOptions::default().verbose()
        };
        let out = render(&n, &options);
        let expected = format!(
            "commit {}\nDate:   2023-11-11 22:13:20 +0000 (3 days ago)\n\n    subject\n    \n    body\n\n    {{\n      \"k\": \"v\"\n    }}\n\n",
            n.hash()
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn verbose_truncates_long_values() {
        let n = node(json!([1, 2, 3, 4, 5]), None, single_lane());
        let options = RenderOptions {
            max_value_lines: 2,
            ..RenderOptions::default().verbose()
        };
        let out = render(&n, &options);
        assert!(out.contains("    [\n      1,\n    ... (5 more lines)\n"), "got {out:?}");
    }

    #[test]
    fn missing_path_is_a_node_error() {
        let n = node(json!({"a": 1}), None, single_lane());
        let options = RenderOptions {
            target_path: ValuePath::parse(".value.b").unwrap(),
            ..RenderOptions::default()
        };
        let err = CommitRenderer::with_now(NOW).render(&n, &options).unwrap_err();
        assert_eq!(
            err,
            RenderError::PathNotFound {
                path: ".value.b".to_string()
            }
        );
    }

    #[test]
    fn no_color_means_no_escapes() {
        let n = node(json!(1), Some("\x1b[31mred\x1b[0m"), single_lane());
        let out = render(&n, &RenderOptions::default().verbose());
        assert!(!out.contains('\x1b'));
        assert!(out.contains("    red\n"));
    }

    #[test]
    fn failed_result_renders_error_line() {
        let hash = Hash::of(b"n");
        let result = RenderResult::Failed {
            hash,
            error: RenderError::Format("boom".into()),
        };
        assert!(result.is_failed());
        let text = String::from_utf8(result.into_output()).unwrap();
        assert_eq!(text, format!("error: failed to render {}: boom\n", hash.short()));

        assert!(RenderResult::Lost.is_failed());
        assert!(!RenderResult::Rendered(Vec::new()).is_failed());
    }

    #[test]
    fn relative_age_buckets() {
        assert_eq!(relative_age(-5), "in the future");
        assert_eq!(relative_age(10), "just now");
        assert_eq!(relative_age(120), "2 minutes ago");
        assert_eq!(relative_age(3_600), "1 hour ago");
        assert_eq!(relative_age(3 * 86_400), "3 days ago");
        assert_eq!(relative_age(400 * 86_400), "1 year ago");
    }
}
