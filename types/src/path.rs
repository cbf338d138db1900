//! Paths into a commit's content.
//!
//! Syntax: a sequence of segments, each one of
//! - `.name`: object field (letters, digits, `_`, `-`)
//! - `[N]`: array index
//! - `["any key"]`: object field with arbitrary characters (`\"` and `\\` escapes)
//!
//! The empty path refers to the whole document.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuePath(Vec<PathSegment>);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("expected '.' or '[' at offset {0}")]
    UnexpectedChar(usize),
    #[error("empty field name at offset {0}")]
    EmptyField(usize),
    #[error("unterminated '[' starting at offset {0}")]
    Unterminated(usize),
    #[error("invalid index {0:?}")]
    InvalidIndex(String),
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl ValuePath {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// The default log target: the commit's value.
    #[must_use]
    pub fn commit_value() -> Self {
        Self(vec![PathSegment::Field("value".to_string())])
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Walk `document` along this path. `None` when any segment is missing.
    #[must_use]
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(document, |current, segment| match segment {
                PathSegment::Field(name) => current.as_object()?.get(name),
                PathSegment::Index(i) => current.as_array()?.get(*i),
            })
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let chars: Vec<char> = raw.trim().chars().collect();
        let mut segments = Vec::new();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    let start = pos + 1;
                    let mut end = start;
                    while end < chars.len() && is_field_char(chars[end]) {
                        end += 1;
                    }
                    if end == start {
                        return Err(PathError::EmptyField(pos));
                    }
                    segments.push(PathSegment::Field(chars[start..end].iter().collect()));
                    pos = end;
                }
                '[' => {
                    let (segment, next) = parse_bracket(&chars, pos)?;
                    segments.push(segment);
                    pos = next;
                }
                _ => return Err(PathError::UnexpectedChar(pos)),
            }
        }

        Ok(Self(segments))
    }
}

/// Parse a `[...]` segment starting at `open`; returns the segment and the
/// offset just past the closing bracket.
fn parse_bracket(chars: &[char], open: usize) -> Result<(PathSegment, usize), PathError> {
    let mut pos = open + 1;
    if chars.get(pos) == Some(&'"') {
        pos += 1;
        let mut key = String::new();
        loop {
            match chars.get(pos) {
                None => return Err(PathError::Unterminated(open)),
                Some('\\') => {
                    let escaped = chars.get(pos + 1).ok_or(PathError::Unterminated(open))?;
                    key.push(*escaped);
                    pos += 2;
                }
                Some('"') => {
                    pos += 1;
                    break;
                }
                Some(c) => {
                    key.push(*c);
                    pos += 1;
                }
            }
        }
        if chars.get(pos) != Some(&']') {
            return Err(PathError::Unterminated(open));
        }
        return Ok((PathSegment::Field(key), pos + 1));
    }

    let close = chars[pos..]
        .iter()
        .position(|c| *c == ']')
        .map(|offset| pos + offset)
        .ok_or(PathError::Unterminated(open))?;
    let digits: String = chars[pos..close].iter().collect();
    let index = digits
        .trim()
        .parse::<usize>()
        .map_err(|_| PathError::InvalidIndex(digits.clone()))?;
    Ok((PathSegment::Index(index), close + 1))
}

impl FromStr for ValuePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            match segment {
                PathSegment::Field(name) if !name.is_empty() && name.chars().all(is_field_char) => {
                    write!(f, ".{name}")?;
                }
                PathSegment::Field(name) => {
                    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "[\"{escaped}\"]")?;
                }
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}
