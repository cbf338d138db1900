//! Object specs: textual references to a value in the store.
//!
//! - `main`: the head commit of dataset `main`
//! - `main.value.items[0]`: a path inside that commit
//! - `#<64 hex chars>.meta`: a path inside a commit addressed by hash

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use lineage_types::{DatasetName, Hash, ValuePath};

use crate::{Database, SpecError, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecRoot {
    Dataset(DatasetName),
    Commit(Hash),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub root: SpecRoot,
    pub path: ValuePath,
}

impl FromStr for ObjectSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SpecError::Empty);
        }

        let (root, rest) = if let Some(hex) = s.strip_prefix('#') {
            let split = hex.find(['.', '[']).unwrap_or(hex.len());
            let hash: Hash = hex[..split].parse()?;
            (SpecRoot::Commit(hash), &hex[split..])
        } else {
            let split = s.find(['.', '[']).unwrap_or(s.len());
            let name = DatasetName::new(&s[..split])?;
            (SpecRoot::Dataset(name), &s[split..])
        };

        Ok(Self {
            root,
            path: ValuePath::parse(rest)?,
        })
    }
}

impl fmt::Display for ObjectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            SpecRoot::Dataset(name) => write!(f, "{name}{}", self.path),
            SpecRoot::Commit(hash) => write!(f, "#{hash}{}", self.path),
        }
    }
}

impl Database {
    /// Resolve a spec to a value. `Ok(None)` when the dataset, commit, or path
    /// does not exist.
    pub fn resolve(&self, spec: &ObjectSpec) -> Result<Option<Value>, StoreError> {
        let hash = match &spec.root {
            SpecRoot::Dataset(name) => match self.head(name) {
                Some(hash) => hash,
                None => return Ok(None),
            },
            SpecRoot::Commit(hash) => *hash,
        };
        let Some(commit) = self.get_commit(&hash)? else {
            return Ok(None);
        };
        let document = commit.as_document();
        Ok(spec.path.resolve(&document).cloned())
    }
}
