use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of a dataset: a mutable pointer to the head commit of one history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetName(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetNameError {
    #[error("dataset name must not be empty")]
    Empty,
    #[error("invalid character {0:?} in dataset name (allowed: letters, digits, '_', '-', '/')")]
    InvalidChar(char),
}

impl DatasetName {
    pub fn new(value: impl Into<String>) -> Result<Self, DatasetNameError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DatasetNameError::Empty);
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/')))
        {
            return Err(DatasetNameError::InvalidChar(bad));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatasetName {
    type Error = DatasetNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DatasetName> for String {
    fn from(value: DatasetName) -> Self {
        value.0
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DatasetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
