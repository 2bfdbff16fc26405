// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Relation graph error types

use thiserror::Error;

/// Result type for relation graph operations
pub type Result<T> = std::result::Result<T, RelGraphError>;

/// Errors that can occur while building or laying out a relation graph
#[derive(Debug, Error)]
pub enum RelGraphError {
    /// A relation record is missing a field or carries an unusable value
    #[error("Invalid relation record #{index}: field `{field}` {reason}")]
    Validation {
        index: usize,
        field: String,
        reason: String,
    },

    /// No node survived normalization, so there is nothing to partition or lay out
    #[error("Relation graph is empty: no records of the target statement type were accepted")]
    EmptyGraph,

    /// A partition does not assign every node of the graph
    #[error("Partition covers {assigned} nodes but the graph has {nodes}")]
    PartitionMismatch { nodes: usize, assigned: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelGraphError {
    pub(crate) fn validation(
        index: usize,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RelGraphError::Validation {
            index,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a per-record failure that a skip policy may recover from
    pub fn is_record_error(&self) -> bool {
        matches!(self, RelGraphError::Validation { .. })
    }
}

impl From<serde_json::Error> for RelGraphError {
    fn from(e: serde_json::Error) -> Self {
        RelGraphError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RelGraphError {
    fn from(e: toml::de::Error) -> Self {
        RelGraphError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field_and_index() {
        let err = RelGraphError::validation(3, "data.belief", "is missing");
        assert_eq!(
            err.to_string(),
            "Invalid relation record #3: field `data.belief` is missing"
        );
        assert!(err.is_record_error());
        assert!(!RelGraphError::EmptyGraph.is_record_error());
    }
}
