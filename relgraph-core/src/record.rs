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

//! Relation Records
//!
//! Raw relation entries as returned by the upstream knowledge-base query and
//! their normalization into validated tuples.
//!
//! ## Input Shape
//!
//! ```json
//! {
//!   "source_id": "HGNC:6407",
//!   "target_id": "HGNC:1097",
//!   "data": { "stmt_type": "Complex", "evidence_count": 12, "belief": 0.98 }
//! }
//! ```
//!
//! Extra fields are ignored. Every field is optional at the type level so a
//! missing one is reported against the record that lacks it.

use crate::config::RecordPolicy;
use crate::error::{RelGraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Statement types understood by the normalizer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatementType {
    Complex,
    Activation,
    Inhibition,
    Phosphorylation,
    Dephosphorylation,
    Ubiquitination,
    IncreaseAmount,
    DecreaseAmount,
    /// Any statement type without a dedicated variant
    Other(String),
}

impl StatementType {
    pub fn as_str(&self) -> &str {
        match self {
            StatementType::Complex => "Complex",
            StatementType::Activation => "Activation",
            StatementType::Inhibition => "Inhibition",
            StatementType::Phosphorylation => "Phosphorylation",
            StatementType::Dephosphorylation => "Dephosphorylation",
            StatementType::Ubiquitination => "Ubiquitination",
            StatementType::IncreaseAmount => "IncreaseAmount",
            StatementType::DecreaseAmount => "DecreaseAmount",
            StatementType::Other(name) => name,
        }
    }
}

impl FromStr for StatementType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "Complex" => StatementType::Complex,
            "Activation" => StatementType::Activation,
            "Inhibition" => StatementType::Inhibition,
            "Phosphorylation" => StatementType::Phosphorylation,
            "Dephosphorylation" => StatementType::Dephosphorylation,
            "Ubiquitination" => StatementType::Ubiquitination,
            "IncreaseAmount" => StatementType::IncreaseAmount,
            "DecreaseAmount" => StatementType::DecreaseAmount,
            other => StatementType::Other(other.to_string()),
        })
    }
}

impl From<String> for StatementType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<StatementType> for String {
    fn from(kind: StatementType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statement payload of a raw relation entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRelationData {
    #[serde(default)]
    pub stmt_type: Option<String>,
    #[serde(default)]
    pub evidence_count: Option<i64>,
    #[serde(default)]
    pub belief: Option<f64>,
}

/// One relation entry as delivered by the upstream query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRelation {
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub data: Option<RawRelationData>,
}

impl RawRelation {
    /// Build a fully populated raw relation
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        stmt_type: impl Into<String>,
        evidence_count: i64,
        belief: f64,
    ) -> Self {
        Self {
            source_id: Some(source_id.into()),
            target_id: Some(target_id.into()),
            data: Some(RawRelationData {
                stmt_type: Some(stmt_type.into()),
                evidence_count: Some(evidence_count),
                belief: Some(belief),
            }),
        }
    }

    /// Read one relation entry from a JSON value.
    ///
    /// Absent fields stay `None`; a field of the wrong JSON type is reported
    /// as a validation error for record `index`.
    pub fn from_json_value(index: usize, value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| RelGraphError::validation(index, "<record>", "is not a JSON object"))?;

        let data = match obj.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::Object(data)) => Some(RawRelationData {
                stmt_type: string_field(index, "data.stmt_type", data.get("stmt_type"))?,
                evidence_count: integer_field(
                    index,
                    "data.evidence_count",
                    data.get("evidence_count"),
                )?,
                belief: float_field(index, "data.belief", data.get("belief"))?,
            }),
            Some(other) => {
                return Err(type_mismatch(index, "data", "an object", other));
            }
        };

        Ok(Self {
            source_id: string_field(index, "source_id", obj.get("source_id"))?,
            target_id: string_field(index, "target_id", obj.get("target_id"))?,
            data,
        })
    }
}

/// Read only the statement type of a JSON relation entry, leaving the other
/// fields undecoded
fn statement_type_of(index: usize, value: &Value) -> Result<StatementType> {
    let obj = value
        .as_object()
        .ok_or_else(|| RelGraphError::validation(index, "<record>", "is not a JSON object"))?;

    let data = match obj.get("data") {
        None | Some(Value::Null) => {
            return Err(RelGraphError::validation(index, "data", "is missing"));
        }
        Some(Value::Object(data)) => data,
        Some(other) => return Err(type_mismatch(index, "data", "an object", other)),
    };

    string_field(index, "data.stmt_type", data.get("stmt_type"))?
        .map(StatementType::from)
        .ok_or_else(|| RelGraphError::validation(index, "data.stmt_type", "is missing"))
}

fn string_field(index: usize, field: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(type_mismatch(index, field, "a string", other)),
    }
}

fn integer_field(index: usize, field: &str, value: Option<&Value>) -> Result<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| type_mismatch(index, field, "an integer", v)),
    }
}

fn float_field(index: usize, field: &str, value: Option<&Value>) -> Result<Option<f64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| type_mismatch(index, field, "a number", v)),
    }
}

fn type_mismatch(index: usize, field: &str, expected: &str, found: &Value) -> RelGraphError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    RelGraphError::validation(index, field, format!("must be {expected}, found {found}"))
}

/// A validated relation, ready for edge deduplication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationTuple {
    pub source: String,
    pub target: String,
    pub evidence_count: u64,
    pub belief: f64,
    pub statement_type: StatementType,
}

impl RelationTuple {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        evidence_count: u64,
        belief: f64,
        statement_type: StatementType,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            evidence_count,
            belief,
            statement_type,
        }
    }
}

/// Outcome of normalizing a batch of raw relations
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    /// Accepted tuples, in input order
    pub tuples: Vec<RelationTuple>,
    /// Total records inspected
    pub seen: usize,
    /// Records of a different statement type
    pub dropped: usize,
    /// Malformed records skipped under [`RecordPolicy::Skip`]
    pub rejected: Vec<RelGraphError>,
}

/// Filters raw relations to one statement type and validates them
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    statement_type: StatementType,
}

impl RecordNormalizer {
    pub fn new(statement_type: StatementType) -> Self {
        Self { statement_type }
    }

    pub fn statement_type(&self) -> &StatementType {
        &self.statement_type
    }

    /// Normalize a single record.
    ///
    /// Returns `Ok(None)` when the record is of another statement type.
    pub fn normalize_one(&self, index: usize, raw: &RawRelation) -> Result<Option<RelationTuple>> {
        let data = raw
            .data
            .as_ref()
            .ok_or_else(|| RelGraphError::validation(index, "data", "is missing"))?;
        let stmt_type = data
            .stmt_type
            .as_deref()
            .ok_or_else(|| RelGraphError::validation(index, "data.stmt_type", "is missing"))?;

        let statement_type: StatementType = stmt_type.to_string().into();
        if statement_type != self.statement_type {
            return Ok(None);
        }

        let source = required_id(index, "source_id", raw.source_id.as_deref())?;
        let target = required_id(index, "target_id", raw.target_id.as_deref())?;

        let evidence_count = match data.evidence_count {
            None => {
                return Err(RelGraphError::validation(
                    index,
                    "data.evidence_count",
                    "is missing",
                ))
            }
            Some(n) if n < 0 => {
                return Err(RelGraphError::validation(
                    index,
                    "data.evidence_count",
                    format!("must be non-negative, found {n}"),
                ))
            }
            Some(n) => n as u64,
        };

        let belief = match data.belief {
            None => return Err(RelGraphError::validation(index, "data.belief", "is missing")),
            Some(b) if !b.is_finite() || !(0.0..=1.0).contains(&b) => {
                return Err(RelGraphError::validation(
                    index,
                    "data.belief",
                    format!("must lie in [0, 1], found {b}"),
                ))
            }
            Some(b) => b,
        };

        Ok(Some(RelationTuple {
            source,
            target,
            evidence_count,
            belief,
            statement_type,
        }))
    }

    /// Normalize a slice of raw relations
    pub fn normalize(&self, records: &[RawRelation], policy: RecordPolicy) -> Result<NormalizedBatch> {
        self.collect(
            records
                .iter()
                .enumerate()
                .map(|(i, raw)| (i, self.normalize_one(i, raw))),
            policy,
        )
    }

    /// Normalize a JSON array of relation entries, as returned by the upstream query
    pub fn normalize_json(&self, records: &Value, policy: RecordPolicy) -> Result<NormalizedBatch> {
        let entries = records.as_array().ok_or_else(|| {
            RelGraphError::Serialization("expected a JSON array of relation records".to_string())
        })?;

        self.collect(
            entries.iter().enumerate().map(|(i, value)| {
                let outcome = statement_type_of(i, value).and_then(|kind| {
                    if kind != self.statement_type {
                        return Ok(None);
                    }
                    let raw = RawRelation::from_json_value(i, value)?;
                    self.normalize_one(i, &raw)
                });
                (i, outcome)
            }),
            policy,
        )
    }

    fn collect<I>(&self, outcomes: I, policy: RecordPolicy) -> Result<NormalizedBatch>
    where
        I: Iterator<Item = (usize, Result<Option<RelationTuple>>)>,
    {
        let mut batch = NormalizedBatch::default();

        for (index, outcome) in outcomes {
            batch.seen += 1;
            match outcome {
                Ok(Some(tuple)) => batch.tuples.push(tuple),
                Ok(None) => batch.dropped += 1,
                Err(err) => match policy {
                    RecordPolicy::Abort => return Err(err),
                    RecordPolicy::Skip => {
                        tracing::warn!(record = index, "Skipping relation record: {}", err);
                        batch.rejected.push(err);
                    }
                },
            }
        }

        tracing::debug!(
            seen = batch.seen,
            accepted = batch.tuples.len(),
            dropped = batch.dropped,
            rejected = batch.rejected.len(),
            statement_type = %self.statement_type,
            "Normalized relation records"
        );

        Ok(batch)
    }
}

fn required_id(index: usize, field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        None => Err(RelGraphError::validation(index, field, "is missing")),
        Some("") => Err(RelGraphError::validation(index, field, "is blank")),
        Some(id) => Ok(id.to_string()),
    }
}
