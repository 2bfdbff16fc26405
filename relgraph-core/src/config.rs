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

//! Pipeline configuration
//!
//! Every knob that steers a run lives here and is passed into the pipeline
//! explicitly, including the seed used by every randomized step.

use crate::error::{RelGraphError, Result};
use crate::record::StatementType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which edge attribute weights clustering and layout attraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceWeight {
    #[default]
    EvidenceCount,
    Belief,
}

impl std::str::FromStr for EvidenceWeight {
    type Err = RelGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "evidence_count" | "evidence" => Ok(EvidenceWeight::EvidenceCount),
            "belief" => Ok(EvidenceWeight::Belief),
            other => Err(RelGraphError::Config(format!(
                "unknown evidence weight `{other}` (expected `evidence_count` or `belief`)"
            ))),
        }
    }
}

/// What to do with a malformed relation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPolicy {
    /// Log and skip the record, keep building the graph
    #[default]
    Skip,
    /// Fail the whole run on the first malformed record
    Abort,
}

impl std::str::FromStr for RecordPolicy {
    type Err = RelGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(RecordPolicy::Skip),
            "abort" => Ok(RecordPolicy::Abort),
            other => Err(RelGraphError::Config(format!(
                "unknown record policy `{other}` (expected `skip` or `abort`)"
            ))),
        }
    }
}

/// Community detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityConfig {
    /// Resolution parameter (higher = more communities)
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Maximum local-moving passes per level
    #[serde(default = "default_community_iterations")]
    pub max_iterations: usize,

    /// Maximum number of aggregation levels
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            max_iterations: default_community_iterations(),
            max_levels: default_max_levels(),
        }
    }
}

/// Force-directed refinement settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Iteration cap for the force simulation
    #[serde(default = "default_layout_iterations")]
    pub max_iterations: usize,

    /// Convergence threshold on the per-node step norm
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Fraction of the net force applied per step, before the temperature cap
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// Optimal node distance. None = 1/sqrt(node_count)
    #[serde(default)]
    pub spring_constant: Option<f64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_layout_iterations(),
            tolerance: default_tolerance(),
            damping: default_damping(),
            spring_constant: None,
        }
    }
}

/// Configuration for one relation graph run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Statement type kept by the normalizer
    #[serde(default = "default_statement_type")]
    pub statement_type: StatementType,

    /// Edge attribute used as weight
    #[serde(default)]
    pub evidence_weight: EvidenceWeight,

    /// Handling of malformed records
    #[serde(default)]
    pub invalid_records: RecordPolicy,

    /// Seed for community detection and initial placement
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub community: CommunityConfig,

    #[serde(default)]
    pub layout: LayoutConfig,
}

// Default values
fn default_statement_type() -> StatementType {
    StatementType::Complex
}

fn default_seed() -> u64 {
    42
}

fn default_resolution() -> f64 {
    1.0
}

fn default_community_iterations() -> usize {
    100
}

fn default_max_levels() -> usize {
    10
}

fn default_layout_iterations() -> usize {
    50
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_damping() -> f64 {
    0.1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            statement_type: default_statement_type(),
            evidence_weight: EvidenceWeight::default(),
            invalid_records: RecordPolicy::default(),
            seed: default_seed(),
            community: CommunityConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - RELGRAPH_STATEMENT_TYPE: statement type to keep (default: Complex)
    /// - RELGRAPH_EVIDENCE_WEIGHT: `evidence_count` or `belief`
    /// - RELGRAPH_INVALID_RECORDS: `skip` or `abort`
    /// - RELGRAPH_SEED: seed for randomized steps (default: 42)
    pub fn from_env() -> Result<Self> {
        Self::merge_with_env(Self::default())
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        let config = Self::merge_with_env(config)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields whose environment variable is set
    fn merge_with_env(mut config: Self) -> Result<Self> {
        if let Ok(kind) = std::env::var("RELGRAPH_STATEMENT_TYPE") {
            config.statement_type = kind.into();
        }

        if let Ok(weight) = std::env::var("RELGRAPH_EVIDENCE_WEIGHT") {
            config.evidence_weight = weight.parse()?;
        }

        if let Ok(policy) = std::env::var("RELGRAPH_INVALID_RECORDS") {
            config.invalid_records = policy.parse()?;
        }

        if let Ok(seed) = std::env::var("RELGRAPH_SEED") {
            config.seed = seed
                .trim()
                .parse::<u64>()
                .map_err(|e| RelGraphError::Config(format!("RELGRAPH_SEED: {e}")))?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.community.resolution.is_finite() && self.community.resolution > 0.0) {
            return Err(RelGraphError::Config(format!(
                "community.resolution must be positive, got {}",
                self.community.resolution
            )));
        }
        if self.community.max_iterations == 0 || self.community.max_levels == 0 {
            return Err(RelGraphError::Config(
                "community.max_iterations and community.max_levels must be at least 1".to_string(),
            ));
        }
        if self.layout.max_iterations == 0 {
            return Err(RelGraphError::Config(
                "layout.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.layout.tolerance.is_finite() && self.layout.tolerance > 0.0) {
            return Err(RelGraphError::Config(format!(
                "layout.tolerance must be positive, got {}",
                self.layout.tolerance
            )));
        }
        if !(self.layout.damping > 0.0 && self.layout.damping <= 1.0) {
            return Err(RelGraphError::Config(format!(
                "layout.damping must lie in (0, 1], got {}",
                self.layout.damping
            )));
        }
        if let Some(k) = self.layout.spring_constant {
            if !(k.is_finite() && k > 0.0) {
                return Err(RelGraphError::Config(format!(
                    "layout.spring_constant must be positive, got {k}"
                )));
            }
        }
        Ok(())
    }
}
