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

//! Relgraph Core
//!
//! Turns biological relation records into a laid-out directed graph:
//! deduplicated edges, modularity-based communities and 2-D coordinates.
//!
//! ## Architecture
//!
//! ```text
//! RawRelation → RecordNormalizer → EdgeDeduplicator → RelationGraph
//!                                                          ↓
//!                           GraphSnapshot ← LayoutEngine ← LeidenPartitioner
//! ```
//!
//! [`Pipeline`] runs the stages in that order from a single [`PipelineConfig`].

pub mod community;
pub mod config;
pub mod dedup;
pub mod error;
pub mod graph;
pub mod layout;
pub mod pipeline;
pub mod record;

pub use community::{modularity, LeidenPartitioner, Partition};
pub use config::{CommunityConfig, EvidenceWeight, LayoutConfig, PipelineConfig, RecordPolicy};
pub use dedup::{build_graph, DedupOutcome, DedupStats, EdgeDeduplicator};
pub use error::{RelGraphError, Result};
pub use graph::{Edge, GraphStats, Node, NodeIndex, Position, RelationGraph};
pub use layout::{LayoutEngine, LayoutReport, NonConvergenceWarning, CLUSTER_RADIUS};
pub use pipeline::{EdgeSnapshot, GraphSnapshot, NodeSnapshot, Pipeline, PipelineOutput, RunReport};
pub use record::{
    NormalizedBatch, RawRelation, RawRelationData, RecordNormalizer, RelationTuple, StatementType,
};
