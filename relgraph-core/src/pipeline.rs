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

//! Pipeline
//!
//! Runs the stages strictly in order over one in-memory graph:
//!
//! ```text
//! raw records → normalize → deduplicate → partition → layout → snapshot
//! ```

use crate::community::{LeidenPartitioner, Partition};
use crate::config::PipelineConfig;
use crate::dedup::{DedupStats, EdgeDeduplicator};
use crate::error::{RelGraphError, Result};
use crate::graph::{GraphStats, RelationGraph};
use crate::layout::{LayoutEngine, LayoutReport, NonConvergenceWarning};
use crate::record::{NormalizedBatch, RawRelation, RecordNormalizer, StatementType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Counters and diagnostics of one run
#[derive(Debug)]
pub struct RunReport {
    pub records_seen: usize,
    pub records_accepted: usize,
    pub records_dropped: usize,
    /// Malformed records that were skipped
    pub rejected: Vec<RelGraphError>,
    pub dedup: DedupStats,
    pub graph: GraphStats,
    pub layout: LayoutReport,
}

impl RunReport {
    pub fn warnings(&self) -> impl Iterator<Item = &NonConvergenceWarning> {
        self.layout.warning.iter()
    }
}

/// The laid-out graph, its partition and the run report
#[derive(Debug)]
pub struct PipelineOutput {
    pub graph: RelationGraph,
    pub partition: Partition,
    pub report: RunReport,
}

/// Positioned node, as handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub community: usize,
}

/// Edge by node identifiers, as handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub source: String,
    pub target: String,
    pub evidence_count: u64,
    pub belief: f64,
    pub statement_type: StatementType,
}

/// Serializable output of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub communities: Vec<Vec<String>>,
    pub modularity: f64,
}

impl PipelineOutput {
    /// Flatten the graph into the renderer's output contract
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self.graph.nodes();

        GraphSnapshot {
            nodes: nodes
                .iter()
                .enumerate()
                .map(|(idx, node)| {
                    let position = node.position.unwrap_or_default();
                    NodeSnapshot {
                        id: node.id.clone(),
                        x: position.x,
                        y: position.y,
                        community: node.community.unwrap_or(self.partition.membership[idx]),
                    }
                })
                .collect(),
            edges: self
                .graph
                .edges()
                .iter()
                .map(|edge| EdgeSnapshot {
                    source: nodes[edge.source].id.clone(),
                    target: nodes[edge.target].id.clone(),
                    evidence_count: edge.evidence_count,
                    belief: edge.belief,
                    statement_type: edge.statement_type.clone(),
                })
                .collect(),
            communities: self.partition.communities.clone(),
            modularity: self.partition.modularity,
        }
    }
}

/// Relation graph construction and layout pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn normalizer(&self) -> RecordNormalizer {
        RecordNormalizer::new(self.config.statement_type.clone())
    }

    /// Run over already-parsed relation records
    pub fn run(&self, records: &[RawRelation]) -> Result<PipelineOutput> {
        self.config.validate()?;
        let batch = self
            .normalizer()
            .normalize(records, self.config.invalid_records)?;
        self.run_batch(batch)
    }

    /// Run over a JSON array of relation entries
    pub fn run_json(&self, records: &Value) -> Result<PipelineOutput> {
        self.config.validate()?;
        let batch = self
            .normalizer()
            .normalize_json(records, self.config.invalid_records)?;
        self.run_batch(batch)
    }

    fn run_batch(&self, batch: NormalizedBatch) -> Result<PipelineOutput> {
        let NormalizedBatch {
            tuples,
            seen,
            dropped,
            rejected,
        } = batch;

        let mut dedup = EdgeDeduplicator::new();
        dedup.extend(&tuples);
        let (mut graph, dedup_stats) = dedup.finish();

        if graph.is_empty() {
            return Err(RelGraphError::EmptyGraph);
        }

        let graph_stats = graph.stats();
        tracing::info!(
            nodes = graph_stats.node_count,
            edges = graph_stats.edge_count,
            replaced = dedup_stats.replaced,
            discarded = dedup_stats.discarded_weaker,
            duplicates = dedup_stats.ignored_duplicates,
            "Built relation graph"
        );

        let partition = LeidenPartitioner::new(
            self.config.community.clone(),
            self.config.evidence_weight,
            self.config.seed,
        )
        .partition(&graph)?;
        tracing::info!(
            communities = partition.len(),
            modularity = partition.modularity,
            "Partitioned relation graph"
        );

        let layout = LayoutEngine::new(
            self.config.layout.clone(),
            self.config.evidence_weight,
            self.config.seed,
        )
        .run(&mut graph, &partition)?;

        Ok(PipelineOutput {
            graph,
            partition,
            report: RunReport {
                records_seen: seen,
                records_accepted: tuples.len(),
                records_dropped: dropped,
                rejected,
                dedup: dedup_stats,
                graph: graph_stats,
                layout,
            },
        })
    }
}
