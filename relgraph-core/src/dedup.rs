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

//! Edge Deduplication
//!
//! Builds the relation graph from normalized tuples so that each unordered
//! node pair carries a single edge, oriented toward the direction with the
//! most evidence.
//!
//! | existing edge | new tuple `s -> t`                                  |
//! |---------------|-----------------------------------------------------|
//! | none          | insert `s -> t`                                     |
//! | `t -> s`      | replace when `ev > existing`, otherwise discard     |
//! | `s -> t`      | ignore (first same-direction occurrence wins)       |

use crate::graph::{Edge, RelationGraph};
use crate::record::RelationTuple;
use serde::{Deserialize, Serialize};

/// What happened to one tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// No edge existed for the pair
    Inserted,
    /// A weaker reverse edge was replaced
    Replaced,
    /// A reverse edge with at least as much evidence was kept
    DiscardedWeaker,
    /// An edge in the same direction already existed
    IgnoredDuplicate,
}

/// Per-run deduplication counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    pub inserted: usize,
    pub replaced: usize,
    pub discarded_weaker: usize,
    pub ignored_duplicates: usize,
}

impl DedupStats {
    fn record(&mut self, outcome: DedupOutcome) {
        match outcome {
            DedupOutcome::Inserted => self.inserted += 1,
            DedupOutcome::Replaced => self.replaced += 1,
            DedupOutcome::DiscardedWeaker => self.discarded_weaker += 1,
            DedupOutcome::IgnoredDuplicate => self.ignored_duplicates += 1,
        }
    }
}

/// Incrementally builds a [`RelationGraph`] from relation tuples
#[derive(Debug, Default)]
pub struct EdgeDeduplicator {
    graph: RelationGraph,
    stats: DedupStats,
}

impl EdgeDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one tuple to the graph
    pub fn insert(&mut self, tuple: &RelationTuple) -> DedupOutcome {
        let source = self.graph.add_node(&tuple.source);
        let target = self.graph.add_node(&tuple.target);

        let outcome = match self.graph.edge_between(source, target) {
            None => DedupOutcome::Inserted,
            Some(existing) if existing.source == source => DedupOutcome::IgnoredDuplicate,
            Some(existing) if tuple.evidence_count > existing.evidence_count => {
                DedupOutcome::Replaced
            }
            Some(_) => DedupOutcome::DiscardedWeaker,
        };

        if matches!(outcome, DedupOutcome::Inserted | DedupOutcome::Replaced) {
            self.graph.put_edge(Edge {
                source,
                target,
                evidence_count: tuple.evidence_count,
                belief: tuple.belief,
                statement_type: tuple.statement_type.clone(),
            });
        }

        if outcome != DedupOutcome::Inserted {
            tracing::debug!(
                source = %tuple.source,
                target = %tuple.target,
                evidence = tuple.evidence_count,
                ?outcome,
                "Resolved conflicting relation"
            );
        }

        self.stats.record(outcome);
        outcome
    }

    /// Add tuples in order
    pub fn extend<'a, I>(&mut self, tuples: I)
    where
        I: IntoIterator<Item = &'a RelationTuple>,
    {
        for tuple in tuples {
            self.insert(tuple);
        }
    }

    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    /// Finish and hand over the graph
    pub fn finish(self) -> (RelationGraph, DedupStats) {
        (self.graph, self.stats)
    }
}

/// Build a deduplicated graph from tuples in input order
pub fn build_graph(tuples: &[RelationTuple]) -> (RelationGraph, DedupStats) {
    let mut dedup = EdgeDeduplicator::new();
    dedup.extend(tuples);
    dedup.finish()
}
