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

//! Leiden-style Community Detection
//!
//! Partitions the relation graph into communities that maximize weighted
//! modularity. Direction is ignored; each edge contributes its weight once.
//!
//! ## Algorithm Overview
//!
//! 1. **Local Moving Phase**: Visit nodes in seeded random order and move each
//!    to the neighboring community with the largest modularity gain
//! 2. **Refinement Phase**: Split every community that is not internally
//!    connected into its connected components
//! 3. **Aggregation Phase**: Collapse communities into super-nodes and repeat
//!    until a level merges nothing
//!
//! ## Modularity
//!
//! Q = Σc [ Lc/m - γ·(dc/2m)² ]
//!
//! Where:
//! - Lc = total weight of edges inside community c
//! - dc = sum of weighted degrees of nodes in c
//! - m = total edge weight
//! - γ = resolution
//!
//! Reference: Traag et al., "From Louvain to Leiden: guaranteeing well-connected communities"
//! https://www.nature.com/articles/s41598-019-41695-z

use crate::config::{CommunityConfig, EvidenceWeight};
use crate::error::{RelGraphError, Result};
use crate::graph::{NodeIndex, RelationGraph};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gains below this are treated as no improvement
const GAIN_EPSILON: f64 = 1e-12;

/// Disjoint communities covering every node of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Node identifiers per community, ordered by each community's first node
    pub communities: Vec<Vec<String>>,
    /// Community index per node, by [`NodeIndex`]
    pub membership: Vec<usize>,
    /// Modularity of this partition
    pub modularity: f64,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    pub fn community_of(&self, node: NodeIndex) -> Option<usize> {
        self.membership.get(node).copied()
    }
}

/// Undirected weighted adjacency used by the optimizer
#[derive(Debug, Clone)]
struct WeightedGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    degrees: Vec<f64>,
    total_weight: f64,
}

impl WeightedGraph {
    fn from_graph(graph: &RelationGraph, key: EvidenceWeight) -> Self {
        let n = graph.node_count();
        let mut adjacency = vec![Vec::new(); n];
        let mut self_loops = vec![0.0; n];

        for (a, b, w) in graph.weighted_edges(key) {
            if !(w.is_finite() && w > 0.0) {
                continue;
            }
            if a == b {
                self_loops[a] += w;
            } else {
                adjacency[a].push((b, w));
                adjacency[b].push((a, w));
            }
        }

        Self::with_degrees(adjacency, self_loops)
    }

    fn with_degrees(adjacency: Vec<Vec<(usize, f64)>>, self_loops: Vec<f64>) -> Self {
        let degrees: Vec<f64> = adjacency
            .iter()
            .zip(&self_loops)
            .map(|(row, &own)| row.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * own)
            .collect();
        let total_weight = degrees.iter().sum::<f64>() / 2.0;

        Self {
            adjacency,
            self_loops,
            degrees,
            total_weight,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Collapse each community into one node; internal weight becomes a self-loop
    fn aggregate(&self, membership: &[usize], count: usize) -> Self {
        let mut self_loops = vec![0.0; count];
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for (i, row) in self.adjacency.iter().enumerate() {
            let ci = membership[i];
            self_loops[ci] += self.self_loops[i];
            for &(j, w) in row {
                if i >= j {
                    continue;
                }
                let cj = membership[j];
                if ci == cj {
                    self_loops[ci] += w;
                } else {
                    *between.entry((ci.min(cj), ci.max(cj))).or_default() += w;
                }
            }
        }

        let mut adjacency = vec![Vec::new(); count];
        for ((a, b), w) in between {
            adjacency[a].push((b, w));
            adjacency[b].push((a, w));
        }

        Self::with_degrees(adjacency, self_loops)
    }
}

/// Leiden-style community detection over a [`RelationGraph`]
#[derive(Debug, Clone)]
pub struct LeidenPartitioner {
    config: CommunityConfig,
    weight: EvidenceWeight,
    seed: u64,
}

impl LeidenPartitioner {
    pub fn new(config: CommunityConfig, weight: EvidenceWeight, seed: u64) -> Self {
        Self {
            config,
            weight,
            seed,
        }
    }

    /// Partition every node of `graph` into communities
    pub fn partition(&self, graph: &RelationGraph) -> Result<Partition> {
        let n = graph.node_count();
        if n == 0 {
            return Err(RelGraphError::EmptyGraph);
        }

        let base = WeightedGraph::from_graph(graph, self.weight);

        if base.total_weight <= 0.0 {
            // No weighted edges, each node is its own community
            tracing::debug!(nodes = n, "No weighted edges, using singleton communities");
            return Ok(self.build_partition(graph, &base, (0..n).collect()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);

        // Original node -> node of the current aggregation level
        let mut assignment: Vec<usize> = (0..n).collect();
        let mut level_graph = base.clone();

        for level in 0..self.config.max_levels {
            let mut membership: Vec<usize> = (0..level_graph.len()).collect();

            // Phase 1: Local moving
            let moved = self.local_moving_phase(&level_graph, &mut membership, &mut rng);

            // Phase 2: Refinement
            let count = refinement_phase(&level_graph, &mut membership);

            for a in assignment.iter_mut() {
                *a = membership[*a];
            }

            tracing::debug!(
                level,
                nodes = level_graph.len(),
                communities = count,
                "Community detection level finished"
            );

            if !moved || count == level_graph.len() {
                break;
            }

            // Phase 3: Aggregation
            level_graph = level_graph.aggregate(&membership, count);
        }

        Ok(self.build_partition(graph, &base, assignment))
    }

    /// Local moving phase: move nodes to maximize modularity gain
    fn local_moving_phase(
        &self,
        graph: &WeightedGraph,
        membership: &mut [usize],
        rng: &mut StdRng,
    ) -> bool {
        let n = graph.len();
        let resolution = self.config.resolution;
        let two_m = 2.0 * graph.total_weight;

        let mut community_degree = vec![0.0; n];
        for (node, &c) in membership.iter().enumerate() {
            community_degree[c] += graph.degrees[node];
        }

        let mut weight_to = vec![0.0; n];
        let mut seen = vec![false; n];
        let mut touched: Vec<usize> = Vec::new();

        // Random order for visiting nodes
        let mut order: Vec<usize> = (0..n).collect();
        let mut improved = false;

        for _pass in 0..self.config.max_iterations {
            order.shuffle(rng);
            let mut moves = 0usize;

            for &node in &order {
                let current = membership[node];
                let degree = graph.degrees[node];

                for &(j, w) in &graph.adjacency[node] {
                    let c = membership[j];
                    if !seen[c] {
                        seen[c] = true;
                        touched.push(c);
                    }
                    weight_to[c] += w;
                }

                community_degree[current] -= degree;

                let gain = |c: usize, weight: f64| {
                    weight - resolution * community_degree[c] * degree / two_m
                };

                let mut best = current;
                let mut best_gain = gain(current, weight_to[current]);
                for &c in &touched {
                    let g = gain(c, weight_to[c]);
                    if g > best_gain + GAIN_EPSILON {
                        best = c;
                        best_gain = g;
                    }
                }

                community_degree[best] += degree;
                if best != current {
                    membership[node] = best;
                    moves += 1;
                }

                for &c in &touched {
                    weight_to[c] = 0.0;
                    seen[c] = false;
                }
                touched.clear();
            }

            if moves == 0 {
                break;
            }
            improved = true;
        }

        improved
    }

    fn build_partition(
        &self,
        graph: &RelationGraph,
        base: &WeightedGraph,
        assignment: Vec<usize>,
    ) -> Partition {
        // Renumber so community ids follow the first node of each community
        let mut mapping: Vec<Option<usize>> = vec![None; assignment.len()];
        let mut communities: Vec<Vec<String>> = Vec::new();
        let mut membership = Vec::with_capacity(assignment.len());

        for (node, &label) in assignment.iter().enumerate() {
            let id = *mapping[label].get_or_insert_with(|| {
                communities.push(Vec::new());
                communities.len() - 1
            });
            communities[id].push(graph.nodes()[node].id.clone());
            membership.push(id);
        }

        let modularity = weighted_modularity(base, &membership, self.config.resolution);

        Partition {
            communities,
            membership,
            modularity,
        }
    }
}

/// Refinement phase: relabel nodes by connected component within their community.
///
/// Labels are contiguous and ordered by first node. Returns the community count.
fn refinement_phase(graph: &WeightedGraph, membership: &mut [usize]) -> usize {
    let n = graph.len();
    let mut component = vec![usize::MAX; n];
    let mut next = 0usize;
    let mut stack = Vec::new();

    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        component[start] = next;
        stack.push(start);

        while let Some(node) = stack.pop() {
            for &(j, _) in &graph.adjacency[node] {
                if component[j] == usize::MAX && membership[j] == membership[node] {
                    component[j] = next;
                    stack.push(j);
                }
            }
        }
        next += 1;
    }

    membership.copy_from_slice(&component);
    next
}

fn weighted_modularity(graph: &WeightedGraph, membership: &[usize], resolution: f64) -> f64 {
    if graph.total_weight <= 0.0 {
        return 0.0;
    }

    let count = membership.iter().max().map_or(0, |&c| c + 1);
    let mut internal = vec![0.0; count];
    let mut degree = vec![0.0; count];

    for (i, row) in graph.adjacency.iter().enumerate() {
        let ci = membership[i];
        internal[ci] += graph.self_loops[i];
        degree[ci] += graph.degrees[i];
        for &(j, w) in row {
            if i < j && membership[j] == ci {
                internal[ci] += w;
            }
        }
    }

    let m = graph.total_weight;
    internal
        .iter()
        .zip(&degree)
        .map(|(&l, &d)| l / m - resolution * (d / (2.0 * m)).powi(2))
        .sum()
}

/// Compute the modularity of an arbitrary node -> community assignment
pub fn modularity(
    graph: &RelationGraph,
    weight: EvidenceWeight,
    membership: &[usize],
    resolution: f64,
) -> Result<f64> {
    if membership.len() != graph.node_count() {
        return Err(RelGraphError::PartitionMismatch {
            nodes: graph.node_count(),
            assigned: membership.len(),
        });
    }
    Ok(weighted_modularity(
        &WeightedGraph::from_graph(graph, weight),
        membership,
        resolution,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::build_graph;
    use crate::record::{RelationTuple, StatementType};
    use std::collections::HashSet;

    fn complex(source: &str, target: &str, evidence: u64) -> RelationTuple {
        RelationTuple::new(source, target, evidence, 0.9, StatementType::Complex)
    }

    fn partitioner(seed: u64) -> LeidenPartitioner {
        LeidenPartitioner::new(CommunityConfig::default(), EvidenceWeight::EvidenceCount, seed)
    }

    fn two_triangles() -> RelationGraph {
        build_graph(&[
            complex("A", "B", 5),
            complex("B", "C", 5),
            complex("C", "A", 5),
            complex("D", "E", 5),
            complex("E", "F", 5),
            complex("F", "D", 5),
            // Weak link between clusters
            complex("C", "D", 1),
        ])
        .0
    }

    #[test]
    fn test_leiden_two_clusters() {
        let graph = two_triangles();
        let partition = partitioner(42).partition(&graph).unwrap();

        assert_eq!(partition.len(), 2);
        let first: HashSet<&str> = partition.communities[0].iter().map(String::as_str).collect();
        assert_eq!(first, HashSet::from(["A", "B", "C"]));
        assert!(partition.modularity > 0.4);
    }

    #[test]
    fn test_leiden_empty_graph() {
        let graph = RelationGraph::new();
        assert!(matches!(
            partitioner(1).partition(&graph),
            Err(RelGraphError::EmptyGraph)
        ));
    }

    #[test]
    fn test_leiden_no_edges_gives_singletons() {
        let mut graph = RelationGraph::new();
        for id in ["X", "Y", "Z"] {
            graph.add_node(id);
        }

        let partition = partitioner(1).partition(&graph).unwrap();
        assert_eq!(
            partition.communities,
            vec![vec!["X".to_string()], vec!["Y".to_string()], vec!["Z".to_string()]]
        );
        assert_eq!(partition.membership, vec![0, 1, 2]);
        assert_eq!(partition.modularity, 0.0);
    }

    #[test]
    fn test_zero_evidence_edges_carry_no_weight() {
        let (graph, _) = build_graph(&[complex("A", "B", 0)]);
        let partition = partitioner(1).partition(&graph).unwrap();
        assert_eq!(partition.len(), 2);
    }

    #[test]
    fn test_partition_is_seed_deterministic() {
        let graph = two_triangles();
        let a = partitioner(9).partition(&graph).unwrap();
        let b = partitioner(9).partition(&graph).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_modularity_of_known_partitions() {
        let graph = two_triangles();
        let split = modularity(
            &graph,
            EvidenceWeight::EvidenceCount,
            &[0, 0, 0, 1, 1, 1],
            1.0,
        )
        .unwrap();
        let merged = modularity(
            &graph,
            EvidenceWeight::EvidenceCount,
            &[0, 0, 0, 0, 0, 0],
            1.0,
        )
        .unwrap();
        // 2 * (15/31 - (31/62)^2)
        assert!((split - 2.0 * (15.0 / 31.0 - 0.25)).abs() < 1e-9);
        assert!(merged.abs() < 1e-9);
    }

    #[test]
    fn test_modularity_rejects_short_membership() {
        let graph = two_triangles();
        assert!(matches!(
            modularity(&graph, EvidenceWeight::EvidenceCount, &[0, 0, 0, 1, 1], 1.0),
            Err(RelGraphError::PartitionMismatch { nodes: 6, assigned: 5 })
        ));
    }

    /// A 4-cycle whose strong pairs differ depending on the weighting key
    fn evidence_and_belief_disagree() -> RelationGraph {
        build_graph(&[
            RelationTuple::new("A", "B", 10, 0.1, StatementType::Complex),
            RelationTuple::new("C", "D", 10, 0.1, StatementType::Complex),
            RelationTuple::new("A", "C", 1, 0.9, StatementType::Complex),
            RelationTuple::new("B", "D", 1, 0.9, StatementType::Complex),
        ])
        .0
    }

    #[test]
    fn test_partition_follows_weighting_key() {
        let graph = evidence_and_belief_disagree();
        let pair = |a: &str, b: &str| vec![a.to_string(), b.to_string()];

        for seed in 0..20 {
            let run = |weight| {
                LeidenPartitioner::new(CommunityConfig::default(), weight, seed)
                    .partition(&graph)
                    .unwrap()
            };
            assert_eq!(
                run(EvidenceWeight::EvidenceCount).communities,
                vec![pair("A", "B"), pair("C", "D")]
            );
            assert_eq!(
                run(EvidenceWeight::Belief).communities,
                vec![pair("A", "C"), pair("B", "D")]
            );
        }

        let belief_pairs = modularity(&graph, EvidenceWeight::Belief, &[0, 1, 0, 1], 1.0).unwrap();
        let evidence_pairs = modularity(&graph, EvidenceWeight::Belief, &[0, 0, 1, 1], 1.0).unwrap();
        assert!(belief_pairs > evidence_pairs);
    }

    #[test]
    fn test_refinement_splits_disconnected_community() {
        let graph = WeightedGraph::with_degrees(
            vec![vec![(1, 1.0)], vec![(0, 1.0)], vec![(3, 1.0)], vec![(2, 1.0)]],
            vec![0.0; 4],
        );
        let mut membership = vec![0, 0, 0, 0];
        let count = refinement_phase(&graph, &mut membership);
        assert_eq!(count, 2);
        assert_eq!(membership, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_aggregate_moves_internal_weight_to_self_loops() {
        let graph = WeightedGraph::with_degrees(
            vec![
                vec![(1, 2.0)],
                vec![(0, 2.0), (2, 1.0)],
                vec![(1, 1.0)],
            ],
            vec![0.0; 3],
        );
        let aggregated = graph.aggregate(&[0, 0, 1], 2);
        assert_eq!(aggregated.self_loops, vec![2.0, 0.0]);
        assert_eq!(aggregated.adjacency[0], vec![(1, 1.0)]);
        assert!((aggregated.total_weight - graph.total_weight).abs() < 1e-12);
    }
}
