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

//! Relation Graph
//!
//! The directed graph every stage operates on. Nodes keep insertion order and
//! are addressed by a dense [`NodeIndex`]; at most one edge exists per
//! unordered node pair, which is tracked by a pair index so either direction
//! can be looked up in constant time.

use crate::config::EvidenceWeight;
use crate::record::StatementType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dense index of a node in insertion order
pub type NodeIndex = usize;

/// 2-D layout coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A graph node, keyed by its biological identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier (e.g. an HGNC id)
    pub id: String,
    /// Final layout coordinate, set by the layout engine
    pub position: Option<Position>,
    /// Community index, set by the layout engine
    pub community: Option<usize>,
}

/// Directed relation edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub evidence_count: u64,
    pub belief: f64,
    pub statement_type: StatementType,
}

impl Edge {
    /// Weight of this edge under the given weighting key
    pub fn weight(&self, key: EvidenceWeight) -> f64 {
        match key {
            EvidenceWeight::EvidenceCount => self.evidence_count as f64,
            EvidenceWeight::Belief => self.belief,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Graph statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub self_loop_count: usize,
    pub total_evidence: u64,
    pub avg_degree: f64,
    pub density: f64,
}

/// Directed relation graph with one edge per unordered node pair
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    nodes: Vec<Node>,
    node_index: HashMap<String, NodeIndex>,
    edges: Vec<Edge>,
    /// (min, max) node pair -> slot in `edges`
    pair_index: HashMap<(NodeIndex, NodeIndex), usize>,
}

fn pair_key(a: NodeIndex, b: NodeIndex) -> (NodeIndex, NodeIndex) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl RelationGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a node by identifier
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(id) {
            return idx;
        }

        let idx = self.nodes.len();
        self.nodes.push(Node {
            id: id.to_string(),
            position: None,
            community: None,
        });
        self.node_index.insert(id.to_string(), idx);
        idx
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.node_index(id).and_then(|idx| self.nodes.get(idx))
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in the order their node pair was first connected
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The edge connecting `a` and `b`, in whichever direction it runs
    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<&Edge> {
        self.pair_index.get(&pair_key(a, b)).map(|&slot| &self.edges[slot])
    }

    /// The edge `source -> target` by identifier, only if it runs in that direction
    pub fn directed_edge(&self, source: &str, target: &str) -> Option<&Edge> {
        let s = self.node_index(source)?;
        let t = self.node_index(target)?;
        self.edge_between(s, t)
            .filter(|edge| edge.source == s && edge.target == t)
    }

    /// Insert an edge for a pair that has none yet, or overwrite the pair's edge in place
    pub(crate) fn put_edge(&mut self, edge: Edge) {
        let key = pair_key(edge.source, edge.target);
        match self.pair_index.get(&key) {
            Some(&slot) => self.edges[slot] = edge,
            None => {
                self.pair_index.insert(key, self.edges.len());
                self.edges.push(edge);
            }
        }
    }

    pub(crate) fn set_position(&mut self, idx: NodeIndex, position: Position) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.position = Some(position);
        }
    }

    pub(crate) fn set_community(&mut self, idx: NodeIndex, community: usize) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.community = Some(community);
        }
    }

    /// Undirected weighted edge list for clustering and layout
    pub fn weighted_edges(
        &self,
        key: EvidenceWeight,
    ) -> impl Iterator<Item = (NodeIndex, NodeIndex, f64)> + '_ {
        self.edges
            .iter()
            .map(move |edge| (edge.source, edge.target, edge.weight(key)))
    }

    /// Get graph statistics
    pub fn stats(&self) -> GraphStats {
        let node_count = self.nodes.len();
        let edge_count = self.edges.len();
        let self_loop_count = self.edges.iter().filter(|e| e.is_self_loop()).count();
        let total_evidence = self.edges.iter().map(|e| e.evidence_count).sum();

        let avg_degree = if node_count > 0 {
            2.0 * edge_count as f64 / node_count as f64
        } else {
            0.0
        };

        let density = if node_count > 1 {
            (edge_count - self_loop_count) as f64
                / (node_count * (node_count - 1) / 2) as f64
        } else {
            0.0
        };

        GraphStats {
            node_count,
            edge_count,
            self_loop_count,
            total_evidence,
            avg_degree,
            density,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: NodeIndex, target: NodeIndex, evidence_count: u64) -> Edge {
        Edge {
            source,
            target,
            evidence_count,
            belief: 0.5,
            statement_type: StatementType::Complex,
        }
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut graph = RelationGraph::new();
        let a = graph.add_node("HGNC:1");
        let b = graph.add_node("HGNC:2");
        assert_eq!(graph.add_node("HGNC:1"), a);
        assert_ne!(a, b);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.nodes()[1].id, "HGNC:2");
        assert!(graph.node_by_id("HGNC:2").unwrap().position.is_none());
    }

    #[test]
    fn test_put_edge_overwrites_pair_slot() {
        let mut graph = RelationGraph::new();
        let a = graph.add_node("A");
        let b = graph.add_node("B");
        let c = graph.add_node("C");

        graph.put_edge(edge(a, b, 1));
        graph.put_edge(edge(b, c, 1));
        graph.put_edge(edge(b, a, 3));

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edges()[0].source, b);
        assert!(graph.directed_edge("B", "A").is_some());
        assert!(graph.directed_edge("A", "B").is_none());
        assert_eq!(graph.edge_between(a, b).unwrap().evidence_count, 3);
    }

    #[test]
    fn test_stats() {
        let mut graph = RelationGraph::new();
        let a = graph.add_node("A");
        let b = graph.add_node("B");
        let c = graph.add_node("C");
        graph.put_edge(edge(a, b, 2));
        graph.put_edge(edge(c, c, 5));

        let stats = graph.stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.self_loop_count, 1);
        assert_eq!(stats.total_evidence, 7);
        assert!((stats.density - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_edge_weight_key() {
        let e = edge(0, 1, 4);
        assert_eq!(e.weight(EvidenceWeight::EvidenceCount), 4.0);
        assert_eq!(e.weight(EvidenceWeight::Belief), 0.5);
    }
}
