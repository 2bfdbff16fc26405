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

//! Integration tests for the relation graph pipeline

use relgraph_core::{
    build_graph, EvidenceWeight, LayoutConfig, LayoutEngine, LeidenPartitioner, Pipeline,
    PipelineConfig, RawRelation, RecordPolicy, RelGraphError, RelationGraph, RelationTuple,
    StatementType, CLUSTER_RADIUS,
};
use serde_json::json;
use std::collections::HashSet;
use std::f64::consts::TAU;

fn complex(source: &str, target: &str, evidence: i64) -> RawRelation {
    RawRelation::new(source, target, "Complex", evidence, 0.9)
}

/// A stronger reverse relation replaces the weaker one
#[test]
fn test_reverse_conflict_keeps_stronger_direction() {
    let output = Pipeline::new(PipelineConfig::default())
        .run(&[complex("A", "B", 2), complex("B", "A", 5)])
        .unwrap();

    assert_eq!(output.graph.edge_count(), 1);
    let edge = output.graph.directed_edge("B", "A").unwrap();
    assert_eq!(edge.evidence_count, 5);
    assert!(output.graph.directed_edge("A", "B").is_none());
}

/// The stronger direction wins whichever order the records arrive in
#[test]
fn test_conflict_resolution_is_order_independent() {
    for records in [
        vec![complex("A", "B", 1), complex("B", "A", 4)],
        vec![complex("B", "A", 4), complex("A", "B", 1)],
    ] {
        let output = Pipeline::new(PipelineConfig::default()).run(&records).unwrap();
        assert!(output.graph.directed_edge("B", "A").is_some());
        assert!(output.graph.directed_edge("A", "B").is_none());
    }
}

/// No records of the target type is a failure, not an empty success
#[test]
fn test_no_target_type_records() {
    let records = vec![
        RawRelation::new("A", "B", "Activation", 3, 0.4),
        RawRelation::new("B", "C", "Phosphorylation", 1, 0.2),
    ];
    let result = Pipeline::new(PipelineConfig::default()).run(&records);
    assert!(matches!(result, Err(RelGraphError::EmptyGraph)));

    let result = Pipeline::new(PipelineConfig::default()).run(&[]);
    assert!(matches!(result, Err(RelGraphError::EmptyGraph)));
}

/// Three isolated nodes form three singleton communities centred 120° apart
#[test]
fn test_isolated_nodes_spread_on_unit_circle() {
    let mut graph = RelationGraph::new();
    for id in ["HGNC:1", "HGNC:2", "HGNC:3"] {
        graph.add_node(id);
    }

    let config = PipelineConfig::default();
    let partition = LeidenPartitioner::new(config.community.clone(), config.evidence_weight, 7)
        .partition(&graph)
        .unwrap();
    assert_eq!(partition.len(), 3);
    assert!(partition.communities.iter().all(|c| c.len() == 1));

    let engine = LayoutEngine::new(config.layout.clone(), config.evidence_weight, 7);
    let initial = engine.initial_positions(&partition);
    let report = engine.run(&mut graph, &partition).unwrap();

    for (i, center) in report.centers.iter().enumerate() {
        assert!((center.x.hypot(center.y) - 1.0).abs() < 1e-12);
        let angle = center.y.atan2(center.x).rem_euclid(TAU);
        assert!((angle - i as f64 * TAU / 3.0).abs() < 1e-9);
        assert!(initial[i].distance_to(center) <= CLUSTER_RADIUS);
    }

    let positions: Vec<_> = graph.nodes().iter().map(|n| n.position.unwrap()).collect();
    for i in 0..3 {
        for j in (i + 1)..3 {
            assert!(positions[i].distance_to(&positions[j]) > 1e-6);
        }
    }
}

/// Same seed, same graph, same positions
#[test]
fn test_layout_is_reproducible_with_seed() {
    let records: Vec<RawRelation> = vec![
        complex("TP53", "MDM2", 40),
        complex("MDM2", "MDM4", 12),
        complex("TP53", "EP300", 8),
        complex("EP300", "CREBBP", 20),
        complex("BRCA1", "BARD1", 33),
        complex("BRCA1", "PALB2", 9),
        complex("PALB2", "BRCA2", 15),
    ];
    let config = PipelineConfig {
        seed: 1234,
        ..Default::default()
    };

    let first = Pipeline::new(config.clone()).run(&records).unwrap();
    let second = Pipeline::new(config).run(&records).unwrap();
    assert_eq!(first.snapshot(), second.snapshot());
}

/// Every node lands in exactly one community
#[test]
fn test_partition_covers_every_node_once() {
    let output = Pipeline::new(PipelineConfig::default())
        .run(&[
            complex("A", "B", 3),
            complex("B", "C", 3),
            complex("D", "E", 1),
            complex("F", "F", 2),
        ])
        .unwrap();

    let mut seen = HashSet::new();
    for community in &output.partition.communities {
        for id in community {
            assert!(seen.insert(id.clone()), "{id} appears twice");
        }
    }
    let all: HashSet<String> = output.graph.nodes().iter().map(|n| n.id.clone()).collect();
    assert_eq!(seen, all);

    for node in output.graph.nodes() {
        let community = node.community.unwrap();
        assert!(output.partition.communities[community].contains(&node.id));
    }
}

/// Upstream JSON with a malformed entry still produces a graph
#[test]
fn test_upstream_json_with_bad_entry() {
    let records = json!([
        {"source_id": "HGNC:11998", "target_id": "HGNC:6973",
         "data": {"stmt_type": "Complex", "evidence_count": 17, "belief": 0.99}},
        {"source_id": "HGNC:6973", "target_id": "HGNC:11998",
         "data": {"stmt_type": "Complex", "evidence_count": 4, "belief": 0.9}},
        {"source_id": "HGNC:1100",
         "data": {"stmt_type": "Complex", "evidence_count": 2, "belief": 0.5}},
        {"source_id": "HGNC:1100", "target_id": "HGNC:1101",
         "data": {"stmt_type": "Activation", "evidence_count": 2, "belief": 0.5}}
    ]);

    let output = Pipeline::new(PipelineConfig::default())
        .run_json(&records)
        .unwrap();

    assert_eq!(output.report.records_seen, 4);
    assert_eq!(output.report.records_accepted, 2);
    assert_eq!(output.report.records_dropped, 1);
    assert_eq!(output.report.rejected.len(), 1);
    assert_eq!(output.report.dedup.discarded_weaker, 1);

    let snapshot = output.snapshot();
    assert_eq!(snapshot.edges.len(), 1);
    assert_eq!(snapshot.edges[0].source, "HGNC:11998");
    assert_eq!(snapshot.edges[0].statement_type, StatementType::Complex);
}

/// Entries of another statement type are dropped even when their other fields are malformed
#[test]
fn test_other_type_with_malformed_fields_is_dropped() {
    let records = json!([
        {"source_id": "A", "target_id": "B",
         "data": {"stmt_type": "Complex", "evidence_count": 3, "belief": 0.5}},
        {"source_id": 17, "target_id": "C",
         "data": {"stmt_type": "Activation", "evidence_count": "many", "belief": 0.5}}
    ]);

    for policy in [RecordPolicy::Skip, RecordPolicy::Abort] {
        let config = PipelineConfig {
            invalid_records: policy,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).run_json(&records).unwrap();

        assert_eq!(output.report.records_seen, 2);
        assert_eq!(output.report.records_accepted, 1);
        assert_eq!(output.report.records_dropped, 1);
        assert!(output.report.rejected.is_empty());
        assert_eq!(output.graph.edge_count(), 1);
    }
}

/// Weighting by belief groups nodes differently from weighting by evidence count
#[test]
fn test_belief_weighting_changes_communities() {
    let records = vec![
        RawRelation::new("A", "B", "Complex", 10, 0.1),
        RawRelation::new("C", "D", "Complex", 10, 0.1),
        RawRelation::new("A", "C", "Complex", 1, 0.9),
        RawRelation::new("B", "D", "Complex", 1, 0.9),
    ];
    let communities = |weight| {
        let config = PipelineConfig {
            evidence_weight: weight,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).run(&records).unwrap();
        assert_eq!(output.graph.edge_count(), 4);
        output.snapshot().communities
    };

    let pair = |a: &str, b: &str| vec![a.to_string(), b.to_string()];
    assert_eq!(
        communities(EvidenceWeight::EvidenceCount),
        vec![pair("A", "B"), pair("C", "D")]
    );
    assert_eq!(
        communities(EvidenceWeight::Belief),
        vec![pair("A", "C"), pair("B", "D")]
    );
}

/// A graph built directly from tuples partitions the same as through the pipeline
#[test]
fn test_direct_build_matches_pipeline() {
    let tuples = vec![
        RelationTuple::new("A", "B", 2, 0.5, StatementType::Complex),
        RelationTuple::new("B", "C", 2, 0.5, StatementType::Complex),
    ];
    let (graph, _) = build_graph(&tuples);

    let config = PipelineConfig::default();
    let direct = LeidenPartitioner::new(config.community.clone(), config.evidence_weight, config.seed)
        .partition(&graph)
        .unwrap();

    let output = Pipeline::new(config)
        .run(&[complex("A", "B", 2), complex("B", "C", 2)])
        .unwrap();
    assert_eq!(direct, output.partition);
}

/// Hitting the iteration cap still yields positions and a warning
#[test]
fn test_non_convergence_is_a_warning() {
    let config = PipelineConfig {
        layout: LayoutConfig {
            max_iterations: 2,
            tolerance: 1e-15,
            ..Default::default()
        },
        ..Default::default()
    };

    let output = Pipeline::new(config)
        .run(&[complex("A", "B", 2), complex("C", "D", 2)])
        .unwrap();
    assert_eq!(output.report.warnings().count(), 1);
    assert!(output.graph.nodes().iter().all(|n| n.position.is_some()));
}
