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

//! Community Layout Engine
//!
//! Two phases, always run in order on a completed partition:
//!
//! 1. **Initial placement**: community `i` of `k` is centred on the unit
//!    circle at angle `2πi/k`; its nodes are scattered uniformly over a disk
//!    of radius [`CLUSTER_RADIUS`] around that centre.
//! 2. **Refinement**: Fruchterman-Reingold iteration starting from those
//!    positions. Positions are never re-centred or rescaled afterwards, so
//!    the community structure of phase 1 survives as separated clusters.

use crate::community::Partition;
use crate::config::{EvidenceWeight, LayoutConfig};
use crate::error::{RelGraphError, Result};
use crate::graph::{NodeIndex, Position, RelationGraph};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

/// Radius of the disk each community is scattered over
pub const CLUSTER_RADIUS: f64 = 1.0;

/// Lower bound on pairwise distance in force computations
const MIN_DISTANCE: f64 = 0.01;

/// Refinement stopped at its iteration cap before reaching the tolerance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonConvergenceWarning {
    pub iterations: usize,
    pub displacement: f64,
    pub tolerance: f64,
}

impl fmt::Display for NonConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "layout did not converge after {} iterations (displacement {:.3e} > tolerance {:.3e})",
            self.iterations, self.displacement, self.tolerance
        )
    }
}

/// Summary of one layout run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutReport {
    /// Refinement iterations performed
    pub iterations: usize,
    pub converged: bool,
    /// Step norm divided by node count at the last iteration
    pub final_displacement: f64,
    /// Phase-1 centre of each community
    pub centers: Vec<Position>,
    pub warning: Option<NonConvergenceWarning>,
}

#[derive(Debug, Clone, Copy)]
struct Refinement {
    iterations: usize,
    converged: bool,
    displacement: f64,
}

/// Places nodes by community, then refines with a force simulation
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
    weight: EvidenceWeight,
    seed: u64,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig, weight: EvidenceWeight, seed: u64) -> Self {
        Self {
            config,
            weight,
            seed,
        }
    }

    /// Centres of `k` communities, evenly spaced on the unit circle
    pub fn community_centers(k: usize) -> Vec<Position> {
        (0..k)
            .map(|i| {
                let angle = TAU * i as f64 / k as f64;
                Position::new(angle.cos(), angle.sin())
            })
            .collect()
    }

    /// Phase 1: scatter each node uniformly inside its community's disk
    pub fn initial_positions(&self, partition: &Partition) -> Vec<Position> {
        let centers = Self::community_centers(partition.len());
        let mut rng = StdRng::seed_from_u64(self.seed);

        partition
            .membership
            .iter()
            .map(|&community| {
                let center = centers[community];
                // sqrt keeps the density uniform over the disk area
                let r = CLUSTER_RADIUS * rng.gen::<f64>().sqrt();
                let theta = rng.gen_range(0.0..TAU);
                Position::new(center.x + r * theta.cos(), center.y + r * theta.sin())
            })
            .collect()
    }

    /// Run both phases and write positions and communities into the graph
    pub fn run(&self, graph: &mut RelationGraph, partition: &Partition) -> Result<LayoutReport> {
        if graph.is_empty() {
            return Err(RelGraphError::EmptyGraph);
        }
        if partition.membership.len() != graph.node_count()
            || partition.membership.iter().any(|&c| c >= partition.len())
        {
            return Err(RelGraphError::PartitionMismatch {
                nodes: graph.node_count(),
                assigned: partition.membership.len(),
            });
        }

        let mut positions = self.initial_positions(partition);
        let outcome = self.refine(graph, &mut positions);

        for (idx, (&position, &community)) in
            positions.iter().zip(&partition.membership).enumerate()
        {
            graph.set_position(idx, position);
            graph.set_community(idx, community);
        }

        let warning = (!outcome.converged).then(|| NonConvergenceWarning {
            iterations: outcome.iterations,
            displacement: outcome.displacement,
            tolerance: self.config.tolerance,
        });
        if let Some(w) = &warning {
            tracing::warn!("{}", w);
        } else {
            tracing::debug!(iterations = outcome.iterations, "Layout converged");
        }

        Ok(LayoutReport {
            iterations: outcome.iterations,
            converged: outcome.converged,
            final_displacement: outcome.displacement,
            centers: Self::community_centers(partition.len()),
            warning,
        })
    }

    /// Phase 2: Fruchterman-Reingold refinement in place
    fn refine(&self, graph: &RelationGraph, positions: &mut [Position]) -> Refinement {
        let n = positions.len();
        let k = self
            .config
            .spring_constant
            .unwrap_or_else(|| 1.0 / (n as f64).sqrt());

        let springs = normalized_springs(graph, self.weight);

        let mut temperature = initial_temperature(positions);
        let cooling = temperature / (self.config.max_iterations as f64 + 1.0);

        let mut displacement = vec![(0.0f64, 0.0f64); n];
        let mut outcome = Refinement {
            iterations: 0,
            converged: false,
            displacement: f64::INFINITY,
        };

        for iteration in 1..=self.config.max_iterations {
            displacement.fill((0.0, 0.0));

            // Repulsion between all pairs
            for i in 0..n {
                for j in (i + 1)..n {
                    let dx = positions[i].x - positions[j].x;
                    let dy = positions[i].y - positions[j].y;
                    let distance = dx.hypot(dy).max(MIN_DISTANCE);
                    let factor = k * k / (distance * distance);
                    displacement[i].0 += dx * factor;
                    displacement[i].1 += dy * factor;
                    displacement[j].0 -= dx * factor;
                    displacement[j].1 -= dy * factor;
                }
            }

            // Attraction along edges
            for &(a, b, w) in &springs {
                let dx = positions[a].x - positions[b].x;
                let dy = positions[a].y - positions[b].y;
                let distance = dx.hypot(dy).max(MIN_DISTANCE);
                let factor = w * distance / k;
                displacement[a].0 -= dx * factor;
                displacement[a].1 -= dy * factor;
                displacement[b].0 += dx * factor;
                displacement[b].1 += dy * factor;
            }

            let mut step_norm_sq = 0.0;
            for (position, &(fx, fy)) in positions.iter_mut().zip(&displacement) {
                let magnitude = fx.hypot(fy);
                if magnitude <= 0.0 {
                    continue;
                }
                let step = (self.config.damping * magnitude).min(temperature) / magnitude;
                let (sx, sy) = (fx * step, fy * step);
                position.x += sx;
                position.y += sy;
                step_norm_sq += sx * sx + sy * sy;
            }

            temperature -= cooling;
            outcome.iterations = iteration;
            outcome.displacement = step_norm_sq.sqrt() / n as f64;

            if outcome.displacement < self.config.tolerance {
                outcome.converged = true;
                break;
            }
        }

        outcome
    }
}

/// Edge springs with weights scaled into (0, 1]; self-loops and weightless edges dropped
fn normalized_springs(graph: &RelationGraph, key: EvidenceWeight) -> Vec<(NodeIndex, NodeIndex, f64)> {
    let springs: Vec<_> = graph
        .weighted_edges(key)
        .filter(|&(a, b, w)| a != b && w.is_finite() && w > 0.0)
        .collect();

    let max = springs.iter().map(|&(_, _, w)| w).fold(0.0, f64::max);
    springs
        .into_iter()
        .map(|(a, b, w)| (a, b, w / max))
        .collect()
}

/// 10% of the larger side of the bounding box
fn initial_temperature(positions: &[Position]) -> f64 {
    let (min_x, max_x, min_y, max_y) = positions.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, max_x, min_y, max_y), p| {
            (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y))
        },
    );
    let span = (max_x - min_x).max(max_y - min_y);
    if span.is_finite() && span > 0.0 {
        0.1 * span
    } else {
        0.1
    }
}
