//! Greedy nearest-neighbour ordering of target nodes.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::graph::NavGraph;
use crate::models::AircraftSpec;
use crate::spatial::{distance_3d, haversine_distance};

/// Quantity minimized when ordering targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMetric {
    #[default]
    Distance,
    Energy,
    Time,
}

impl FromStr for OptimizationMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance" => Ok(OptimizationMetric::Distance),
            "energy" => Ok(OptimizationMetric::Energy),
            "time" => Ok(OptimizationMetric::Time),
            other => Err(format!("unknown optimization metric: {other}")),
        }
    }
}

/// Reorder `targets` by repeatedly visiting the cheapest unvisited node
/// under the chosen metric, starting from `start`. Deterministic: ties keep
/// the input order. The finish node is not part of the ordering; the caller
/// appends it afterwards.
pub fn optimize_order(
    graph: &NavGraph<'_>,
    start: &str,
    targets: &[String],
    aircraft: &AircraftSpec,
    metric: OptimizationMetric,
) -> Vec<String> {
    if targets.len() <= 1 {
        return targets.to_vec();
    }

    let mut all_nodes: Vec<&str> = Vec::with_capacity(targets.len() + 1);
    all_nodes.push(start);
    all_nodes.extend(targets.iter().map(String::as_str));

    let mut cost_matrix: HashMap<(&str, &str), f64> = HashMap::new();
    for &node1 in &all_nodes {
        for &node2 in &all_nodes {
            if node1 == node2 {
                continue;
            }
            let (Some(a), Some(b)) = (graph.node(node1), graph.node(node2)) else {
                continue;
            };

            let cost = match metric {
                OptimizationMetric::Energy => {
                    let horizontal = haversine_distance(a.lat, a.lon, b.lat, b.lon);
                    aircraft.estimate_energy(horizontal, b.altitude_m - a.altitude_m)
                }
                OptimizationMetric::Time => {
                    distance_3d(a.point(), b.point()) / aircraft.max_speed_mps
                }
                OptimizationMetric::Distance => distance_3d(a.point(), b.point()),
            };
            cost_matrix.insert((node1, node2), cost);
        }
    }

    let mut visited: Vec<bool> = vec![false; targets.len()];
    let mut current: &str = start;
    let mut ordered = Vec::with_capacity(targets.len());

    while ordered.len() < targets.len() {
        let mut best: Option<(usize, f64)> = None;
        for (idx, target) in targets.iter().enumerate() {
            if visited[idx] {
                continue;
            }
            let cost = cost_matrix
                .get(&(current, target.as_str()))
                .copied()
                .unwrap_or(f64::INFINITY);
            if best.as_ref().is_none_or(|(_, c)| cost < *c) {
                best = Some((idx, cost));
            }
        }

        let Some((idx, _)) = best else {
            break;
        };
        visited[idx] = true;
        ordered.push(targets[idx].clone());
        current = &targets[idx];
    }

    ordered
}
