//! Graph-search planners: A*, Theta* and D* Lite.
//!
//! All three consume the same waypoint graph and cost oracle, track a
//! per-node speed estimate for inertia-aware edge weighting, and expose the
//! same `find_path` / `find_path_via` / `to_waypoints` surface.

mod astar;
mod dstar;
mod thetastar;

pub use astar::AStar;
pub use dstar::DStarLite;
pub use thetastar::ThetaStar;

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::graph::NavGraph;
use crate::models::Waypoint;

/// Which planner to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Astar,
    Thetastar,
    Dstar,
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "astar" => Ok(Algorithm::Astar),
            "thetastar" => Ok(Algorithm::Thetastar),
            "dstar" => Ok(Algorithm::Dstar),
            other => Err(format!("unknown algorithm: {other}")),
        }
    }
}

/// Common planner interface over a borrowed waypoint graph.
pub trait Planner {
    /// Node sequence from start to goal, or None when unreachable.
    fn find_path(&mut self, start: &str, goal: &str) -> Option<Vec<String>>;

    /// Visit the given nodes in order, concatenating the per-pair paths and
    /// de-duplicating each join node.
    fn find_path_via(&mut self, start: &str, via: &[String]) -> Option<Vec<String>> {
        if via.is_empty() {
            return Some(vec![start.to_string()]);
        }

        let mut full_path: Vec<String> = Vec::new();
        let mut current = start.to_string();

        for waypoint in via {
            let segment = self.find_path(&current, waypoint)?;
            if full_path.is_empty() {
                full_path.extend(segment);
            } else {
                full_path.extend(segment.into_iter().skip(1));
            }
            current = waypoint.clone();
        }

        Some(full_path)
    }

    /// Materialize a node sequence as route waypoints.
    fn to_waypoints(&self, path: &[String]) -> Vec<Waypoint>;
}

/// Total-ordered f64 for priority queues.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FloatOrd(pub f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Frontier entry ordered by f-score, ties broken by node id so runs are
/// reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenNode {
    pub f_score: FloatOrd,
    pub id: String,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Arrival speed after covering `horizontal_m` starting at `current_speed`,
/// accelerating at max_speed/5 and saturating at max_speed.
pub(crate) fn estimate_arrival_speed(
    max_speed: f64,
    current_speed: f64,
    horizontal_m: f64,
) -> f64 {
    if max_speed <= 0.0 || horizontal_m <= 0.0 {
        return current_speed;
    }
    let acceleration = max_speed / 5.0;
    let time_to_travel = horizontal_m / max_speed;
    let speed_gain = (acceleration * time_to_travel).min(max_speed - current_speed);
    (current_speed + speed_gain.max(0.0)).min(max_speed)
}

pub(crate) fn nodes_to_waypoints(graph: &NavGraph<'_>, path: &[String]) -> Vec<Waypoint> {
    path.iter()
        .filter_map(|id| graph.node(id))
        .map(|node| node.waypoint())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_speed_saturates_at_max() {
        let v = estimate_arrival_speed(15.0, 0.0, 10_000.0);
        assert!((v - 15.0).abs() < 1e-9);
    }

    #[test]
    fn arrival_speed_grows_with_distance() {
        let short = estimate_arrival_speed(15.0, 0.0, 50.0);
        let long = estimate_arrival_speed(15.0, 0.0, 200.0);
        assert!(short > 0.0);
        assert!(long > short);
    }

    #[test]
    fn algorithm_parses_from_str() {
        assert_eq!("astar".parse::<Algorithm>().unwrap(), Algorithm::Astar);
        assert_eq!(
            "thetastar".parse::<Algorithm>().unwrap(),
            Algorithm::Thetastar
        );
        assert_eq!("dstar".parse::<Algorithm>().unwrap(), Algorithm::Dstar);
        assert!("dijkstra".parse::<Algorithm>().is_err());
    }
}
