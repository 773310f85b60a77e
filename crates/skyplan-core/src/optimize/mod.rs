//! Metaheuristic route refinement: genetic, ant-colony and particle-swarm
//! variants of a TSP-like reorder of the route's middle section.
//!
//! All three keep the first and last waypoint fixed and share one rule: an
//! ordering that puts a waypoint inside a no-fly zone, or crosses one within
//! its altitude band, costs infinity. If no finite-cost ordering is found the
//! original route is returned unchanged.

mod aco;
mod genetic;
mod pso;

pub use aco::AcoOptimizer;
pub use genetic::GeneticOptimizer;
pub use pso::PsoOptimizer;

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Mission, Route, Waypoint};
use crate::zones::MissionConstraints;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationAlgorithm {
    #[default]
    None,
    Genetic,
    Aco,
    Pso,
}

impl FromStr for OptimizationAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(OptimizationAlgorithm::None),
            "genetic" => Ok(OptimizationAlgorithm::Genetic),
            "aco" => Ok(OptimizationAlgorithm::Aco),
            "pso" => Ok(OptimizationAlgorithm::Pso),
            other => Err(format!("unknown optimization algorithm: {other}")),
        }
    }
}

/// True when any waypoint sits inside a zone or any consecutive pair crosses
/// a zone within its altitude band.
pub(crate) fn violates_zones(
    waypoints: &[Waypoint],
    constraints: Option<&MissionConstraints>,
) -> bool {
    let Some(constraints) = constraints else {
        return false;
    };
    if constraints.no_fly_zones.is_empty() {
        return false;
    }

    for wp in waypoints {
        for zone in &constraints.no_fly_zones {
            if zone.contains_point(wp.lat, wp.lon, wp.altitude_m) {
                return true;
            }
        }
    }

    for pair in waypoints.windows(2) {
        for zone in &constraints.no_fly_zones {
            if zone.crosses_segment(
                pair[0].lat,
                pair[0].lon,
                pair[0].altitude_m,
                pair[1].lat,
                pair[1].lon,
                pair[1].altitude_m,
            ) {
                return true;
            }
        }
    }

    false
}

/// Runs the chosen metaheuristic over every route of a mission.
pub struct MissionOptimizer<'a> {
    mission: &'a Mission,
    seed: u64,
}

impl<'a> MissionOptimizer<'a> {
    pub fn new(mission: &'a Mission, seed: u64) -> Self {
        Self { mission, seed }
    }

    /// Refine all routes; every aircraft present going in comes out again,
    /// falling back to its unrefined route when refinement does not apply.
    pub fn optimize_routes(&self, algorithm: OptimizationAlgorithm) -> BTreeMap<String, Route> {
        let mut optimized = BTreeMap::new();

        for (aircraft_name, route) in &self.mission.routes {
            let Some(aircraft) = self.mission.aircraft(aircraft_name) else {
                optimized.insert(aircraft_name.clone(), route.clone());
                continue;
            };

            if route.waypoints.len() <= 2 || algorithm == OptimizationAlgorithm::None {
                optimized.insert(aircraft_name.clone(), route.clone());
                continue;
            }

            let constraints = Some(&self.mission.constraints);
            let refined = match algorithm {
                OptimizationAlgorithm::Aco => {
                    AcoOptimizer::new(route, aircraft, constraints, self.seed).optimize()
                }
                OptimizationAlgorithm::Pso => {
                    PsoOptimizer::new(route, aircraft, constraints, self.seed).optimize()
                }
                OptimizationAlgorithm::Genetic | OptimizationAlgorithm::None => {
                    GeneticOptimizer::new(route, aircraft, constraints, self.seed).optimize()
                }
            };

            debug!(
                aircraft = %aircraft_name,
                algorithm = ?algorithm,
                waypoints = refined.waypoints.len(),
                "route refinement finished"
            );
            optimized.insert(aircraft_name.clone(), refined);
        }

        optimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WaypointType;
    use crate::zones::NoFlyZone;

    fn waypoint(lat: f64, lon: f64, alt: f64) -> Waypoint {
        Waypoint::new(lat, lon, alt, WaypointType::Target).unwrap()
    }

    #[test]
    fn zone_violation_detects_contained_waypoint() {
        let mut constraints = MissionConstraints::default();
        constraints.add_no_fly_zone(NoFlyZone::polygon(
            vec![
                [49.998, 29.998],
                [49.998, 30.002],
                [50.002, 30.002],
                [50.002, 29.998],
                [49.998, 29.998],
            ],
            0.0,
            200.0,
        ));

        let inside = vec![waypoint(50.0, 30.0, 50.0)];
        assert!(violates_zones(&inside, Some(&constraints)));

        let crossing = vec![waypoint(49.99, 30.0, 50.0), waypoint(50.01, 30.0, 50.0)];
        assert!(violates_zones(&crossing, Some(&constraints)));

        let clear = vec![waypoint(49.99, 30.01, 50.0), waypoint(50.01, 30.01, 50.0)];
        assert!(!violates_zones(&clear, Some(&constraints)));
        assert!(!violates_zones(&inside, None));
    }
}
