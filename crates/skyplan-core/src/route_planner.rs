//! Single-aircraft planning pipeline: graph build, target ordering,
//! pathfinding and landing synthesis.

use tracing::debug;

use crate::cost::CostModel;
use crate::graph::GraphBuilder;
use crate::landing::apply_landing;
use crate::models::{AircraftSpec, FinishPointType, Mission, Route, Waypoint, WaypointType};
use crate::ordering::{optimize_order, OptimizationMetric};
use crate::planners::{AStar, Algorithm, DStarLite, Planner, ThetaStar};
use crate::weather::WeatherManager;

pub struct RoutePlanner<'a> {
    mission: &'a Mission,
    weather: &'a WeatherManager,
}

impl<'a> RoutePlanner<'a> {
    pub fn new(mission: &'a Mission, weather: &'a WeatherManager) -> Self {
        Self { mission, weather }
    }

    /// Plan one aircraft's route over the mission's targets, or None when no
    /// feasible path exists.
    pub fn plan_single_route(
        &self,
        aircraft: &AircraftSpec,
        algorithm: Algorithm,
        metric: OptimizationMetric,
    ) -> Option<Route> {
        if self.mission.target_points.is_empty() {
            return None;
        }

        let finish_point = self.resolve_finish_point();

        let mut all_waypoints: Vec<Waypoint> = Vec::new();
        if let Some(depot) = &self.mission.depot {
            all_waypoints.push(depot.clone());
        }
        all_waypoints.extend(self.mission.target_points.iter().cloned());

        let finish_idx = finish_point.map(|finish| {
            all_waypoints
                .iter()
                .position(|wp| wp == finish)
                .unwrap_or_else(|| {
                    all_waypoints.push(finish.clone());
                    all_waypoints.len() - 1
                })
        });

        let cost = CostModel::new(aircraft, &self.mission.constraints, self.weather);
        let builder = GraphBuilder::new(&cost);
        let graph = builder.build_waypoint_graph(&all_waypoints, Some(aircraft.max_range()));

        debug!(
            aircraft = %aircraft.name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "waypoint graph built"
        );

        let start_node = "wp_0".to_string();
        let first_target = usize::from(self.mission.depot.is_some());
        let mut target_nodes: Vec<String> = (first_target.max(1)
            ..first_target + self.mission.target_points.len())
            .map(|i| format!("wp_{i}"))
            .collect();

        if target_nodes.len() > 1 {
            target_nodes = optimize_order(&graph, &start_node, &target_nodes, aircraft, metric);
        }

        // for the last-target policy the route simply ends on the final
        // target; otherwise the finish node closes the tour
        if self.mission.finish_point_type != FinishPointType::LastTarget {
            if let Some(idx) = finish_idx {
                target_nodes.push(format!("wp_{idx}"));
            }
        }

        let mut planner: Box<dyn Planner + '_> = match algorithm {
            Algorithm::Thetastar => Box::new(ThetaStar::new(&graph)),
            Algorithm::Dstar => Box::new(DStarLite::new(&graph)),
            Algorithm::Astar => Box::new(AStar::new(&graph)),
        };

        let path = planner.find_path_via(&start_node, &target_nodes)?;
        let mut waypoints = planner.to_waypoints(&path);

        if self.mission.depot.is_some() {
            if let Some(first) = waypoints.first_mut() {
                first.waypoint_type = WaypointType::Depot;
            }
        }

        apply_landing(&mut waypoints, aircraft, self.mission);

        let mut route = Route::new(waypoints, aircraft.name.clone());
        route.compute_metrics(aircraft, Some(self.weather));
        Some(route)
    }

    fn resolve_finish_point(&self) -> Option<&Waypoint> {
        match self.mission.finish_point_type {
            FinishPointType::Depot if self.mission.depot.is_some() => self.mission.depot.as_ref(),
            FinishPointType::Custom if self.mission.finish_point.is_some() => {
                self.mission.finish_point.as_ref()
            }
            // legacy behavior: an unset finish falls back to the depot when
            // the mission requires returning
            _ if self.mission.constraints.require_return_to_depot => self.mission.depot.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LandingMode;

    fn aircraft() -> AircraftSpec {
        AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap()
    }

    fn waypoint(lat: f64, lon: f64, alt: f64, ty: WaypointType) -> Waypoint {
        Waypoint::new(lat, lon, alt, ty).unwrap()
    }

    fn basic_mission() -> Mission {
        let mut mission = Mission::new("pipeline-test", vec![aircraft()]);
        mission.set_depot(waypoint(49.99, 29.99, 0.0, WaypointType::Depot));
        mission.add_target(waypoint(50.00, 30.00, 50.0, WaypointType::Target));
        mission.add_target(waypoint(50.01, 30.01, 60.0, WaypointType::Target));
        mission.add_target(waypoint(50.02, 30.00, 55.0, WaypointType::Target));
        mission
    }

    #[test]
    fn round_trip_route_starts_and_ends_at_depot() {
        let mission = basic_mission();
        let weather = WeatherManager::disabled();
        let planner = RoutePlanner::new(&mission, &weather);

        let route = planner
            .plan_single_route(
                &mission.fleet[0],
                Algorithm::Astar,
                OptimizationMetric::Distance,
            )
            .unwrap();

        assert_eq!(
            route.waypoints.first().unwrap().waypoint_type,
            WaypointType::Depot
        );
        assert_eq!(
            route.waypoints.last().unwrap().waypoint_type,
            WaypointType::Depot
        );
        assert!(route.waypoints.len() >= 5);
        assert!(route.metrics.is_some());
    }

    #[test]
    fn last_target_policy_ends_on_a_target_turned_finish() {
        let mut mission = basic_mission();
        mission.finish_point_type = FinishPointType::LastTarget;
        mission.landing_mode = LandingMode::Gradual;
        let weather = WeatherManager::disabled();
        let planner = RoutePlanner::new(&mission, &weather);

        let route = planner
            .plan_single_route(
                &mission.fleet[0],
                Algorithm::Astar,
                OptimizationMetric::Distance,
            )
            .unwrap();

        assert_eq!(
            route.waypoints.last().unwrap().waypoint_type,
            WaypointType::Finish
        );
        // the depot appears once, at the start
        let depots = route
            .waypoints
            .iter()
            .filter(|wp| wp.waypoint_type == WaypointType::Depot)
            .count();
        assert_eq!(depots, 1);
    }

    #[test]
    fn no_targets_means_no_route() {
        let mut mission = basic_mission();
        mission.target_points.clear();
        let weather = WeatherManager::disabled();
        let planner = RoutePlanner::new(&mission, &weather);
        assert!(planner
            .plan_single_route(
                &mission.fleet[0],
                Algorithm::Astar,
                OptimizationMetric::Distance
            )
            .is_none());
    }

    #[test]
    fn theta_star_pipeline_produces_intermediates_on_long_legs() {
        let mission = basic_mission();
        let weather = WeatherManager::disabled();
        let planner = RoutePlanner::new(&mission, &weather);

        let route = planner
            .plan_single_route(
                &mission.fleet[0],
                Algorithm::Thetastar,
                OptimizationMetric::Distance,
            )
            .unwrap();

        // the legs here are >1km, so interpolation must have kicked in
        assert!(route
            .waypoints
            .iter()
            .any(|wp| wp.waypoint_type == WaypointType::LandingSegment
                || wp.waypoint_type == WaypointType::Intermediate));
    }
}
