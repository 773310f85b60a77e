//! A* over the waypoint graph with per-node speed tracking.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::graph::NavGraph;
use crate::models::Waypoint;
use crate::spatial::distance_3d;

use super::{estimate_arrival_speed, nodes_to_waypoints, FloatOrd, OpenNode, Planner};

pub struct AStar<'g, 'a> {
    graph: &'g NavGraph<'a>,
}

impl<'g, 'a> AStar<'g, 'a> {
    pub fn new(graph: &'g NavGraph<'a>) -> Self {
        Self { graph }
    }

    /// 3D great-circle distance; admissible because distance dominates the
    /// cost model.
    fn heuristic(&self, from: &str, to: &str) -> f64 {
        match (self.graph.node(from), self.graph.node(to)) {
            (Some(a), Some(b)) => distance_3d(a.point(), b.point()),
            _ => f64::INFINITY,
        }
    }
}

impl Planner for AStar<'_, '_> {
    fn find_path(&mut self, start: &str, goal: &str) -> Option<Vec<String>> {
        if !self.graph.has_node(start) || !self.graph.has_node(goal) {
            return None;
        }

        let cost_model = self.graph.cost_model();
        let max_speed = cost_model.aircraft().max_speed_mps;

        let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        open_set.push(Reverse(OpenNode {
            f_score: FloatOrd(self.heuristic(start, goal)),
            id: start.to_string(),
        }));

        let mut came_from: HashMap<String, String> = HashMap::new();
        let mut g_score: HashMap<String, f64> = HashMap::new();
        g_score.insert(start.to_string(), 0.0);

        // Speed estimate on arrival at each node, feeding the inertia-aware
        // edge weights.
        let mut node_speed: HashMap<String, f64> = HashMap::new();
        node_speed.insert(start.to_string(), 0.0);

        let mut closed_set: HashSet<String> = HashSet::new();

        while let Some(Reverse(current)) = open_set.pop() {
            let current_id = current.id;
            if closed_set.contains(&current_id) {
                continue;
            }
            closed_set.insert(current_id.clone());

            if current_id == goal {
                let mut path = vec![current_id.clone()];
                let mut node = current_id;
                while let Some(prev) = came_from.get(&node) {
                    path.push(prev.clone());
                    node = prev.clone();
                }
                path.reverse();
                return Some(path);
            }

            let current_node = self.graph.node(&current_id)?;
            let current_speed = node_speed.get(&current_id).copied().unwrap_or(0.0);

            let neighbor_ids: Vec<String> = self.graph.neighbors(&current_id).cloned().collect();
            for neighbor_id in neighbor_ids {
                if closed_set.contains(&neighbor_id) {
                    continue;
                }
                let Some(neighbor_node) = self.graph.node(&neighbor_id) else {
                    continue;
                };

                // The builder admitted this edge, but weather or constraints
                // may have changed since then.
                let (ok, _) = cost_model.feasible(
                    current_node.point(),
                    neighbor_node.point(),
                    current_node.is_ground(),
                    neighbor_node.is_ground(),
                );
                if !ok {
                    continue;
                }

                let edge_weight = self
                    .graph
                    .edge_weight(&current_id, &neighbor_id, current_speed);
                let tentative_g = g_score.get(&current_id).copied().unwrap_or(f64::INFINITY)
                    + edge_weight;

                if tentative_g < g_score.get(&neighbor_id).copied().unwrap_or(f64::INFINITY) {
                    let horizontal = crate::spatial::haversine_distance(
                        current_node.lat,
                        current_node.lon,
                        neighbor_node.lat,
                        neighbor_node.lon,
                    );
                    let arrival_speed =
                        estimate_arrival_speed(max_speed, current_speed, horizontal);

                    came_from.insert(neighbor_id.clone(), current_id.clone());
                    g_score.insert(neighbor_id.clone(), tentative_g);
                    node_speed.insert(neighbor_id.clone(), arrival_speed);
                    open_set.push(Reverse(OpenNode {
                        f_score: FloatOrd(tentative_g + self.heuristic(&neighbor_id, goal)),
                        id: neighbor_id,
                    }));
                }
            }
        }

        None
    }

    fn to_waypoints(&self, path: &[String]) -> Vec<Waypoint> {
        nodes_to_waypoints(self.graph, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostModel;
    use crate::graph::GraphBuilder;
    use crate::models::{AircraftSpec, WaypointType};
    use crate::weather::WeatherManager;
    use crate::zones::{MissionConstraints, NoFlyZone};

    fn aircraft() -> AircraftSpec {
        AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap()
    }

    fn waypoint(lat: f64, lon: f64, alt: f64, ty: WaypointType) -> crate::models::Waypoint {
        crate::models::Waypoint::new(lat, lon, alt, ty).unwrap()
    }

    #[test]
    fn finds_direct_path() {
        let aircraft = aircraft();
        let constraints = MissionConstraints::default();
        let weather = WeatherManager::disabled();
        let cost = CostModel::new(&aircraft, &constraints, &weather);
        let graph = GraphBuilder::new(&cost).build_waypoint_graph(
            &[
                waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
                waypoint(50.00, 30.00, 50.0, WaypointType::Target),
                waypoint(50.01, 30.01, 60.0, WaypointType::Target),
            ],
            None,
        );

        let mut planner = AStar::new(&graph);
        let path = planner.find_path("wp_0", "wp_2").unwrap();
        assert_eq!(path.first().map(String::as_str), Some("wp_0"));
        assert_eq!(path.last().map(String::as_str), Some("wp_2"));
    }

    #[test]
    fn routes_around_blocked_direct_edge() {
        let aircraft = aircraft();
        let mut constraints = MissionConstraints::default();
        // zone across the straight line between wp_0 and wp_2, below their
        // detour waypoint's path
        constraints.add_no_fly_zone(NoFlyZone::polygon(
            vec![
                [49.998, 30.004],
                [49.998, 30.008],
                [50.002, 30.008],
                [50.002, 30.004],
                [49.998, 30.004],
            ],
            0.0,
            200.0,
        ));
        let weather = WeatherManager::disabled();
        let cost = CostModel::new(&aircraft, &constraints, &weather);
        let graph = GraphBuilder::new(&cost).build_waypoint_graph(
            &[
                waypoint(50.0, 30.0, 50.0, WaypointType::Target),
                waypoint(50.01, 30.006, 50.0, WaypointType::Target),
                waypoint(50.0, 30.012, 50.0, WaypointType::Target),
            ],
            None,
        );

        assert!(!graph.has_edge("wp_0", "wp_2"));
        let mut planner = AStar::new(&graph);
        let path = planner.find_path("wp_0", "wp_2").unwrap();
        assert_eq!(path, vec!["wp_0", "wp_1", "wp_2"]);
    }

    #[test]
    fn multi_target_path_deduplicates_joins() {
        let aircraft = aircraft();
        let constraints = MissionConstraints::default();
        let weather = WeatherManager::disabled();
        let cost = CostModel::new(&aircraft, &constraints, &weather);
        let graph = GraphBuilder::new(&cost).build_waypoint_graph(
            &[
                waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
                waypoint(50.00, 30.00, 50.0, WaypointType::Target),
                waypoint(50.01, 30.01, 60.0, WaypointType::Target),
            ],
            None,
        );

        let mut planner = AStar::new(&graph);
        let path = planner
            .find_path_via("wp_0", &["wp_1".to_string(), "wp_2".to_string()])
            .unwrap();
        assert_eq!(path, vec!["wp_0", "wp_1", "wp_2"]);
    }

    #[test]
    fn unreachable_goal_returns_none() {
        let aircraft = aircraft();
        let constraints = MissionConstraints::default();
        let weather = WeatherManager::disabled();
        let cost = CostModel::new(&aircraft, &constraints, &weather);
        let graph = GraphBuilder::new(&cost).build_waypoint_graph(
            &[
                waypoint(50.0, 30.0, 50.0, WaypointType::Target),
                waypoint(50.001, 30.0, 50.0, WaypointType::Target),
            ],
            None,
        );

        let mut planner = AStar::new(&graph);
        assert!(planner.find_path("wp_0", "wp_7").is_none());
    }

    #[test]
    fn path_cost_is_optimal_at_standing_start() {
        // triangle where the direct edge must beat any two-edge detour
        let aircraft = aircraft();
        let constraints = MissionConstraints::default();
        let weather = WeatherManager::disabled();
        let cost = CostModel::new(&aircraft, &constraints, &weather);
        let graph = GraphBuilder::new(&cost).build_waypoint_graph(
            &[
                waypoint(50.0, 30.0, 50.0, WaypointType::Target),
                waypoint(50.02, 30.02, 50.0, WaypointType::Target),
                waypoint(50.01, 30.0, 50.0, WaypointType::Target),
            ],
            None,
        );

        let mut planner = AStar::new(&graph);
        let path = planner.find_path("wp_0", "wp_1").unwrap();

        let direct: f64 = path
            .windows(2)
            .map(|w| graph.edge_weight(&w[0], &w[1], 0.0))
            .sum();
        let detour = graph.edge_weight("wp_0", "wp_2", 0.0)
            + graph.edge_weight("wp_2", "wp_1", 0.0);
        assert!(direct <= detour + 1.0);
    }
}
