//! Theta*: any-angle planning with line-of-sight shortcuts.
//!
//! Same frontier as A*, but each relaxation first tries to reach the
//! neighbour straight from the current node's parent. Shortcut edges are
//! priced through the cost model at the parent's speed, so long straight
//! runs profit from kept momentum.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::graph::NavGraph;
use crate::models::{Waypoint, WaypointType};
use crate::spatial::{distance_3d, haversine_distance};

use super::{estimate_arrival_speed, FloatOrd, OpenNode, Planner};

/// Line-of-sight shortcuts are limited to this horizontal length (meters).
const MAX_LINE_OF_SIGHT_M: f64 = 5000.0;
/// Shortcuts below this length skip the feasibility probe.
const NEAR_LINE_OF_SIGHT_M: f64 = 100.0;

/// Segments longer than this get interpolated intermediate waypoints.
const SMOOTHING_THRESHOLD_M: f64 = 300.0;
/// Target spacing of interpolated waypoints.
const SMOOTHING_SEGMENT_M: f64 = 250.0;
/// Upper bound of interpolated waypoints per segment.
const MAX_INTERMEDIATE: usize = 5;

pub struct ThetaStar<'g, 'a> {
    graph: &'g NavGraph<'a>,
}

impl<'g, 'a> ThetaStar<'g, 'a> {
    pub fn new(graph: &'g NavGraph<'a>) -> Self {
        Self { graph }
    }

    fn heuristic(&self, from: &str, to: &str) -> f64 {
        match (self.graph.node(from), self.graph.node(to)) {
            (Some(a), Some(b)) => distance_3d(a.point(), b.point()),
            _ => f64::INFINITY,
        }
    }

    /// The straight segment between two nodes is usable when it is short
    /// enough and passes the cost model's feasibility check.
    fn line_of_sight(&self, from: &str, to: &str) -> bool {
        let (Some(a), Some(b)) = (self.graph.node(from), self.graph.node(to)) else {
            return false;
        };

        let horizontal = haversine_distance(a.lat, a.lon, b.lat, b.lon);
        if horizontal < NEAR_LINE_OF_SIGHT_M {
            return true;
        }
        if horizontal > MAX_LINE_OF_SIGHT_M {
            return false;
        }

        let (ok, _) = self
            .graph
            .cost_model()
            .feasible(a.point(), b.point(), a.is_ground(), b.is_ground());
        ok
    }

    /// Cost of the straight segment between two nodes at the given speed.
    pub fn direct_cost(&self, from: &str, to: &str, current_speed: f64) -> f64 {
        match (self.graph.node(from), self.graph.node(to)) {
            (Some(a), Some(b)) => self
                .graph
                .cost_model()
                .cost(a.point(), b.point(), current_speed),
            _ => f64::INFINITY,
        }
    }
}

impl Planner for ThetaStar<'_, '_> {
    fn find_path(&mut self, start: &str, goal: &str) -> Option<Vec<String>> {
        if !self.graph.has_node(start) || !self.graph.has_node(goal) {
            return None;
        }

        let max_speed = self.graph.cost_model().aircraft().max_speed_mps;

        let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        open_set.push(Reverse(OpenNode {
            f_score: FloatOrd(self.heuristic(start, goal)),
            id: start.to_string(),
        }));

        let mut came_from: HashMap<String, String> = HashMap::new();
        let mut g_score: HashMap<String, f64> = HashMap::new();
        g_score.insert(start.to_string(), 0.0);
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

            let parent = came_from.get(&current_id).cloned();

            let neighbor_ids: Vec<String> = self.graph.neighbors(&current_id).cloned().collect();
            for neighbor_id in neighbor_ids {
                if closed_set.contains(&neighbor_id) {
                    continue;
                }

                let shortcut = parent
                    .as_deref()
                    .filter(|p| self.line_of_sight(p, &neighbor_id))
                    .map(String::from);

                let (via, tentative_g, arrival_speed) = if let Some(parent_id) = shortcut {
                    let parent_speed = node_speed.get(&parent_id).copied().unwrap_or(0.0);
                    let g = g_score.get(&parent_id).copied().unwrap_or(f64::INFINITY)
                        + self.direct_cost(&parent_id, &neighbor_id, parent_speed);

                    let horizontal = match (self.graph.node(&parent_id), self.graph.node(&neighbor_id))
                    {
                        (Some(a), Some(b)) => haversine_distance(a.lat, a.lon, b.lat, b.lon),
                        _ => 0.0,
                    };
                    let speed = estimate_arrival_speed(max_speed, parent_speed, horizontal);
                    (parent_id, g, speed)
                } else {
                    let current_speed = node_speed.get(&current_id).copied().unwrap_or(0.0);
                    let g = g_score.get(&current_id).copied().unwrap_or(f64::INFINITY)
                        + self
                            .graph
                            .edge_weight(&current_id, &neighbor_id, current_speed);

                    let horizontal = match (self.graph.node(&current_id), self.graph.node(&neighbor_id))
                    {
                        (Some(a), Some(b)) => haversine_distance(a.lat, a.lon, b.lat, b.lon),
                        _ => 0.0,
                    };
                    let speed = estimate_arrival_speed(max_speed, current_speed, horizontal);
                    (current_id.clone(), g, speed)
                };

                if tentative_g < g_score.get(&neighbor_id).copied().unwrap_or(f64::INFINITY) {
                    came_from.insert(neighbor_id.clone(), via);
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

    /// Convert to waypoints, inserting smoothstep-interpolated intermediates
    /// on long segments so the flight controller gets a curved track.
    fn to_waypoints(&self, path: &[String]) -> Vec<Waypoint> {
        if path.len() < 2 {
            return path
                .iter()
                .filter_map(|id| self.graph.node(id))
                .map(|n| n.waypoint())
                .collect();
        }

        let min_altitude = self.graph.cost_model().aircraft().min_altitude_m;
        let mut waypoints = Vec::new();

        for i in 0..path.len() - 1 {
            let (Some(a), Some(b)) = (self.graph.node(&path[i]), self.graph.node(&path[i + 1]))
            else {
                continue;
            };
            let wp1 = a.waypoint();
            let wp2 = b.waypoint();

            if i == 0 {
                waypoints.push(wp1.clone());
            }

            let distance = distance_3d(a.point(), b.point());
            if distance > SMOOTHING_THRESHOLD_M {
                let num_intermediate = ((distance / SMOOTHING_SEGMENT_M) as usize)
                    .clamp(1, MAX_INTERMEDIATE);
                let either_ground =
                    wp1.waypoint_type.is_ground() || wp2.waypoint_type.is_ground();

                for j in 1..=num_intermediate {
                    let t = j as f64 / (num_intermediate + 1) as f64;
                    // ease-in-out for natural motion between fixes
                    let smooth_t = t * t * (3.0 - 2.0 * t);

                    let lat = wp1.lat + (wp2.lat - wp1.lat) * smooth_t;
                    let lon = wp1.lon + (wp2.lon - wp1.lon) * smooth_t;
                    let mut altitude = wp1.altitude_m + (wp2.altitude_m - wp1.altitude_m) * smooth_t;

                    if !either_ground {
                        altitude = altitude.max(min_altitude);
                    }

                    waypoints.push(Waypoint {
                        lat,
                        lon,
                        altitude_m: altitude,
                        name: None,
                        waypoint_type: WaypointType::Intermediate,
                    });
                }
            }

            waypoints.push(wp2);
        }

        waypoints
    }
}
