//! Navigation graph over mission waypoints.
//!
//! Undirected, weighted; every node carries its position and waypoint type.
//! Edge weights are cached at build time for a standing start and recomputed
//! through the cost model when a planner supplies a live speed.

use std::collections::BTreeMap;

use crate::cost::CostModel;
use crate::models::{Waypoint, WaypointType};
use crate::spatial::{haversine_distance, GeoPoint};

/// One graph vertex with its position and role.
#[derive(Debug, Clone)]
pub struct NavNode {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    pub waypoint_type: WaypointType,
}

impl NavNode {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon, self.altitude_m)
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint {
            lat: self.lat,
            lon: self.lon,
            altitude_m: self.altitude_m,
            name: None,
            waypoint_type: self.waypoint_type,
        }
    }

    pub fn is_ground(&self) -> bool {
        self.waypoint_type.is_ground()
    }
}

/// Waypoint graph borrowed by the planners. Sorted adjacency keeps neighbor
/// iteration, and therefore planning, deterministic.
pub struct NavGraph<'a> {
    cost: &'a CostModel<'a>,
    nodes: BTreeMap<String, NavNode>,
    adjacency: BTreeMap<String, BTreeMap<String, f64>>,
}

impl<'a> NavGraph<'a> {
    pub fn new(cost: &'a CostModel<'a>) -> Self {
        Self {
            cost,
            nodes: BTreeMap::new(),
            adjacency: BTreeMap::new(),
        }
    }

    pub fn cost_model(&self) -> &CostModel<'a> {
        self.cost
    }

    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        lat: f64,
        lon: f64,
        altitude_m: f64,
        waypoint_type: WaypointType,
    ) {
        let id = id.into();
        self.nodes.insert(
            id.clone(),
            NavNode {
                id: id.clone(),
                lat,
                lon,
                altitude_m,
                waypoint_type,
            },
        );
        self.adjacency.entry(id).or_default();
    }

    /// Insert an undirected edge with its cached standing-start weight.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: f64) {
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), weight);
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string(), weight);
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|edges| edges.contains_key(b))
    }

    pub fn node(&self, id: &str) -> Option<&NavNode> {
        self.nodes.get(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &String> {
        self.adjacency.get(id).into_iter().flat_map(|m| m.keys())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|m| m.len()).sum::<usize>() / 2
    }

    /// Weight of the edge `a -> b`. The cached weight answers standing-start
    /// queries; a live `current_speed` reruns the cost model for
    /// inertia-aware weighting. Missing edges weigh infinity.
    pub fn edge_weight(&self, a: &str, b: &str, current_speed: f64) -> f64 {
        let Some(cached) = self.adjacency.get(a).and_then(|edges| edges.get(b)) else {
            return f64::INFINITY;
        };

        if current_speed > 0.0 {
            if let (Some(from), Some(to)) = (self.nodes.get(a), self.nodes.get(b)) {
                return self.cost.cost(from.point(), to.point(), current_speed);
            }
        }

        *cached
    }
}

/// Builds waypoint graphs for one aircraft.
pub struct GraphBuilder<'a> {
    cost: &'a CostModel<'a>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(cost: &'a CostModel<'a>) -> Self {
        Self { cost }
    }

    /// Fully connect the waypoint list: one node per waypoint (`wp_i`), an
    /// edge for every unordered pair that is feasible and within
    /// `max_distance_m` horizontally. Ground flags are inferred from the
    /// waypoint type.
    pub fn build_waypoint_graph(
        &self,
        waypoints: &[Waypoint],
        max_distance_m: Option<f64>,
    ) -> NavGraph<'a> {
        let mut graph = NavGraph::new(self.cost);

        for (idx, wp) in waypoints.iter().enumerate() {
            graph.add_node(
                format!("wp_{idx}"),
                wp.lat,
                wp.lon,
                wp.altitude_m,
                wp.waypoint_type,
            );
        }

        for (i, wp1) in waypoints.iter().enumerate() {
            for (j, wp2) in waypoints.iter().enumerate().skip(i + 1) {
                if let Some(limit) = max_distance_m {
                    let horizontal = haversine_distance(wp1.lat, wp1.lon, wp2.lat, wp2.lon);
                    if horizontal > limit {
                        continue;
                    }
                }

                let (ok, _) = self.cost.feasible(
                    wp1.point(),
                    wp2.point(),
                    wp1.waypoint_type.is_ground(),
                    wp2.waypoint_type.is_ground(),
                );
                if !ok {
                    continue;
                }

                let weight = self.cost.cost(wp1.point(), wp2.point(), 0.0);
                graph.add_edge(&format!("wp_{i}"), &format!("wp_{j}"), weight);
            }
        }

        graph
    }
}
