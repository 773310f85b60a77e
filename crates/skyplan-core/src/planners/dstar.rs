//! D* Lite: incremental shortest path with cheap replanning after edge
//! weight changes.
//!
//! The planner keeps its own copy of the cached edge weights so a replan can
//! perturb them without touching the shared graph. Only `g`, `rhs`, the
//! priority queue and that weight copy are mutated.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::graph::NavGraph;
use crate::models::Waypoint;
use crate::spatial::distance_3d;

use super::{nodes_to_waypoints, FloatOrd, Planner};

/// Priority key: (min(g, rhs) + h + km, min(g, rhs)).
type Key = (FloatOrd, FloatOrd);

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry {
    key: Key,
    id: String,
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.id.cmp(&other.id))
    }
}

pub struct DStarLite<'g, 'a> {
    graph: &'g NavGraph<'a>,
    g: HashMap<String, f64>,
    rhs: HashMap<String, f64>,
    open: BinaryHeap<Reverse<QueueEntry>>,
    /// Own copy of the cached weights, keyed by ordered node pair.
    weights: HashMap<(String, String), f64>,
    km: f64,
    start: Option<String>,
    goal: Option<String>,
}

impl<'g, 'a> DStarLite<'g, 'a> {
    pub fn new(graph: &'g NavGraph<'a>) -> Self {
        Self {
            graph,
            g: HashMap::new(),
            rhs: HashMap::new(),
            open: BinaryHeap::new(),
            weights: HashMap::new(),
            km: 0.0,
            start: None,
            goal: None,
        }
    }

    fn heuristic(&self, from: &str, to: &str) -> f64 {
        match (self.graph.node(from), self.graph.node(to)) {
            (Some(a), Some(b)) => distance_3d(a.point(), b.point()),
            _ => f64::INFINITY,
        }
    }

    fn edge_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    fn weight(&self, a: &str, b: &str) -> f64 {
        self.weights
            .get(&Self::edge_key(a, b))
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    fn g_of(&self, id: &str) -> f64 {
        self.g.get(id).copied().unwrap_or(f64::INFINITY)
    }

    fn rhs_of(&self, id: &str) -> f64 {
        self.rhs.get(id).copied().unwrap_or(f64::INFINITY)
    }

    fn calculate_key(&self, id: &str) -> Key {
        let start = self.start.as_deref().unwrap_or_default();
        let best = self.g_of(id).min(self.rhs_of(id));
        (
            FloatOrd(best + self.heuristic(start, id) + self.km),
            FloatOrd(best),
        )
    }

    fn push(&mut self, id: &str) {
        self.open.push(Reverse(QueueEntry {
            key: self.calculate_key(id),
            id: id.to_string(),
        }));
    }

    fn update_vertex(&mut self, id: &str) {
        if Some(id) != self.goal.as_deref() {
            let mut min_rhs = f64::INFINITY;
            let neighbors: Vec<String> = self.graph.neighbors(id).cloned().collect();
            for neighbor in neighbors {
                let candidate = self.g_of(&neighbor) + self.weight(id, &neighbor);
                if candidate < min_rhs {
                    min_rhs = candidate;
                }
            }
            self.rhs.insert(id.to_string(), min_rhs);
        }

        // Stale queue entries are skipped on pop instead of being removed.
        if self.g_of(id) != self.rhs_of(id) {
            self.push(id);
        }
    }

    fn compute_shortest_path(&mut self) {
        let Some(start) = self.start.clone() else {
            return;
        };

        while let Some(Reverse(entry)) = self.open.peek().cloned() {
            let start_key = self.calculate_key(&start);
            if entry.key >= start_key && self.rhs_of(&start) == self.g_of(&start) {
                break;
            }

            self.open.pop();
            let u = entry.id;

            // entry is stale when the node became consistent since insertion
            if self.g_of(&u) == self.rhs_of(&u) {
                continue;
            }

            let k_new = self.calculate_key(&u);
            if entry.key < k_new {
                self.push(&u);
                continue;
            }

            let neighbors: Vec<String> = self.graph.neighbors(&u).cloned().collect();
            if self.g_of(&u) > self.rhs_of(&u) {
                let rhs = self.rhs_of(&u);
                self.g.insert(u.clone(), rhs);
                for neighbor in &neighbors {
                    self.update_vertex(neighbor);
                }
            } else {
                self.g.insert(u.clone(), f64::INFINITY);
                self.update_vertex(&u);
                for neighbor in &neighbors {
                    self.update_vertex(neighbor);
                }
            }
        }
    }

    fn reconstruct_path(&self) -> Option<Vec<String>> {
        let start = self.start.as_deref()?;
        let goal = self.goal.as_deref()?;

        if self.g_of(start).is_infinite() {
            return None;
        }

        let cost_model = self.graph.cost_model();
        let mut path = vec![start.to_string()];
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.to_string());
        let mut current = start.to_string();

        while current != goal {
            let mut best: Option<(String, f64)> = None;
            let current_node = self.graph.node(&current)?;

            let neighbors: Vec<String> = self.graph.neighbors(&current).cloned().collect();
            for neighbor in neighbors {
                if visited.contains(&neighbor) {
                    continue;
                }
                let Some(neighbor_node) = self.graph.node(&neighbor) else {
                    continue;
                };
                let (ok, _) = cost_model.feasible(
                    current_node.point(),
                    neighbor_node.point(),
                    current_node.is_ground(),
                    neighbor_node.is_ground(),
                );
                if !ok {
                    continue;
                }

                let total = self.g_of(&neighbor) + self.weight(&current, &neighbor);
                if best.as_ref().is_none_or(|(_, cost)| total < *cost) {
                    best = Some((neighbor, total));
                }
            }

            let (next, cost) = best?;
            if cost.is_infinite() {
                return None;
            }
            visited.insert(next.clone());
            path.push(next.clone());
            current = next;
        }

        Some(path)
    }

    /// Update the planner's cached weights after the world changed and
    /// repair only the affected part of the search. `changed_edges` carries
    /// (node, node, new_weight).
    pub fn replan(&mut self, changed_edges: &[(String, String, f64)]) -> Option<Vec<String>> {
        self.start.as_ref()?;

        for (a, b, new_weight) in changed_edges {
            self.weights.insert(Self::edge_key(a, b), *new_weight);
            self.update_vertex(a);
            self.update_vertex(b);
        }

        self.compute_shortest_path();
        self.reconstruct_path()
    }
}

impl Planner for DStarLite<'_, '_> {
    fn find_path(&mut self, start: &str, goal: &str) -> Option<Vec<String>> {
        if !self.graph.has_node(start) || !self.graph.has_node(goal) {
            return None;
        }

        self.start = Some(start.to_string());
        self.goal = Some(goal.to_string());
        self.km = 0.0;
        self.g.clear();
        self.rhs.clear();
        self.open.clear();

        self.weights.clear();
        let ids: Vec<String> = self.graph.node_ids().cloned().collect();
        for id in &ids {
            for neighbor in self.graph.neighbors(id) {
                let key = Self::edge_key(id, neighbor);
                let weight = self.graph.edge_weight(id, neighbor, 0.0);
                self.weights.entry(key).or_insert(weight);
            }
            self.g.insert(id.clone(), f64::INFINITY);
            self.rhs.insert(id.clone(), f64::INFINITY);
        }

        self.rhs.insert(goal.to_string(), 0.0);
        self.push(goal);

        self.compute_shortest_path();
        self.reconstruct_path()
    }

    fn to_waypoints(&self, path: &[String]) -> Vec<Waypoint> {
        nodes_to_waypoints(self.graph, path)
    }
}
