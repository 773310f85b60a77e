//! Fleet assignment: a capacitated VRP over integer-meter distances.
//!
//! The primary solve builds per-vehicle tours with a cheapest-arc sweep
//! under a per-vehicle distance cap, then improves them with local-search
//! moves (relocate, inter-route swap, 2-opt) until converged or the
//! 30-second budget runs out. When construction cannot place every target
//! the solver falls back to a greedy round-robin over targets sorted by
//! distance from the depot.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::models::{AircraftSpec, Mission, Waypoint};
use crate::spatial::haversine_distance;

/// Hard wall-clock budget for the improvement phase.
const SOLVE_TIME_BUDGET: Duration = Duration::from_secs(30);
/// Weight of the tour-length spread in the objective, matching a global
/// span cost coefficient of 100.
const SPAN_COST_COEFFICIENT: i64 = 100;

pub struct VrpAssigner<'a> {
    depot: Option<&'a Waypoint>,
    targets: &'a [Waypoint],
    fleet: &'a [AircraftSpec],
}

impl<'a> VrpAssigner<'a> {
    pub fn new(mission: &'a Mission) -> Self {
        Self {
            depot: mission.depot.as_ref(),
            targets: &mission.target_points,
            fleet: &mission.fleet,
        }
    }

    /// Assign target indices to aircraft. Every aircraft appears in the
    /// result, possibly with an empty list.
    pub fn solve(&self) -> BTreeMap<String, Vec<usize>> {
        if self.targets.is_empty() || self.fleet.is_empty() {
            return BTreeMap::new();
        }

        let matrix = self.distance_matrix();
        let capacity = self.vehicle_capacity(&matrix);

        let mut assignments = match self.cheapest_arc_solve(&matrix, capacity) {
            Some(routes) => {
                let mut map = BTreeMap::new();
                for (vehicle, route) in routes.into_iter().enumerate() {
                    map.insert(self.fleet[vehicle].name.clone(), route);
                }
                map
            }
            None => {
                warn!("VRP construction failed, using greedy round-robin fallback");
                self.greedy_fallback()
            }
        };

        for aircraft in self.fleet {
            assignments.entry(aircraft.name.clone()).or_default();
        }

        self.rebalance_sparse(&mut assignments);
        assignments
    }

    /// (|targets|+1) x (|targets|+1) integer-meter haversine matrix with the
    /// depot at index 0. A missing depot degenerates to a zero row/column.
    fn distance_matrix(&self) -> Vec<Vec<i64>> {
        let mut locations: Vec<(f64, f64)> = Vec::with_capacity(self.targets.len() + 1);
        match self.depot {
            Some(depot) => locations.push((depot.lat, depot.lon)),
            None => locations.push((0.0, 0.0)),
        }
        for target in self.targets {
            locations.push((target.lat, target.lon));
        }

        let n = locations.len();
        let mut matrix = vec![vec![0i64; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j || (self.depot.is_none() && (i == 0 || j == 0)) {
                    continue;
                }
                let (lat1, lon1) = locations[i];
                let (lat2, lon2) = locations[j];
                matrix[i][j] = haversine_distance(lat1, lon1, lat2, lon2) as i64;
            }
        }
        matrix
    }

    /// Per-vehicle tour cap: the larger of the fleet's best range and twice
    /// the longest depot round trip, so one distant target never starves
    /// the solve.
    fn vehicle_capacity(&self, matrix: &[Vec<i64>]) -> i64 {
        let fleet_range = self
            .fleet
            .iter()
            .map(|a| a.max_range() as i64)
            .max()
            .unwrap_or(100_000);

        let mut max_round_trip = 0i64;
        for t in 1..matrix.len() {
            max_round_trip = max_round_trip.max(matrix[0][t] + matrix[t][0]);
        }

        fleet_range.max(max_round_trip * 2)
    }

    /// Cheapest-arc construction followed by time-budgeted local search.
    /// Returns per-vehicle target index lists, or None when some target
    /// cannot be placed within the capacity.
    fn cheapest_arc_solve(&self, matrix: &[Vec<i64>], capacity: i64) -> Option<Vec<Vec<usize>>> {
        let num_vehicles = self.fleet.len();
        let num_targets = self.targets.len();

        let mut routes: Vec<Vec<usize>> = vec![Vec::new(); num_vehicles];
        // tour length from the depot through the vehicle's last stop
        let mut heads: Vec<i64> = vec![0; num_vehicles];
        let mut last: Vec<usize> = vec![0; num_vehicles];
        let mut unassigned: Vec<usize> = (0..num_targets).collect();

        while !unassigned.is_empty() {
            let mut best: Option<(usize, usize, i64)> = None;

            for vehicle in 0..num_vehicles {
                for &target in &unassigned {
                    let node = target + 1;
                    let arc = matrix[last[vehicle]][node];
                    let projected = heads[vehicle] + arc + matrix[node][0];
                    if projected > capacity {
                        continue;
                    }
                    if best.is_none_or(|(_, _, cost)| arc < cost) {
                        best = Some((vehicle, target, arc));
                    }
                }
            }

            let (vehicle, target, arc) = best?;
            heads[vehicle] += arc;
            last[vehicle] = target + 1;
            routes[vehicle].push(target);
            unassigned.retain(|&t| t != target);
        }

        self.improve(&mut routes, matrix, capacity);
        Some(routes)
    }

    /// Tour length including the return to the depot.
    fn route_length(route: &[usize], matrix: &[Vec<i64>]) -> i64 {
        let mut length = 0;
        let mut prev = 0usize;
        for &target in route {
            length += matrix[prev][target + 1];
            prev = target + 1;
        }
        length + matrix[prev][0]
    }

    fn objective(routes: &[Vec<usize>], matrix: &[Vec<i64>]) -> i64 {
        let lengths: Vec<i64> = routes
            .iter()
            .map(|r| Self::route_length(r, matrix))
            .collect();
        let total: i64 = lengths.iter().sum();
        let max = lengths.iter().max().copied().unwrap_or(0);
        let min = lengths.iter().min().copied().unwrap_or(0);
        total + SPAN_COST_COEFFICIENT * (max - min)
    }

    /// Best-improvement passes over relocate, swap and 2-opt moves.
    fn improve(&self, routes: &mut Vec<Vec<usize>>, matrix: &[Vec<i64>], capacity: i64) {
        let deadline = Instant::now() + SOLVE_TIME_BUDGET;
        let mut current = Self::objective(routes, matrix);

        loop {
            if Instant::now() >= deadline {
                debug!("VRP improvement stopped by time budget");
                break;
            }

            let mut improved = false;

            // relocate one target to any position of any route
            'relocate: for from in 0..routes.len() {
                for pos in 0..routes[from].len() {
                    for to in 0..routes.len() {
                        let limit = if to == from {
                            routes[to].len() - 1
                        } else {
                            routes[to].len()
                        };
                        for insert_at in 0..=limit {
                            if to == from && insert_at == pos {
                                continue;
                            }
                            let mut candidate = routes.clone();
                            let target = candidate[from].remove(pos);
                            let clamped_insert_at = insert_at.min(candidate[to].len());
                            candidate[to].insert(clamped_insert_at, target);

                            if Self::route_length(&candidate[to], matrix) > capacity {
                                continue;
                            }
                            let score = Self::objective(&candidate, matrix);
                            if score < current {
                                *routes = candidate;
                                current = score;
                                improved = true;
                                break 'relocate;
                            }
                        }
                    }
                }
            }

            // swap a pair of targets between two routes
            if !improved {
                'swap: for a in 0..routes.len() {
                    for b in a + 1..routes.len() {
                        for i in 0..routes[a].len() {
                            for j in 0..routes[b].len() {
                                let mut candidate = routes.clone();
                                let tmp = candidate[a][i];
                                candidate[a][i] = candidate[b][j];
                                candidate[b][j] = tmp;

                                if Self::route_length(&candidate[a], matrix) > capacity
                                    || Self::route_length(&candidate[b], matrix) > capacity
                                {
                                    continue;
                                }
                                let score = Self::objective(&candidate, matrix);
                                if score < current {
                                    *routes = candidate;
                                    current = score;
                                    improved = true;
                                    break 'swap;
                                }
                            }
                        }
                    }
                }
            }

            // 2-opt inside each route
            if !improved {
                'two_opt: for r in 0..routes.len() {
                    let len = routes[r].len();
                    for i in 0..len {
                        for j in i + 1..len {
                            let mut candidate = routes.clone();
                            candidate[r][i..=j].reverse();
                            let score = Self::objective(&candidate, matrix);
                            if score < current {
                                *routes = candidate;
                                current = score;
                                improved = true;
                                break 'two_opt;
                            }
                        }
                    }
                }
            }

            if !improved {
                break;
            }
        }
    }

    /// Round-robin over targets sorted by distance from the depot.
    fn greedy_fallback(&self) -> BTreeMap<String, Vec<usize>> {
        let mut assignments: BTreeMap<String, Vec<usize>> = self
            .fleet
            .iter()
            .map(|a| (a.name.clone(), Vec::new()))
            .collect();

        let mut target_distances: Vec<(usize, f64)> = self
            .targets
            .iter()
            .enumerate()
            .map(|(idx, target)| {
                let distance = self
                    .depot
                    .map(|d| haversine_distance(d.lat, d.lon, target.lat, target.lon))
                    .unwrap_or(0.0);
                (idx, distance)
            })
            .collect();
        target_distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        for (i, (target_idx, _)) in target_distances.into_iter().enumerate() {
            let aircraft = &self.fleet[i % self.fleet.len()];
            if let Some(route) = assignments.get_mut(&aircraft.name) {
                route.push(target_idx);
            }
        }

        assignments
    }

    /// When there are fewer targets than aircraft and some aircraft came
    /// away empty, spread the targets so everyone holds floor(n/k) or
    /// ceil(n/k).
    fn rebalance_sparse(&self, assignments: &mut BTreeMap<String, Vec<usize>>) {
        if self.targets.len() >= self.fleet.len() || self.targets.is_empty() {
            return;
        }
        let empty_count = self
            .fleet
            .iter()
            .filter(|a| assignments.get(&a.name).is_none_or(|r| r.is_empty()))
            .count();
        if empty_count == 0 {
            return;
        }

        let mut all_indices: Vec<usize> = assignments.values().flatten().copied().collect();
        all_indices.sort_unstable();
        all_indices.dedup();

        let per_aircraft = all_indices.len() / self.fleet.len();
        let remainder = all_indices.len() % self.fleet.len();

        assignments.clear();
        let mut cursor = 0;
        for (i, aircraft) in self.fleet.iter().enumerate() {
            let count = per_aircraft + usize::from(i < remainder);
            assignments.insert(
                aircraft.name.clone(),
                all_indices[cursor..cursor + count].to_vec(),
            );
            cursor += count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WaypointType;

    fn waypoint(lat: f64, lon: f64, alt: f64, ty: WaypointType) -> Waypoint {
        Waypoint::new(lat, lon, alt, ty).unwrap()
    }

    fn two_aircraft_mission() -> Mission {
        let fleet = vec![
            AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap(),
            AircraftSpec::new("uav-2", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap(),
        ];
        let mut mission = Mission::new("vrp-test", fleet);
        mission.set_depot(waypoint(50.0, 30.0, 0.0, WaypointType::Depot));
        // two clusters, one northwest, one southeast
        mission.add_target(waypoint(50.02, 29.98, 50.0, WaypointType::Target));
        mission.add_target(waypoint(50.03, 29.97, 50.0, WaypointType::Target));
        mission.add_target(waypoint(49.98, 30.02, 50.0, WaypointType::Target));
        mission.add_target(waypoint(49.97, 30.03, 50.0, WaypointType::Target));
        mission
    }

    #[test]
    fn partition_covers_all_targets_exactly_once() {
        let mission = two_aircraft_mission();
        let assignments = VrpAssigner::new(&mission).solve();

        assert_eq!(assignments.len(), 2);
        let mut seen: Vec<usize> = assignments.values().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn beats_round_robin_total_distance() {
        let mission = two_aircraft_mission();
        let assigner = VrpAssigner::new(&mission);
        let assignments = assigner.solve();
        let matrix = assigner.distance_matrix();

        let solved: i64 = mission
            .fleet
            .iter()
            .map(|a| VrpAssigner::route_length(&assignments[&a.name], &matrix))
            .sum();

        // round robin interleaves the clusters
        let round_robin: i64 = VrpAssigner::route_length(&[0, 2], &matrix)
            + VrpAssigner::route_length(&[1, 3], &matrix);
        assert!(solved <= round_robin);
    }

    #[test]
    fn sparse_targets_are_spread_over_fleet() {
        let fleet = vec![
            AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap(),
            AircraftSpec::new("uav-2", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap(),
            AircraftSpec::new("uav-3", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap(),
        ];
        let mut mission = Mission::new("sparse", fleet);
        mission.set_depot(waypoint(50.0, 30.0, 0.0, WaypointType::Depot));
        mission.add_target(waypoint(50.01, 30.0, 50.0, WaypointType::Target));
        mission.add_target(waypoint(50.02, 30.0, 50.0, WaypointType::Target));

        let assignments = VrpAssigner::new(&mission).solve();
        assert_eq!(assignments.len(), 3);
        let loaded = assignments.values().filter(|r| !r.is_empty()).count();
        assert_eq!(loaded, 2);
        for route in assignments.values() {
            assert!(route.len() <= 1);
        }
    }

    #[test]
    fn empty_inputs_yield_empty_assignment() {
        let fleet = vec![AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap()];
        let mission = Mission::new("empty", fleet);
        assert!(VrpAssigner::new(&mission).solve().is_empty());
    }
}
