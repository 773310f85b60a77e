//! Ant-colony route refinement.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{AircraftSpec, Route, Waypoint};
use crate::spatial::haversine_distance;
use crate::zones::MissionConstraints;

use super::violates_zones;

const NUM_ANTS: usize = 30;
const ITERATIONS: usize = 100;
/// Pheromone importance
const ALPHA: f64 = 1.0;
/// Heuristic importance
const BETA: f64 = 2.0;
/// Pheromone evaporation rate
const EVAPORATION: f64 = 0.1;
/// Pheromone deposit constant
const Q: f64 = 100.0;

pub struct AcoOptimizer<'a> {
    route: &'a Route,
    aircraft: &'a AircraftSpec,
    constraints: Option<&'a MissionConstraints>,
    middle: Vec<Waypoint>,
    pheromone: HashMap<(usize, usize), f64>,
    rng: StdRng,
}

impl<'a> AcoOptimizer<'a> {
    pub fn new(
        route: &'a Route,
        aircraft: &'a AircraftSpec,
        constraints: Option<&'a MissionConstraints>,
        seed: u64,
    ) -> Self {
        let middle = if route.waypoints.len() < 3 {
            Vec::new()
        } else {
            route.waypoints[1..route.waypoints.len() - 1].to_vec()
        };

        let mut pheromone = HashMap::new();
        for i in 0..middle.len() {
            for j in 0..middle.len() {
                if i != j {
                    pheromone.insert((i, j), 1.0);
                }
            }
        }

        Self {
            route,
            aircraft,
            constraints,
            middle,
            pheromone,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn optimize(&mut self) -> Route {
        if self.middle.len() < 2 {
            return self.route.clone();
        }

        let mut best_order: Option<Vec<usize>> = None;
        let mut best_cost = f64::INFINITY;

        for _ in 0..ITERATIONS {
            let mut ant_tours = Vec::with_capacity(NUM_ANTS);

            for _ in 0..NUM_ANTS {
                let order = self.construct_solution();
                let cost = self.tour_cost(&order);
                if cost < best_cost {
                    best_cost = cost;
                    best_order = Some(order.clone());
                }
                ant_tours.push((order, cost));
            }

            self.update_pheromones(&ant_tours);
        }

        match best_order {
            Some(order) if best_cost.is_finite() => {
                let mut waypoints = vec![self.route.waypoints[0].clone()];
                waypoints.extend(order.iter().map(|&idx| self.middle[idx].clone()));
                waypoints.push(self.route.waypoints[self.route.waypoints.len() - 1].clone());

                let mut best = Route {
                    waypoints,
                    aircraft_name: self.route.aircraft_name.clone(),
                    metrics: None,
                    validation: None,
                };
                best.compute_metrics(self.aircraft, None);
                best
            }
            _ => self.route.clone(),
        }
    }

    /// One ant's tour over the middle waypoints, as indices.
    fn construct_solution(&mut self) -> Vec<usize> {
        let mut unvisited: Vec<usize> = (0..self.middle.len()).collect();
        let mut tour = Vec::with_capacity(self.middle.len());

        let first = self.rng.random_range(0..unvisited.len());
        let mut current = unvisited.remove(first);
        tour.push(current);

        while !unvisited.is_empty() {
            let next = self.select_next(current, &unvisited);
            let pos = unvisited.iter().position(|&idx| idx == next).unwrap_or(0);
            unvisited.remove(pos);
            tour.push(next);
            current = next;
        }

        tour
    }

    /// Roulette-wheel pick weighted by pheromone^alpha * (1/d)^beta.
    fn select_next(&mut self, current: usize, unvisited: &[usize]) -> usize {
        let mut weights = Vec::with_capacity(unvisited.len());
        let mut total = 0.0;

        for &candidate in unvisited {
            let pheromone = self.pheromone.get(&(current, candidate)).copied().unwrap_or(1.0);
            let heuristic = 1.0 / (self.distance(current, candidate) + 0.001);
            let weight = pheromone.powf(ALPHA) * heuristic.powf(BETA);
            weights.push((candidate, weight));
            total += weight;
        }

        if total <= 0.0 {
            let pick = self.rng.random_range(0..unvisited.len());
            return unvisited[pick];
        }

        let r = self.rng.random::<f64>();
        let mut cumulative = 0.0;
        for (candidate, weight) in &weights {
            cumulative += weight / total;
            if r <= cumulative {
                return *candidate;
            }
        }
        weights.last().map(|(c, _)| *c).unwrap_or(unvisited[0])
    }

    fn distance(&self, idx1: usize, idx2: usize) -> f64 {
        let wp1 = &self.middle[idx1];
        let wp2 = &self.middle[idx2];
        haversine_distance(wp1.lat, wp1.lon, wp2.lat, wp2.lon)
    }

    /// Horizontal length of the full route implied by a middle ordering;
    /// infinity when it violates a no-fly zone.
    fn tour_cost(&self, order: &[usize]) -> f64 {
        if order.is_empty() {
            return f64::INFINITY;
        }

        let mut waypoints = vec![self.route.waypoints[0].clone()];
        waypoints.extend(order.iter().map(|&idx| self.middle[idx].clone()));
        waypoints.push(self.route.waypoints[self.route.waypoints.len() - 1].clone());

        if violates_zones(&waypoints, self.constraints) {
            return f64::INFINITY;
        }

        waypoints
            .windows(2)
            .map(|w| haversine_distance(w[0].lat, w[0].lon, w[1].lat, w[1].lon))
            .sum()
    }

    fn update_pheromones(&mut self, ant_tours: &[(Vec<usize>, f64)]) {
        for value in self.pheromone.values_mut() {
            *value *= 1.0 - EVAPORATION;
        }

        for (tour, cost) in ant_tours {
            if !cost.is_finite() || *cost <= 0.0 {
                continue;
            }
            let delta = Q / cost;
            for pair in tour.windows(2) {
                if let Some(value) = self.pheromone.get_mut(&(pair[0], pair[1])) {
                    *value += delta;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WaypointType;
    use crate::zones::NoFlyZone;

    fn waypoint(lat: f64, lon: f64, alt: f64, ty: WaypointType) -> Waypoint {
        Waypoint::new(lat, lon, alt, ty).unwrap()
    }

    fn aircraft() -> AircraftSpec {
        AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap()
    }

    fn scrambled_route() -> Route {
        Route::new(
            vec![
                waypoint(50.00, 30.00, 0.0, WaypointType::Depot),
                waypoint(50.03, 30.00, 50.0, WaypointType::Target),
                waypoint(50.01, 30.00, 50.0, WaypointType::Target),
                waypoint(50.02, 30.00, 50.0, WaypointType::Target),
                waypoint(50.04, 30.00, 0.0, WaypointType::Finish),
            ],
            "uav-1",
        )
    }

    fn route_distance(route: &Route) -> f64 {
        route
            .waypoints
            .windows(2)
            .map(|w| haversine_distance(w[0].lat, w[0].lon, w[1].lat, w[1].lon))
            .sum()
    }

    #[test]
    fn colony_finds_shorter_ordering() {
        let route = scrambled_route();
        let aircraft = aircraft();
        let refined = AcoOptimizer::new(&route, &aircraft, None, 42).optimize();

        assert_eq!(refined.waypoints.first(), route.waypoints.first());
        assert_eq!(refined.waypoints.last(), route.waypoints.last());
        assert!(route_distance(&refined) <= route_distance(&route));
    }

    #[test]
    fn deterministic_for_a_seed() {
        let route = scrambled_route();
        let aircraft = aircraft();
        let a = AcoOptimizer::new(&route, &aircraft, None, 3).optimize();
        let b = AcoOptimizer::new(&route, &aircraft, None, 3).optimize();
        assert_eq!(a.waypoints, b.waypoints);
    }

    #[test]
    fn blocked_corridor_keeps_original_route() {
        let route = scrambled_route();
        let aircraft = aircraft();
        let mut constraints = MissionConstraints::default();
        constraints.add_no_fly_zone(NoFlyZone::polygon(
            vec![
                [49.9, 29.9],
                [49.9, 30.1],
                [50.1, 30.1],
                [50.1, 29.9],
                [49.9, 29.9],
            ],
            0.0,
            500.0,
        ));

        let refined = AcoOptimizer::new(&route, &aircraft, Some(&constraints), 42).optimize();
        assert_eq!(refined.waypoints, route.waypoints);
    }
}
