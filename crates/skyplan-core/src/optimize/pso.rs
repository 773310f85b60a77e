//! Particle-swarm route refinement.
//!
//! Positions are waypoint orderings; velocity per index is a swap pressure.
//! When the pressure at an index exceeds the threshold, the particle scans
//! the middle section for the best single swap and applies it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::{AircraftSpec, Route, Waypoint};
use crate::spatial::haversine_distance;
use crate::zones::MissionConstraints;

use super::violates_zones;

const NUM_PARTICLES: usize = 30;
const ITERATIONS: usize = 100;
/// Inertia weight
const W: f64 = 0.5;
/// Cognitive coefficient
const C1: f64 = 1.5;
/// Social coefficient
const C2: f64 = 1.5;
/// Swap pressure above this triggers a swap scan.
const SWAP_THRESHOLD: f64 = 0.5;

struct Particle {
    waypoints: Vec<Waypoint>,
    velocity: Vec<f64>,
    best_waypoints: Vec<Waypoint>,
    best_cost: f64,
    cost: f64,
}

impl Particle {
    fn new(waypoints: Vec<Waypoint>, constraints: Option<&MissionConstraints>) -> Self {
        let velocity = vec![0.0; waypoints.len()];
        let cost = ordering_cost(&waypoints, constraints);
        let (best_waypoints, best_cost) = if cost.is_finite() {
            (waypoints.clone(), cost)
        } else {
            (waypoints.clone(), f64::INFINITY)
        };

        Self {
            waypoints,
            velocity,
            best_waypoints,
            best_cost,
            cost,
        }
    }

    fn refresh_cost(&mut self, constraints: Option<&MissionConstraints>) {
        self.cost = ordering_cost(&self.waypoints, constraints);
        if self.cost < self.best_cost {
            self.best_cost = self.cost;
            self.best_waypoints = self.waypoints.clone();
        }
    }

    fn update_velocity(&mut self, rng: &mut StdRng, global_best: &[Waypoint]) {
        for i in 1..self.waypoints.len().saturating_sub(1) {
            let r1 = rng.random::<f64>();
            let r2 = rng.random::<f64>();

            let cognitive = C1 * r1 * swap_distance(&self.waypoints, &self.best_waypoints, i);
            let social = C2 * r2 * swap_distance(&self.waypoints, global_best, i);

            self.velocity[i] = W * self.velocity[i] + cognitive + social;
        }
    }

    fn update_position(&mut self, constraints: Option<&MissionConstraints>) {
        let len = self.waypoints.len();
        if len < 3 {
            return;
        }

        for i in 1..len - 1 {
            if self.velocity[i].abs() <= SWAP_THRESHOLD {
                continue;
            }

            let old_cost = self.cost;
            let mut best_swap = i;
            let mut best_improvement = 0.0;

            for j in 1..len - 1 {
                if i == j {
                    continue;
                }
                self.waypoints.swap(i, j);
                let candidate = ordering_cost(&self.waypoints, constraints);
                self.waypoints.swap(i, j);

                let improvement = old_cost - candidate;
                if improvement > best_improvement {
                    best_improvement = improvement;
                    best_swap = j;
                }
            }

            if best_improvement > 0.0 {
                self.waypoints.swap(i, best_swap);
                self.refresh_cost(constraints);
            }
        }
    }
}

/// How far the waypoint at `idx` sits from its slot in the reference
/// ordering, normalized by route length.
fn swap_distance(waypoints: &[Waypoint], reference: &[Waypoint], idx: usize) -> f64 {
    if idx >= waypoints.len() || idx >= reference.len() {
        return 0.0;
    }
    match reference.iter().position(|wp| *wp == waypoints[idx]) {
        Some(ref_idx) => (idx as f64 - ref_idx as f64).abs() / waypoints.len() as f64,
        None => 1.0,
    }
}

fn ordering_cost(waypoints: &[Waypoint], constraints: Option<&MissionConstraints>) -> f64 {
    if violates_zones(waypoints, constraints) {
        return f64::INFINITY;
    }
    waypoints
        .windows(2)
        .map(|w| haversine_distance(w[0].lat, w[0].lon, w[1].lat, w[1].lon))
        .sum()
}

pub struct PsoOptimizer<'a> {
    route: &'a Route,
    aircraft: &'a AircraftSpec,
    constraints: Option<&'a MissionConstraints>,
    rng: StdRng,
}

impl<'a> PsoOptimizer<'a> {
    pub fn new(
        route: &'a Route,
        aircraft: &'a AircraftSpec,
        constraints: Option<&'a MissionConstraints>,
        seed: u64,
    ) -> Self {
        Self {
            route,
            aircraft,
            constraints,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn optimize(&mut self) -> Route {
        if self.route.waypoints.len() < 3 {
            return self.route.clone();
        }

        let mut particles: Vec<Particle> = Vec::with_capacity(NUM_PARTICLES);
        for _ in 0..NUM_PARTICLES {
            let mut waypoints = self.route.waypoints.clone();
            let end = waypoints.len() - 1;
            waypoints[1..end].shuffle(&mut self.rng);
            particles.push(Particle::new(waypoints, self.constraints));
        }

        let mut global_best_cost = f64::INFINITY;
        let mut global_best: Vec<Waypoint> = self.route.waypoints.clone();
        for particle in &particles {
            if particle.cost < global_best_cost {
                global_best_cost = particle.cost;
                global_best = particle.waypoints.clone();
            }
        }

        for _ in 0..ITERATIONS {
            for particle in &mut particles {
                particle.update_velocity(&mut self.rng, &global_best);
                particle.update_position(self.constraints);

                if particle.cost < global_best_cost {
                    global_best_cost = particle.cost;
                    global_best = particle.waypoints.clone();
                }
            }
        }

        if !global_best_cost.is_finite() {
            return self.route.clone();
        }

        let mut best = Route {
            waypoints: global_best,
            aircraft_name: self.route.aircraft_name.clone(),
            metrics: None,
            validation: None,
        };
        best.compute_metrics(self.aircraft, None);
        best
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
                waypoint(50.02, 30.00, 50.0, WaypointType::Target),
                waypoint(50.01, 30.00, 50.0, WaypointType::Target),
                waypoint(50.03, 30.00, 50.0, WaypointType::Target),
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
    fn swarm_improves_or_matches_ordering() {
        let route = scrambled_route();
        let aircraft = aircraft();
        let refined = PsoOptimizer::new(&route, &aircraft, None, 42).optimize();

        assert_eq!(refined.waypoints.first(), route.waypoints.first());
        assert_eq!(refined.waypoints.last(), route.waypoints.last());
        assert!(route_distance(&refined) <= route_distance(&route));
    }

    #[test]
    fn deterministic_for_a_seed() {
        let route = scrambled_route();
        let aircraft = aircraft();
        let a = PsoOptimizer::new(&route, &aircraft, None, 11).optimize();
        let b = PsoOptimizer::new(&route, &aircraft, None, 11).optimize();
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

        let refined = PsoOptimizer::new(&route, &aircraft, Some(&constraints), 42).optimize();
        assert_eq!(refined.waypoints, route.waypoints);
    }
}
