//! Genetic-algorithm route refinement.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::{AircraftSpec, Route, Waypoint};
use crate::spatial::{bearing_deg, haversine_distance};
use crate::zones::MissionConstraints;

use super::violates_zones;

const POPULATION_SIZE: usize = 50;
const GENERATIONS: usize = 100;
const MUTATION_RATE: f64 = 0.1;
const CROSSOVER_RATE: f64 = 0.7;
const TOURNAMENT_SIZE: usize = 3;
/// Bearing change above this (degrees) counts as a sharp turn.
const SHARP_TURN_DEG: f64 = 45.0;

pub struct GeneticOptimizer<'a> {
    route: &'a Route,
    aircraft: &'a AircraftSpec,
    constraints: Option<&'a MissionConstraints>,
    rng: StdRng,
}

impl<'a> GeneticOptimizer<'a> {
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

        let mut population = self.initial_population();

        for _ in 0..GENERATIONS {
            let fitness_scores: Vec<f64> =
                population.iter().map(|ind| self.fitness(ind)).collect();

            let parents = self.select_parents(&population, &fitness_scores);

            let mut new_population: Vec<Vec<Waypoint>> = Vec::with_capacity(parents.len());
            let mut i = 0;
            while i + 1 < parents.len() {
                if self.rng.random::<f64>() < CROSSOVER_RATE {
                    let (child1, child2) = self.crossover(&parents[i], &parents[i + 1]);
                    new_population.push(child1);
                    new_population.push(child2);
                } else {
                    new_population.push(parents[i].clone());
                    new_population.push(parents[i + 1].clone());
                }
                i += 2;
            }

            for individual in &mut new_population {
                if self.rng.random::<f64>() < MUTATION_RATE {
                    Self::mutate(&mut self.rng, individual);
                }
            }

            // elitism: the best of the old generation survives unchanged
            let best_idx = argmax(&fitness_scores);
            if let Some(slot) = new_population.first_mut() {
                *slot = population[best_idx].clone();
            }

            new_population.truncate(POPULATION_SIZE);
            population = new_population;
        }

        let final_fitness: Vec<f64> = population.iter().map(|ind| self.fitness(ind)).collect();
        let best_idx = argmax(&final_fitness);

        // every ordering hit a no-fly zone: keep the route we were given
        if final_fitness[best_idx] <= 0.0 {
            return self.route.clone();
        }

        let mut best = Route {
            waypoints: population[best_idx].clone(),
            aircraft_name: self.route.aircraft_name.clone(),
            metrics: None,
            validation: None,
        };
        best.compute_metrics(self.aircraft, None);
        best
    }

    fn initial_population(&mut self) -> Vec<Vec<Waypoint>> {
        let mut population = Vec::with_capacity(POPULATION_SIZE);
        population.push(self.route.waypoints.clone());

        for _ in 1..POPULATION_SIZE {
            let mut waypoints = self.route.waypoints.clone();
            let end = waypoints.len() - 1;
            waypoints[1..end].shuffle(&mut self.rng);
            population.push(waypoints);
        }

        population
    }

    /// Fitness is 1 / (1 + distance/10km + energy/100Wh + turns/1000);
    /// zone-violating orderings score zero.
    fn fitness(&self, waypoints: &[Waypoint]) -> f64 {
        if waypoints.len() < 2 {
            return 0.0;
        }
        if violates_zones(waypoints, self.constraints) {
            return 0.0;
        }

        let mut total_distance = 0.0;
        let mut total_energy = 0.0;
        let mut turn_penalty = 0.0;

        for i in 0..waypoints.len() - 1 {
            let wp1 = &waypoints[i];
            let wp2 = &waypoints[i + 1];

            let distance = haversine_distance(wp1.lat, wp1.lon, wp2.lat, wp2.lon);
            total_distance += distance;
            total_energy += self
                .aircraft
                .estimate_energy(distance, wp2.altitude_m - wp1.altitude_m);

            if i > 0 {
                let angle = turn_angle(&waypoints[i - 1], wp1, wp2);
                if angle > SHARP_TURN_DEG {
                    turn_penalty += (angle - SHARP_TURN_DEG) * 10.0;
                }
            }
        }

        1.0 / (1.0 + total_distance / 10_000.0 + total_energy / 100.0 + turn_penalty / 1000.0)
    }

    /// Tournament selection of size 3.
    fn select_parents(
        &mut self,
        population: &[Vec<Waypoint>],
        fitness_scores: &[f64],
    ) -> Vec<Vec<Waypoint>> {
        let mut parents = Vec::with_capacity(POPULATION_SIZE);

        for _ in 0..POPULATION_SIZE {
            let contenders = rand::seq::index::sample(&mut self.rng, population.len(), TOURNAMENT_SIZE);
            let winner = contenders
                .iter()
                .max_by(|&a, &b| fitness_scores[a].total_cmp(&fitness_scores[b]))
                .unwrap_or(0);
            parents.push(population[winner].clone());
        }

        parents
    }

    /// Order crossover on the middle slice; first and last stay fixed.
    fn crossover(
        &mut self,
        parent1: &[Waypoint],
        parent2: &[Waypoint],
    ) -> (Vec<Waypoint>, Vec<Waypoint>) {
        if parent1.len() < 3 {
            return (parent1.to_vec(), parent2.to_vec());
        }

        let i = self.rng.random_range(1..parent1.len() - 1);
        let j = self.rng.random_range(i..parent1.len() - 1);

        let child1 = Self::order_cross(parent1, parent2, i, j);
        let child2 = Self::order_cross(parent2, parent1, i, j);
        (child1, child2)
    }

    fn order_cross(donor: &[Waypoint], filler: &[Waypoint], i: usize, j: usize) -> Vec<Waypoint> {
        let start = donor[0].clone();
        let end = donor[donor.len() - 1].clone();
        let segment: Vec<Waypoint> = donor[i..=j].to_vec();

        let mut child = vec![start];
        for wp in &filler[1..filler.len() - 1] {
            if !segment.contains(wp) {
                child.push(wp.clone());
            }
        }
        child.extend(segment);
        child.push(end);
        child
    }

    /// Swap two random middle waypoints.
    fn mutate(rng: &mut StdRng, waypoints: &mut [Waypoint]) {
        if waypoints.len() < 3 {
            return;
        }
        let i = rng.random_range(1..waypoints.len() - 1);
        let j = rng.random_range(1..waypoints.len() - 1);
        if i != j {
            waypoints.swap(i, j);
        }
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}

/// Bearing change at the middle vertex, folded to [0, 180].
fn turn_angle(wp1: &Waypoint, wp2: &Waypoint, wp3: &Waypoint) -> f64 {
    let bearing1 = bearing_deg(wp1.lat, wp1.lon, wp2.lat, wp2.lon);
    let bearing2 = bearing_deg(wp2.lat, wp2.lon, wp3.lat, wp3.lon);

    let mut angle = (bearing2 - bearing1).abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    angle
}
