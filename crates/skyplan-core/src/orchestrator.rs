//! End-to-end mission planning: pre-checks, fleet assignment, per-aircraft
//! planning, optional metaheuristic refinement and validation.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::models::{
    FinishPointType, LandingMode, Mission, Route, Waypoint,
};
use crate::optimize::{MissionOptimizer, OptimizationAlgorithm};
use crate::ordering::OptimizationMetric;
use crate::planners::Algorithm;
use crate::route_planner::RoutePlanner;
use crate::validation::RouteValidator;
use crate::vrp::VrpAssigner;
use crate::weather::WeatherManager;

/// Knobs for one `plan_mission` call.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub algorithm: Algorithm,
    pub optimization_algorithm: OptimizationAlgorithm,
    pub optimization_metric: OptimizationMetric,
    /// Overrides the mission's landing mode when set
    pub landing_mode: Option<LandingMode>,
    /// Overrides the mission's finish policy when set
    pub finish_point_type: Option<FinishPointType>,
    /// Overrides the mission's custom finish point when set
    pub finish_point: Option<Waypoint>,
    /// Seed for the metaheuristic refinement stage
    pub seed: u64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Astar,
            optimization_algorithm: OptimizationAlgorithm::None,
            optimization_metric: OptimizationMetric::Distance,
            landing_mode: None,
            finish_point_type: None,
            finish_point: None,
            seed: 42,
        }
    }
}

/// Owns the mission and one weather manager for the planning session.
pub struct MissionOrchestrator {
    mission: Mission,
    weather: WeatherManager,
    validator: RouteValidator,
}

impl MissionOrchestrator {
    pub fn new(mission: Mission, weather: WeatherManager) -> Self {
        Self {
            mission,
            weather,
            validator: RouteValidator::new(),
        }
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    pub fn weather(&self) -> &WeatherManager {
        &self.weather
    }

    /// Plan the complete mission. Per-aircraft failures are aggregated into
    /// the error string; this never panics or raises.
    pub fn plan_mission(
        &mut self,
        options: &PlanOptions,
    ) -> (BTreeMap<String, Route>, Option<String>) {
        let mut routes: BTreeMap<String, Route> = BTreeMap::new();
        let mut error_message: Option<String> = None;

        if let Some(mode) = options.landing_mode {
            self.mission.landing_mode = mode;
        }
        if let Some(finish_type) = options.finish_point_type {
            self.mission.finish_point_type = finish_type;
        }
        if let Some(finish) = &options.finish_point {
            self.mission.finish_point = Some(finish.clone());
        }

        if self.mission.fleet.is_empty() {
            return (routes, Some("No aircraft configured in mission".to_string()));
        }

        // reject early rather than asking a planner to reach a point that
        // can never be feasible
        let zone_violations = self.check_points_against_zones();
        if !zone_violations.is_empty() {
            let listed = zone_violations
                .iter()
                .map(|v| format!("- {v}"))
                .collect::<Vec<_>>()
                .join("\n");
            warn!("mission rejected by no-fly pre-check");
            return (
                routes,
                Some(format!(
                    "Cannot plan route: points are in no-fly zones:\n{listed}"
                )),
            );
        }

        self.weather.pre_fetch(&self.mission);

        if self.mission.fleet.len() == 1 {
            let aircraft = self.mission.fleet[0].clone();
            let planner = RoutePlanner::new(&self.mission, &self.weather);
            match planner.plan_single_route(
                &aircraft,
                options.algorithm,
                options.optimization_metric,
            ) {
                Some(route) => {
                    routes.insert(aircraft.name.clone(), route);
                }
                None => {
                    error_message = Some(
                        "No route found. Possible reasons:\n\
                         - Target points are unreachable\n\
                         - No-fly zones block all possible paths\n\
                         - Constraints are too restrictive\n\
                         - Try adjusting target points or no-fly zones"
                            .to_string(),
                    );
                }
            }
        } else {
            let assignments = VrpAssigner::new(&self.mission).solve();
            if assignments.is_empty() {
                return (
                    routes,
                    Some(format!(
                        "Fleet assignment failed: {} aircraft, {} targets",
                        self.mission.fleet.len(),
                        self.mission.target_points.len()
                    )),
                );
            }

            for aircraft in self.mission.fleet.clone() {
                let target_indices = assignments
                    .get(&aircraft.name)
                    .cloned()
                    .unwrap_or_default();

                if target_indices.is_empty() {
                    if let Some(route) = self.minimal_route(&aircraft.name) {
                        routes.insert(aircraft.name.clone(), route);
                    }
                    continue;
                }

                let targets: Vec<Waypoint> = target_indices
                    .iter()
                    .filter(|&&i| i < self.mission.target_points.len())
                    .map(|&i| self.mission.target_points[i].clone())
                    .collect();

                let mut sub_mission = Mission::new(
                    format!("{}_{}", self.mission.name, aircraft.name),
                    vec![aircraft.clone()],
                );
                sub_mission.depot = self.mission.depot.clone();
                sub_mission.target_points = targets;
                sub_mission.finish_point = self.mission.finish_point.clone();
                sub_mission.finish_point_type = self.mission.finish_point_type;
                sub_mission.landing_mode = self.mission.landing_mode;
                sub_mission.constraints = self.mission.constraints.clone();

                let planner = RoutePlanner::new(&sub_mission, &self.weather);
                match planner.plan_single_route(
                    &aircraft,
                    options.algorithm,
                    options.optimization_metric,
                ) {
                    Some(route) => {
                        routes.insert(aircraft.name.clone(), route);
                    }
                    None => {
                        let line = format!("Failed to plan route for {}", aircraft.name);
                        error_message = Some(match error_message.take() {
                            Some(existing) => format!("{existing}\n{line}"),
                            None => line,
                        });
                    }
                }
            }

            if routes.is_empty() && error_message.is_none() {
                error_message = Some(
                    "No routes found for multi-aircraft mission. Possible reasons:\n\
                     - Target points are unreachable\n\
                     - No-fly zones block all possible paths\n\
                     - Constraints are too restrictive"
                        .to_string(),
                );
            }
        }

        if options.optimization_algorithm != OptimizationAlgorithm::None && !routes.is_empty() {
            let originals = routes.clone();
            for (name, route) in &routes {
                self.mission.add_route(name.clone(), route.clone());
            }

            let optimized = MissionOptimizer::new(&self.mission, options.seed)
                .optimize_routes(options.optimization_algorithm);

            if !optimized.is_empty() {
                routes = optimized;
                // an aircraft dropped by the refinement keeps its
                // pre-refinement route
                for (name, route) in originals {
                    routes.entry(name).or_insert(route);
                }
            }
        }

        for (name, route) in routes.iter_mut() {
            if let Some(aircraft) = self.mission.aircraft(name) {
                let verdict =
                    self.validator
                        .validate_route(route, aircraft, Some(&self.mission.constraints));
                route.validation = Some(verdict);
            }
        }

        for (name, route) in &routes {
            self.mission.add_route(name.clone(), route.clone());
        }

        info!(
            routes = routes.len(),
            fleet = self.mission.fleet.len(),
            "mission planning finished"
        );
        (routes, error_message)
    }

    /// Replan one aircraft against the mission's full target list.
    pub fn replan_route(&mut self, aircraft_name: &str, options: &PlanOptions) -> Option<Route> {
        let aircraft = self.mission.aircraft(aircraft_name)?.clone();
        let planner = RoutePlanner::new(&self.mission, &self.weather);
        let mut route =
            planner.plan_single_route(&aircraft, options.algorithm, options.optimization_metric)?;

        let verdict =
            self.validator
                .validate_route(&route, &aircraft, Some(&self.mission.constraints));
        route.validation = Some(verdict);
        self.mission.add_route(aircraft_name.to_string(), route.clone());
        Some(route)
    }

    /// Route for an aircraft with no assigned targets: depot alone, or depot
    /// plus a custom finish located elsewhere.
    fn minimal_route(&self, aircraft_name: &str) -> Option<Route> {
        let depot = self.mission.depot.as_ref()?;
        let mut waypoints = vec![depot.clone()];

        if self.mission.finish_point_type == FinishPointType::Custom {
            if let Some(finish) = &self.mission.finish_point {
                if !finish.same_location(depot) {
                    waypoints.push(finish.clone());
                }
            }
        }

        let mut route = Route::new(waypoints, aircraft_name);
        if let Some(aircraft) = self.mission.aircraft(aircraft_name) {
            route.compute_metrics(aircraft, Some(&self.weather));
        }
        Some(route)
    }

    fn check_points_against_zones(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let zones = &self.mission.constraints.no_fly_zones;
        if zones.is_empty() {
            return violations;
        }

        if let Some(depot) = &self.mission.depot {
            for zone in zones {
                if zone.contains_point(depot.lat, depot.lon, depot.altitude_m) {
                    violations.push(format!(
                        "Depot is in no-fly zone: {}",
                        zone.display_name()
                    ));
                }
            }
        }

        for (idx, target) in self.mission.target_points.iter().enumerate() {
            for zone in zones {
                if zone.contains_point(target.lat, target.lon, target.altitude_m) {
                    violations.push(format!(
                        "Target point {} ({}) is in no-fly zone: {}",
                        idx + 1,
                        target.name.as_deref().unwrap_or("Unnamed"),
                        zone.display_name()
                    ));
                }
            }
        }

        violations
    }
}
