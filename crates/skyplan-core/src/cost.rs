//! Edge cost and edge feasibility for the navigation graph.
//!
//! The cost of a segment fuses 3D distance, climb/descent penalties against
//! the aircraft's rate limits, a short-segment turn penalty, wind and
//! precipitation effects, an inertia-aware time term and speed-dependent
//! energy. The weighting constants are part of the planning contract; the
//! blended scalar intentionally mixes meters, seconds and Wh.

use crate::models::AircraftSpec;
use crate::spatial::{bearing_deg, distance_3d, haversine_distance, GeoPoint};
use crate::weather::WeatherManager;
use crate::zones::MissionConstraints;

/// Over-limit climb/descent penalty scale.
const RATE_LIMIT_PENALTY: f64 = 10_000.0;
/// Cost added per meter climbed within limits.
const CLIMB_WEIGHT: f64 = 2.0;
/// Cost added per meter descended within limits.
const DESCENT_WEIGHT: f64 = 1.2;
/// Penalty per meter of shortfall below the quarter-turn arc length.
const SHORT_SEGMENT_WEIGHT: f64 = 0.1;
/// Headwind stronger than this (m/s) starts to penalize the edge.
const STRONG_HEADWIND_MPS: f64 = 5.0;
/// Reference speed fraction used when judging required climb/descent rates.
const RATE_REFERENCE_FRACTION: f64 = 0.7;
/// Seconds of travel time are weighted into the cost at this m/s equivalent.
const TIME_COST_FACTOR: f64 = 10.0;

/// Cost and feasibility oracle over directed segments, borrowed by the graph
/// and its planners.
pub struct CostModel<'a> {
    aircraft: &'a AircraftSpec,
    constraints: &'a MissionConstraints,
    weather: &'a WeatherManager,
}

impl<'a> CostModel<'a> {
    pub fn new(
        aircraft: &'a AircraftSpec,
        constraints: &'a MissionConstraints,
        weather: &'a WeatherManager,
    ) -> Self {
        Self {
            aircraft,
            constraints,
            weather,
        }
    }

    pub fn aircraft(&self) -> &AircraftSpec {
        self.aircraft
    }

    pub fn constraints(&self) -> &MissionConstraints {
        self.constraints
    }

    /// Composite weight for traversing `a -> b` arriving with `current_speed`
    /// at `a`. Lower is better; never negative, never an error.
    pub fn cost(&self, a: GeoPoint, b: GeoPoint, current_speed: f64) -> f64 {
        let max_speed = self.aircraft.max_speed_mps;
        let horizontal = haversine_distance(a.lat, a.lon, b.lat, b.lon);
        let distance = distance_3d(a, b);
        let altitude_change = b.altitude_m - a.altitude_m;

        let mut cost = distance;

        cost += self.vertical_penalty(horizontal, altitude_change);

        // Segments shorter than a quarter turn leave no room to line up the
        // next leg.
        let quarter_turn = self.aircraft.turn_radius_m * std::f64::consts::FRAC_PI_2;
        if horizontal < quarter_turn {
            cost += (quarter_turn - horizontal) * SHORT_SEGMENT_WEIGHT;
        }

        let heading = bearing_deg(a.lat, a.lon, b.lat, b.lon);
        let mid_lat = (a.lat + b.lat) / 2.0;
        let mid_lon = (a.lon + b.lon) / 2.0;
        let avg_altitude = (a.altitude_m + b.altitude_m) / 2.0;

        let mut effective_max_speed = max_speed;
        let mut wind_multiplier = 1.0;

        if let Some(sample) = self.weather.get(mid_lat, mid_lon, avg_altitude) {
            let effective_wind = sample.effective_wind(heading, avg_altitude);

            effective_max_speed =
                (max_speed - 0.5 * effective_wind).clamp(0.1 * max_speed, 1.2 * max_speed);
            wind_multiplier = 1.0 + effective_wind / max_speed * 0.3;

            if effective_wind > STRONG_HEADWIND_MPS {
                cost += effective_wind * 10.0;
            }
            cost += sample.precipitation * 50.0;
            if sample.cloud_cover > 80.0 {
                cost += (sample.cloud_cover - 80.0) * 2.0;
            }
        }

        if horizontal > 0.0 {
            let travel_time = self.segment_time(horizontal, current_speed, effective_max_speed);
            cost += travel_time * TIME_COST_FACTOR;
        }

        let base_energy = self.aircraft.estimate_energy(horizontal, altitude_change);
        let speed_factor = (effective_max_speed / max_speed).powi(2);
        let energy = base_energy * (1.0 + 0.5 * (speed_factor - 1.0)) * wind_multiplier;
        cost += energy / 100.0 * distance * 0.1;

        cost
    }

    /// Climb/descent term: a modest per-meter charge when the required rate
    /// fits the aircraft, a steep ratio penalty when it does not.
    fn vertical_penalty(&self, horizontal: f64, altitude_change: f64) -> f64 {
        if altitude_change == 0.0 {
            return 0.0;
        }

        let climb = altitude_change > 0.0;
        let (limit, in_range_weight) = if climb {
            (self.aircraft.climb_rate_mps, CLIMB_WEIGHT)
        } else {
            (self.aircraft.descent_rate_mps, DESCENT_WEIGHT)
        };

        if horizontal > 0.0 {
            let reference_time =
                horizontal / (RATE_REFERENCE_FRACTION * self.aircraft.max_speed_mps);
            let required_rate = altitude_change.abs() / reference_time;
            if required_rate > limit {
                return RATE_LIMIT_PENALTY * (required_rate / limit - 1.0);
            }
        }

        altitude_change.abs() * in_range_weight
    }

    /// Accelerate-cruise-decelerate schedule from `current_speed` up to the
    /// effective maximum and back to rest, in seconds.
    pub fn segment_time(&self, distance: f64, current_speed: f64, effective_max_speed: f64) -> f64 {
        let acceleration = self.aircraft.max_speed_mps / 5.0;
        let deceleration = acceleration;

        let accel_time = ((effective_max_speed - current_speed) / acceleration).max(0.0);
        let accel_distance = current_speed * accel_time + 0.5 * acceleration * accel_time.powi(2);

        let decel_time = effective_max_speed / deceleration;
        let decel_distance =
            effective_max_speed * decel_time - 0.5 * deceleration * decel_time.powi(2);

        let cruise_distance = (distance - accel_distance - decel_distance).max(0.0);
        let cruise_time = if effective_max_speed > 0.0 {
            cruise_distance / effective_max_speed
        } else {
            0.0
        };

        accel_time + cruise_time + decel_time
    }

    /// Check a directed segment against constraints, weather and no-fly
    /// zones. Ground endpoints (depot/finish) skip the minimum-altitude
    /// check.
    pub fn feasible(
        &self,
        a: GeoPoint,
        b: GeoPoint,
        is_start_ground: bool,
        is_end_ground: bool,
    ) -> (bool, Option<String>) {
        let (ok, reason) = self
            .constraints
            .check_point(a.lat, a.lon, a.altitude_m, is_start_ground);
        if !ok {
            return (
                false,
                Some(format!("Start point: {}", reason.unwrap_or_default())),
            );
        }

        let (ok, reason) = self
            .constraints
            .check_point(b.lat, b.lon, b.altitude_m, is_end_ground);
        if !ok {
            return (
                false,
                Some(format!("End point: {}", reason.unwrap_or_default())),
            );
        }

        let mid_lat = (a.lat + b.lat) / 2.0;
        let mid_lon = (a.lon + b.lon) / 2.0;
        let avg_altitude = (a.altitude_m + b.altitude_m) / 2.0;
        if let Some(sample) = self.weather.get(mid_lat, mid_lon, avg_altitude) {
            let (safe, why) = sample.is_safe_for_flight();
            if !safe {
                return (
                    false,
                    Some(format!(
                        "Weather conditions: {}",
                        why.unwrap_or_default()
                    )),
                );
            }
        }

        for zone in &self.constraints.no_fly_zones {
            if zone.crosses_segment(a.lat, a.lon, a.altitude_m, b.lat, b.lon, b.altitude_m) {
                return (
                    false,
                    Some(format!(
                        "Edge intersects no-fly zone: {}",
                        zone.display_name()
                    )),
                );
            }
        }

        (true, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherSample;
    use crate::zones::NoFlyZone;
    use chrono::Utc;

    fn aircraft() -> AircraftSpec {
        AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap()
    }

    fn no_constraints() -> MissionConstraints {
        MissionConstraints {
            require_return_to_depot: false,
            ..Default::default()
        }
    }

    #[test]
    fn cost_grows_with_distance() {
        let aircraft = aircraft();
        let constraints = no_constraints();
        let weather = WeatherManager::disabled();
        let model = CostModel::new(&aircraft, &constraints, &weather);

        let a = GeoPoint::new(50.0, 30.0, 50.0);
        let near = GeoPoint::new(50.005, 30.0, 50.0);
        let far = GeoPoint::new(50.02, 30.0, 50.0);

        let near_cost = model.cost(a, near, 0.0);
        let far_cost = model.cost(a, far, 0.0);
        assert!(near_cost > 0.0);
        assert!(far_cost > near_cost);
    }

    #[test]
    fn steep_climb_is_penalized_hard() {
        let aircraft = aircraft();
        let constraints = no_constraints();
        let weather = WeatherManager::disabled();
        let model = CostModel::new(&aircraft, &constraints, &weather);

        let a = GeoPoint::new(50.0, 30.0, 10.0);
        // ~111m horizontally while climbing 110m: far beyond 5 m/s at 10.5 m/s reference
        let steep = GeoPoint::new(50.001, 30.0, 120.0);
        // same horizontal move, gentle climb
        let gentle = GeoPoint::new(50.001, 30.0, 15.0);

        let steep_cost = model.cost(a, steep, 0.0);
        let gentle_cost = model.cost(a, gentle, 0.0);
        assert!(steep_cost > gentle_cost + RATE_LIMIT_PENALTY / 2.0);
    }

    #[test]
    fn headwind_raises_cost_over_tailwind() {
        let aircraft = aircraft();
        let constraints = no_constraints();
        // wind blowing from the north at 10 m/s
        let weather = WeatherManager::from_samples(vec![WeatherSample {
            lat: 50.005,
            lon: 30.0,
            altitude_m: 50.0,
            timestamp: Utc::now(),
            wind_speed_10m: 10.0,
            wind_direction_10m: 0.0,
            wind_speed_80m: None,
            wind_direction_80m: None,
            temperature_2m: 15.0,
            precipitation: 0.0,
            cloud_cover: 0.0,
            visibility_km: None,
        }]);
        let model = CostModel::new(&aircraft, &constraints, &weather);

        let south = GeoPoint::new(50.0, 30.0, 50.0);
        let north = GeoPoint::new(50.01, 30.0, 50.0);

        let into_wind = model.cost(south, north, 0.0);
        let with_wind = model.cost(north, south, 0.0);
        assert!(into_wind > with_wind);
    }

    #[test]
    fn inertia_makes_standing_start_slower() {
        let aircraft = aircraft();
        let constraints = no_constraints();
        let weather = WeatherManager::disabled();
        let model = CostModel::new(&aircraft, &constraints, &weather);

        let a = GeoPoint::new(50.0, 30.0, 50.0);
        let b = GeoPoint::new(50.01, 30.0, 50.0);

        let from_rest = model.cost(a, b, 0.0);
        let at_speed = model.cost(a, b, aircraft.max_speed_mps);
        assert!(from_rest > at_speed);
    }

    #[test]
    fn feasible_rejects_zone_crossing() {
        let aircraft = aircraft();
        let mut constraints = no_constraints();
        constraints.add_no_fly_zone(
            NoFlyZone::polygon(
                vec![
                    [49.998, 29.998],
                    [49.998, 30.002],
                    [50.002, 30.002],
                    [50.002, 29.998],
                    [49.998, 29.998],
                ],
                0.0,
                200.0,
            )
            .named("blocked"),
        );
        let weather = WeatherManager::disabled();
        let model = CostModel::new(&aircraft, &constraints, &weather);

        let a = GeoPoint::new(49.99, 30.0, 50.0);
        let b = GeoPoint::new(50.01, 30.0, 50.0);
        let (ok, reason) = model.feasible(a, b, false, false);
        assert!(!ok);
        assert!(reason.unwrap().contains("blocked"));

        // crossing far above the zone band is fine
        let high_a = GeoPoint::new(49.99, 30.0, 250.0);
        let high_b = GeoPoint::new(50.01, 30.0, 300.0);
        let (ok, _) = model.feasible(high_a, high_b, false, false);
        assert!(ok);
    }

    #[test]
    fn ground_endpoints_skip_min_altitude() {
        let aircraft = aircraft();
        let mut constraints = no_constraints();
        constraints.min_altitude_m = Some(10.0);
        let weather = WeatherManager::disabled();
        let model = CostModel::new(&aircraft, &constraints, &weather);

        let depot = GeoPoint::new(50.0, 30.0, 0.0);
        let target = GeoPoint::new(50.01, 30.0, 50.0);

        let (ok, _) = model.feasible(depot, target, true, false);
        assert!(ok);
        let (ok, reason) = model.feasible(depot, target, false, false);
        assert!(!ok);
        assert!(reason.unwrap().contains("below minimum"));
    }

    #[test]
    fn unsafe_weather_blocks_edge() {
        let aircraft = aircraft();
        let constraints = no_constraints();
        let weather = WeatherManager::from_samples(vec![WeatherSample {
            lat: 50.005,
            lon: 30.0,
            altitude_m: 50.0,
            timestamp: Utc::now(),
            wind_speed_10m: 20.0,
            wind_direction_10m: 0.0,
            wind_speed_80m: None,
            wind_direction_80m: None,
            temperature_2m: 15.0,
            precipitation: 0.0,
            cloud_cover: 0.0,
            visibility_km: None,
        }]);
        let model = CostModel::new(&aircraft, &constraints, &weather);

        let a = GeoPoint::new(50.0, 30.0, 50.0);
        let b = GeoPoint::new(50.01, 30.0, 50.0);
        let (ok, reason) = model.feasible(a, b, false, false);
        assert!(!ok);
        assert!(reason.unwrap().contains("Weather"));
    }
}
