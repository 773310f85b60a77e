//! Kinematic feasibility via a Dubins-airplane surrogate.

use crate::models::{AircraftSpec, Route, Waypoint};
use crate::spatial::{bearing_deg, haversine_distance};

use super::Violation;

/// Reference ground speed for the feasibility judgment (m/s).
const REFERENCE_SPEED_MPS: f64 = 15.0;

/// Simplified Dubins-airplane model: judges whether a climb or descent fits
/// the rate limits at the reference speed, and samples a straight path
/// between feasible configurations.
pub struct DubinsAirplane {
    pub turn_radius_m: f64,
    pub climb_rate_mps: f64,
    pub descent_rate_mps: f64,
}

impl DubinsAirplane {
    pub fn new(turn_radius_m: f64, climb_rate_mps: f64, descent_rate_mps: f64) -> Self {
        Self {
            turn_radius_m,
            climb_rate_mps,
            descent_rate_mps,
        }
    }

    /// Sampled path between two (lat, lon, alt, heading) configurations, or
    /// None when the required vertical rate exceeds the aircraft's limits.
    pub fn calculate_path(
        &self,
        start: (f64, f64, f64, f64),
        end: (f64, f64, f64, f64),
    ) -> Option<Vec<(f64, f64, f64)>> {
        let (lat1, lon1, alt1, _h1) = start;
        let (lat2, lon2, alt2, _h2) = end;

        let distance = haversine_distance(lat1, lon1, lat2, lon2);
        let altitude_change = alt2 - alt1;

        let time_horizontal = distance / REFERENCE_SPEED_MPS;
        let required_rate = if time_horizontal > 0.0 {
            altitude_change.abs() / time_horizontal
        } else {
            0.0
        };

        if altitude_change > 0.0 && required_rate > self.climb_rate_mps {
            return None;
        }
        if altitude_change < 0.0 && required_rate > self.descent_rate_mps {
            return None;
        }

        let num_points = ((distance / 100.0) as usize).max(10);
        let mut path = Vec::with_capacity(num_points + 1);
        for i in 0..=num_points {
            let t = i as f64 / num_points as f64;
            path.push((
                lat1 + (lat2 - lat1) * t,
                lon1 + (lon2 - lon1) * t,
                alt1 + (alt2 - alt1) * t,
            ));
        }
        Some(path)
    }
}

pub(super) fn check_route(route: &Route, aircraft: &AircraftSpec) -> Vec<Violation> {
    let mut violations = Vec::new();
    if route.waypoints.len() < 2 {
        return violations;
    }

    let dubins = DubinsAirplane::new(
        aircraft.turn_radius_m,
        aircraft.climb_rate_mps,
        aircraft.descent_rate_mps,
    );

    for i in 0..route.waypoints.len() - 1 {
        let wp1 = &route.waypoints[i];
        let wp2 = &route.waypoints[i + 1];

        let heading1 = heading(wp1, wp2);
        let heading2 = if i + 2 < route.waypoints.len() {
            heading(wp2, &route.waypoints[i + 2])
        } else {
            heading1
        };

        let start = (wp1.lat, wp1.lon, wp1.altitude_m, heading1);
        let end = (wp2.lat, wp2.lon, wp2.altitude_m, heading2);

        if dubins.calculate_path(start, end).is_none() {
            violations.push(Violation::Kinematics {
                message: format!(
                    "Segment {i}-{} is kinematically infeasible (turn radius or climb rate exceeded)",
                    i + 1
                ),
                waypoint_index: Some(i),
            });
        }
    }

    violations
}

fn heading(wp1: &Waypoint, wp2: &Waypoint) -> f64 {
    bearing_deg(wp1.lat, wp1.lon, wp2.lat, wp2.lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WaypointType;

    fn aircraft() -> AircraftSpec {
        AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap()
    }

    fn waypoint(lat: f64, lon: f64, alt: f64) -> Waypoint {
        Waypoint::new(lat, lon, alt, WaypointType::Target).unwrap()
    }

    #[test]
    fn level_route_is_feasible() {
        let route = Route::new(
            vec![waypoint(50.0, 30.0, 50.0), waypoint(50.01, 30.0, 50.0)],
            "uav-1",
        );
        assert!(check_route(&route, &aircraft()).is_empty());
    }

    #[test]
    fn impossible_climb_is_flagged() {
        let route = Route::new(
            // ~111m horizontally while climbing 60m: ~8.1 m/s at 15 m/s reference
            vec![waypoint(50.0, 30.0, 20.0), waypoint(50.001, 30.0, 80.0)],
            "uav-1",
        );
        let violations = check_route(&route, &aircraft());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message().contains("infeasible"));
    }

    #[test]
    fn dubins_path_samples_every_100m() {
        let dubins = DubinsAirplane::new(50.0, 5.0, 5.0);
        let path = dubins
            .calculate_path((50.0, 30.0, 50.0, 0.0), (50.02, 30.0, 60.0, 0.0))
            .unwrap();
        // ~2.2km at one point per 100m
        assert!(path.len() >= 20);
        let first = path.first().unwrap();
        let last = path.last().unwrap();
        assert_eq!(first.2, 50.0);
        assert_eq!(last.2, 60.0);
    }
}
