//! Altitude band and climb/descent rate checks.

use crate::models::{AircraftSpec, Route, WaypointType};
use crate::spatial::haversine_distance;
use crate::zones::MissionConstraints;

use super::Violation;

pub(super) fn check_route(
    route: &Route,
    aircraft: &AircraftSpec,
    constraints: Option<&MissionConstraints>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (idx, wp) in route.waypoints.iter().enumerate() {
        // depot/finish sit on the ground and the landing sequence dips below
        // the flight floor on purpose
        let exempt_from_min = wp.waypoint_type.is_ground() || wp.waypoint_type.is_landing();

        if !exempt_from_min && wp.altitude_m < aircraft.min_altitude_m {
            violations.push(Violation::Altitude {
                message: format!(
                    "Waypoint {idx} altitude {}m is below aircraft minimum {}m",
                    wp.altitude_m, aircraft.min_altitude_m
                ),
                waypoint_index: Some(idx),
            });
        }

        if wp.altitude_m > aircraft.max_altitude_m {
            violations.push(Violation::Altitude {
                message: format!(
                    "Waypoint {idx} altitude {}m is above aircraft maximum {}m",
                    wp.altitude_m, aircraft.max_altitude_m
                ),
                waypoint_index: Some(idx),
            });
        }

        if let Some(constraints) = constraints {
            if let Some(min) = constraints.min_altitude_m {
                if !exempt_from_min && wp.altitude_m < min {
                    violations.push(Violation::Altitude {
                        message: format!(
                            "Waypoint {idx} altitude {}m is below mission minimum {min}m",
                            wp.altitude_m
                        ),
                        waypoint_index: Some(idx),
                    });
                }
            }
            if let Some(max) = constraints.max_altitude_m {
                if wp.altitude_m > max {
                    violations.push(Violation::Altitude {
                        message: format!(
                            "Waypoint {idx} altitude {}m is above mission maximum {max}m",
                            wp.altitude_m
                        ),
                        waypoint_index: Some(idx),
                    });
                }
            }
        }

        if idx == 0 {
            continue;
        }
        let prev = &route.waypoints[idx - 1];
        let altitude_change = wp.altitude_m - prev.altitude_m;
        let distance = haversine_distance(prev.lat, prev.lon, wp.lat, wp.lon);
        if distance <= 0.0 {
            continue;
        }

        let time = distance / aircraft.max_speed_mps;
        let required_rate = altitude_change.abs() / time;

        if altitude_change > 0.0 && required_rate > aircraft.climb_rate_mps {
            violations.push(Violation::Altitude {
                message: format!(
                    "Waypoint {idx} requires climb rate {required_rate:.2}m/s, exceeds maximum {}m/s",
                    aircraft.climb_rate_mps
                ),
                waypoint_index: Some(idx),
            });
        }

        // vertical landings descend straight down over the finish
        let skip_descent_check = matches!(
            wp.waypoint_type,
            WaypointType::LandingSegment
                | WaypointType::LandingApproach
                | WaypointType::Finish
                | WaypointType::Depot
        ) || prev.waypoint_type.is_landing();

        if altitude_change < 0.0 && required_rate > aircraft.descent_rate_mps && !skip_descent_check
        {
            violations.push(Violation::Altitude {
                message: format!(
                    "Waypoint {idx} requires descent rate {required_rate:.2}m/s, exceeds maximum {}m/s",
                    aircraft.descent_rate_mps
                ),
                waypoint_index: Some(idx),
            });
        }
    }

    violations
}
