//! No-fly zone checks over a finished route.

use crate::models::Route;
use crate::zones::MissionConstraints;

use super::Violation;

pub(super) fn check_route(route: &Route, constraints: &MissionConstraints) -> Vec<Violation> {
    let mut violations = Vec::new();

    if route.waypoints.is_empty() || constraints.no_fly_zones.is_empty() {
        return violations;
    }

    for (idx, wp) in route.waypoints.iter().enumerate() {
        for zone in &constraints.no_fly_zones {
            if zone.contains_point(wp.lat, wp.lon, wp.altitude_m) {
                violations.push(Violation::NoFlyZone {
                    message: format!(
                        "Waypoint {idx} is in no-fly zone: {}",
                        zone.display_name()
                    ),
                    waypoint_index: Some(idx),
                });
            }
        }
    }

    for (idx, pair) in route.waypoints.windows(2).enumerate() {
        let wp1 = &pair[0];
        let wp2 = &pair[1];
        for zone in &constraints.no_fly_zones {
            if zone.crosses_segment(
                wp1.lat,
                wp1.lon,
                wp1.altitude_m,
                wp2.lat,
                wp2.lon,
                wp2.altitude_m,
            ) {
                violations.push(Violation::NoFlyZone {
                    message: format!(
                        "Route segment {idx}-{} intersects no-fly zone: {}",
                        idx + 1,
                        zone.display_name()
                    ),
                    waypoint_index: Some(idx),
                });
            }
        }
    }

    violations
}
