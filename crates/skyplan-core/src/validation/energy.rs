//! Battery budget check.

use crate::models::{AircraftSpec, Route};

use super::Violation;

/// Warn above this fraction of the battery.
const WARNING_FRACTION: f64 = 0.9;

pub(super) struct EnergyCheck {
    pub violation: Option<Violation>,
    pub warning: Option<Violation>,
}

pub(super) fn check_route(route: &Route, aircraft: &AircraftSpec) -> EnergyCheck {
    let total_energy = match &route.metrics {
        Some(metrics) => metrics.total_energy_wh,
        None => {
            // metric computation is side-effect free here; weatherless totals
            // are enough for the budget check
            let mut scratch = route.clone();
            scratch.compute_metrics(aircraft, None).total_energy_wh
        }
    };

    let capacity = aircraft.battery_capacity_wh;

    if total_energy > capacity {
        return EnergyCheck {
            violation: Some(Violation::Energy {
                message: format!(
                    "Route requires {total_energy:.2}Wh, exceeds battery capacity {capacity:.2}Wh"
                ),
                waypoint_index: None,
            }),
            warning: None,
        };
    }

    if total_energy > capacity * WARNING_FRACTION {
        return EnergyCheck {
            violation: None,
            warning: Some(Violation::Energy {
                message: format!(
                    "Route uses {total_energy:.2}Wh ({:.1}%), close to battery limit",
                    total_energy / capacity * 100.0
                ),
                waypoint_index: None,
            }),
        };
    }

    EnergyCheck {
        violation: None,
        warning: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Waypoint, WaypointType};

    fn waypoint(lat: f64, lon: f64, alt: f64) -> Waypoint {
        Waypoint::new(lat, lon, alt, WaypointType::Target).unwrap()
    }

    #[test]
    fn small_route_passes() {
        let aircraft = AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap();
        let route = Route::new(
            vec![waypoint(50.0, 30.0, 50.0), waypoint(50.01, 30.0, 50.0)],
            "uav-1",
        );
        let check = check_route(&route, &aircraft);
        assert!(check.violation.is_none());
        assert!(check.warning.is_none());
    }

    #[test]
    fn oversized_route_violates() {
        // tiny battery: 0.5 Wh covers well under the ~25km route
        let aircraft = AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 0.5, 50.0).unwrap();
        let route = Route::new(
            vec![
                waypoint(50.0, 30.0, 50.0),
                waypoint(50.2, 30.0, 50.0),
                waypoint(50.0, 30.0, 50.0),
            ],
            "uav-1",
        );
        let check = check_route(&route, &aircraft);
        assert!(check.violation.is_some());
    }

    #[test]
    fn near_limit_route_warns() {
        let aircraft = AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap();
        let mut route = Route::new(
            vec![waypoint(50.0, 30.0, 50.0), waypoint(50.01, 30.0, 50.0)],
            "uav-1",
        );
        // pre-computed metrics are trusted as-is
        route.compute_metrics(&aircraft, None);
        route.metrics.as_mut().unwrap().total_energy_wh = 95.0;

        let check = check_route(&route, &aircraft);
        assert!(check.violation.is_none());
        assert!(check.warning.is_some());
    }
}
