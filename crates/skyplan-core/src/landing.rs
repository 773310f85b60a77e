//! Landing synthesis: rewrites the tail of a planned waypoint sequence so
//! the aircraft reaches the ground the way the mission asked for.
//!
//! Vertical mode holds an approach altitude all the way to a point directly
//! above the finish, then descends straight down. Gradual mode keeps the
//! planner's altitudes and only retags the tail, allowing a slope below the
//! minimum flight altitude.

use crate::models::{AircraftSpec, FinishPointType, LandingMode, Mission, Waypoint, WaypointType};

/// Mutate the tail of `waypoints` according to the mission's landing mode
/// and finish policy.
pub fn apply_landing(waypoints: &mut Vec<Waypoint>, aircraft: &AircraftSpec, mission: &Mission) {
    if waypoints.is_empty() {
        return;
    }

    let last_target_idx = waypoints
        .iter()
        .rposition(|wp| wp.waypoint_type == WaypointType::Target);

    match mission.finish_point_type {
        FinishPointType::LastTarget => {
            apply_last_target_landing(waypoints, aircraft, mission.landing_mode, last_target_idx)
        }
        FinishPointType::Depot | FinishPointType::Custom => {
            apply_separate_finish_landing(waypoints, aircraft, mission, last_target_idx)
        }
    }
}

/// The route ends at its last target; the landing runs between the
/// second-to-last target and that final one.
fn apply_last_target_landing(
    waypoints: &mut Vec<Waypoint>,
    aircraft: &AircraftSpec,
    landing_mode: LandingMode,
    last_target_idx: Option<usize>,
) {
    let Some(last_idx) = last_target_idx else {
        return;
    };

    match landing_mode {
        LandingMode::Vertical => {
            let last_target = waypoints[last_idx].clone();
            let approach_altitude = aircraft.min_altitude_m.max(last_target.altitude_m);

            // hold approach altitude on everything after the previous target
            let previous_target = waypoints[..last_idx]
                .iter()
                .rposition(|wp| wp.waypoint_type == WaypointType::Target);
            let from = previous_target.map(|idx| idx + 1).unwrap_or(0);
            for wp in &mut waypoints[from..last_idx] {
                if !matches!(
                    wp.waypoint_type,
                    WaypointType::Depot | WaypointType::Target
                ) {
                    wp.altitude_m = approach_altitude;
                    wp.waypoint_type = WaypointType::LandingSegment;
                }
            }

            // hover point above the final target at minimum flight altitude
            waypoints.insert(
                last_idx,
                Waypoint {
                    lat: last_target.lat,
                    lon: last_target.lon,
                    altitude_m: aircraft.min_altitude_m,
                    name: None,
                    waypoint_type: WaypointType::LandingApproach,
                },
            );

            if let Some(last) = waypoints.last_mut() {
                last.waypoint_type = WaypointType::Finish;
            }
        }
        LandingMode::Gradual => {
            let previous_target = waypoints[..last_idx]
                .iter()
                .rposition(|wp| wp.waypoint_type == WaypointType::Target);
            let from = previous_target.map(|idx| idx + 1).unwrap_or(0);
            for wp in &mut waypoints[from..last_idx] {
                if !matches!(
                    wp.waypoint_type,
                    WaypointType::Depot | WaypointType::Target
                ) {
                    wp.waypoint_type = WaypointType::LandingSegment;
                }
            }
            if let Some(last) = waypoints.last_mut() {
                last.waypoint_type = WaypointType::Finish;
            }
        }
    }
}

/// The route ends at the depot or a custom finish point past the targets.
fn apply_separate_finish_landing(
    waypoints: &mut Vec<Waypoint>,
    aircraft: &AircraftSpec,
    mission: &Mission,
    last_target_idx: Option<usize>,
) {
    let final_type = match mission.finish_point_type {
        FinishPointType::Depot => Some(WaypointType::Depot),
        FinishPointType::Custom if mission.finish_point.is_some() => Some(WaypointType::Finish),
        _ => None,
    };
    if let (Some(ty), Some(last)) = (final_type, waypoints.last_mut()) {
        last.waypoint_type = ty;
    }

    let Some(last_idx) = last_target_idx else {
        return;
    };

    match mission.landing_mode {
        LandingMode::Vertical => {
            let approach_altitude = aircraft.min_altitude_m.max(waypoints[last_idx].altitude_m);

            let len = waypoints.len();
            for wp in &mut waypoints[last_idx + 1..len] {
                if !matches!(
                    wp.waypoint_type,
                    WaypointType::Depot | WaypointType::Finish
                ) {
                    wp.altitude_m = approach_altitude;
                    wp.waypoint_type = WaypointType::LandingSegment;
                }
            }

            let finish_location = mission
                .finish_point
                .as_ref()
                .or(mission.depot.as_ref())
                .cloned();
            let Some(location) = finish_location else {
                return;
            };

            // descend point straight above the finish
            let insert_at = waypoints.len() - 1;
            waypoints.insert(
                insert_at,
                Waypoint {
                    lat: location.lat,
                    lon: location.lon,
                    altitude_m: aircraft.min_altitude_m,
                    name: None,
                    waypoint_type: WaypointType::LandingApproach,
                },
            );

            if let Some(last) = waypoints.last_mut() {
                match mission.finish_point_type {
                    FinishPointType::Depot => {
                        if let Some(depot) = &mission.depot {
                            last.waypoint_type = WaypointType::Depot;
                            last.altitude_m = depot.altitude_m;
                        }
                    }
                    FinishPointType::Custom => {
                        if let Some(finish) = &mission.finish_point {
                            last.waypoint_type = WaypointType::Finish;
                            last.altitude_m = finish.altitude_m;
                        }
                    }
                    FinishPointType::LastTarget => {}
                }
            }

            // everything between the last target and the approach holds
            // altitude instead of descending early
            let end = waypoints.len().saturating_sub(2);
            if last_idx + 1 < end {
                for wp in &mut waypoints[last_idx + 1..end] {
                    if !matches!(
                        wp.waypoint_type,
                        WaypointType::Depot | WaypointType::Finish | WaypointType::LandingApproach
                    ) {
                        wp.altitude_m = approach_altitude;
                        wp.waypoint_type = WaypointType::LandingSegment;
                    }
                }
            }
        }
        LandingMode::Gradual => {
            let end = waypoints.len().saturating_sub(1);
            if last_idx + 1 < end {
                for wp in &mut waypoints[last_idx + 1..end] {
                    wp.waypoint_type = WaypointType::LandingSegment;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aircraft() -> AircraftSpec {
        AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap()
    }

    fn waypoint(lat: f64, lon: f64, alt: f64, ty: WaypointType) -> Waypoint {
        Waypoint::new(lat, lon, alt, ty).unwrap()
    }

    fn mission_with(finish_type: FinishPointType, landing: LandingMode) -> Mission {
        let mut mission = Mission::new("landing-test", vec![aircraft()]);
        mission.set_depot(waypoint(49.99, 29.99, 0.0, WaypointType::Depot));
        mission.finish_point_type = finish_type;
        mission.landing_mode = landing;
        mission
    }

    #[test]
    fn vertical_landing_inserts_approach_above_custom_finish() {
        let mut mission = mission_with(FinishPointType::Custom, LandingMode::Vertical);
        mission.finish_point = Some(waypoint(50.03, 30.03, 0.0, WaypointType::Finish));

        let mut waypoints = vec![
            waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
            waypoint(50.00, 30.00, 50.0, WaypointType::Target),
            waypoint(50.01, 30.01, 60.0, WaypointType::Target),
            waypoint(50.02, 30.02, 40.0, WaypointType::Intermediate),
            waypoint(50.03, 30.03, 0.0, WaypointType::Finish),
        ];
        apply_landing(&mut waypoints, &aircraft(), &mission);

        let n = waypoints.len();
        let approach = &waypoints[n - 2];
        assert_eq!(approach.waypoint_type, WaypointType::LandingApproach);
        assert_eq!(approach.lat, 50.03);
        assert_eq!(approach.lon, 30.03);
        assert_eq!(approach.altitude_m, 10.0);

        let finish = &waypoints[n - 1];
        assert_eq!(finish.waypoint_type, WaypointType::Finish);
        assert_eq!(finish.altitude_m, 0.0);

        // intermediates between the last target and the approach hold
        // max(min_altitude, last_target_altitude)
        for wp in &waypoints[3..n - 2] {
            assert_eq!(wp.waypoint_type, WaypointType::LandingSegment);
            assert_eq!(wp.altitude_m, 60.0);
        }
    }

    #[test]
    fn gradual_landing_keeps_altitudes() {
        let mut mission = mission_with(FinishPointType::Depot, LandingMode::Gradual);

        let mut waypoints = vec![
            waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
            waypoint(50.00, 30.00, 50.0, WaypointType::Target),
            waypoint(49.995, 29.995, 30.0, WaypointType::Intermediate),
            waypoint(49.992, 29.992, 8.0, WaypointType::Intermediate),
            waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
        ];
        apply_landing(&mut waypoints, &aircraft(), &mission);

        assert_eq!(waypoints[2].waypoint_type, WaypointType::LandingSegment);
        assert_eq!(waypoints[2].altitude_m, 30.0);
        assert_eq!(waypoints[3].waypoint_type, WaypointType::LandingSegment);
        assert_eq!(waypoints[3].altitude_m, 8.0);
        assert_eq!(
            waypoints.last().unwrap().waypoint_type,
            WaypointType::Depot
        );
        // no approach waypoint inserted in gradual mode
        assert_eq!(waypoints.len(), 5);
    }

    #[test]
    fn last_target_vertical_lands_on_final_target() {
        let mut mission = mission_with(FinishPointType::LastTarget, LandingMode::Vertical);
        mission.depot = None;

        let mut waypoints = vec![
            waypoint(50.00, 30.00, 50.0, WaypointType::Target),
            waypoint(50.005, 30.005, 45.0, WaypointType::Intermediate),
            waypoint(50.01, 30.01, 55.0, WaypointType::Target),
        ];
        apply_landing(&mut waypoints, &aircraft(), &mission);

        assert_eq!(waypoints.len(), 4);
        // intermediate holds the approach altitude
        assert_eq!(waypoints[1].waypoint_type, WaypointType::LandingSegment);
        assert_eq!(waypoints[1].altitude_m, 55.0);
        // approach hovers above the final target at minimum altitude
        assert_eq!(waypoints[2].waypoint_type, WaypointType::LandingApproach);
        assert_eq!(waypoints[2].altitude_m, 10.0);
        assert_eq!(waypoints[2].lat, 50.01);
        assert_eq!(
            waypoints.last().unwrap().waypoint_type,
            WaypointType::Finish
        );
    }

    #[test]
    fn vertical_depot_finish_restores_ground_altitude() {
        let mission = mission_with(FinishPointType::Depot, LandingMode::Vertical);

        let mut waypoints = vec![
            waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
            waypoint(50.00, 30.00, 50.0, WaypointType::Target),
            waypoint(49.995, 29.995, 25.0, WaypointType::Intermediate),
            waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
        ];
        apply_landing(&mut waypoints, &aircraft(), &mission);

        let n = waypoints.len();
        assert_eq!(waypoints[n - 2].waypoint_type, WaypointType::LandingApproach);
        assert_eq!(waypoints[n - 2].altitude_m, 10.0);
        assert_eq!(waypoints[n - 1].waypoint_type, WaypointType::Depot);
        assert_eq!(waypoints[n - 1].altitude_m, 0.0);
        // the crossing intermediate was lifted to the approach altitude
        assert_eq!(waypoints[2].waypoint_type, WaypointType::LandingSegment);
        assert_eq!(waypoints[2].altitude_m, 50.0);
    }
}
