//! QGC WPL 110 waypoint text.
//!
//! Tab-delimited, LF line endings. The first row is a TAKEOFF, the last a
//! LAND; DO_CHANGE_SPEED rows are inserted when the cruise speed changes by
//! more than 0.1 m/s and a CONDITION_YAW row precedes every plain waypoint.

use std::fs;
use std::io;
use std::path::Path;

use crate::models::{AircraftSpec, Mission, Route, Waypoint, WaypointType};
use crate::spatial::bearing_deg;

// MAVLink command codes
const MAV_CMD_NAV_WAYPOINT: u16 = 16;
const MAV_CMD_NAV_LAND: u16 = 21;
const MAV_CMD_NAV_TAKEOFF: u16 = 22;
const MAV_CMD_CONDITION_YAW: u16 = 115;
const MAV_CMD_DO_CHANGE_SPEED: u16 = 178;

/// Render a route as QGC waypoint text.
pub fn route_to_qgc(route: &Route, aircraft: Option<&AircraftSpec>) -> String {
    let mut lines = vec!["QGC WPL 110".to_string()];

    let avg_speed = route
        .metrics
        .as_ref()
        .map(|m| m.avg_speed_mps)
        .filter(|v| *v > 0.0);

    let mut previous_speed: Option<f64> = None;
    let mut row_index = 0usize;
    let total = route.waypoints.len();

    for (idx, waypoint) in route.waypoints.iter().enumerate() {
        let command = command_for(waypoint, idx, total);
        let yaw = yaw_for(route, idx);
        let speed = segment_speed(aircraft, avg_speed);

        if let Some(previous) = previous_speed {
            if (speed - previous).abs() > 0.1 {
                // param1 = 1 selects ground speed, param3 = -1 keeps throttle
                lines.push(format!(
                    "{row_index}\t0\t0\t{MAV_CMD_DO_CHANGE_SPEED}\t1.0\t{speed:.2}\t-1.0\t0.0\t0.0\t0.0\t0.0\t1"
                ));
                row_index += 1;
            }
        }

        if idx > 0 && command == MAV_CMD_NAV_WAYPOINT {
            // param2 = 45 deg/s angular speed, param3 = -1 shortest direction
            lines.push(format!(
                "{row_index}\t0\t0\t{MAV_CMD_CONDITION_YAW}\t{yaw:.2}\t45.0\t-1.0\t0.0\t0.0\t0.0\t0.0\t1"
            ));
            row_index += 1;
        }

        // hold for a moment over targets; otherwise the acceptance radius
        let param1 = if waypoint.waypoint_type == WaypointType::Target && idx < total - 1 {
            2.0
        } else {
            5.0
        };
        let param3 = if command == MAV_CMD_NAV_WAYPOINT {
            yaw
        } else {
            -1.0
        };

        let current_wp = u8::from(idx == 0);
        lines.push(format!(
            "{row_index}\t{current_wp}\t0\t{command}\t{param1:.6}\t{:.6}\t{param3:.6}\t{:.6}\t{:.10}\t{:.10}\t{:.2}\t1",
            0.0, 0.0, waypoint.lat, waypoint.lon, waypoint.altitude_m
        ));
        row_index += 1;
        previous_speed = Some(speed);
    }

    lines.join("\n")
}

pub fn export_route_qgc(
    route: &Route,
    path: impl AsRef<Path>,
    aircraft: Option<&AircraftSpec>,
) -> io::Result<()> {
    fs::write(path, route_to_qgc(route, aircraft))
}

/// One file per aircraft: `<mission>_<aircraft>.waypoints`.
pub fn export_mission_qgc(mission: &Mission, output_dir: impl AsRef<Path>) -> io::Result<()> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    for (aircraft_name, route) in &mission.routes {
        let aircraft = mission.aircraft(aircraft_name);
        let file = output_dir.join(format!("{}_{}.waypoints", mission.name, aircraft_name));
        export_route_qgc(route, file, aircraft)?;
    }
    Ok(())
}

fn command_for(waypoint: &Waypoint, idx: usize, total: usize) -> u16 {
    if idx == 0 {
        return MAV_CMD_NAV_TAKEOFF;
    }
    if idx == total - 1 {
        return MAV_CMD_NAV_LAND;
    }
    match waypoint.waypoint_type {
        WaypointType::LandingSegment | WaypointType::LandingApproach | WaypointType::Finish => {
            MAV_CMD_NAV_LAND
        }
        _ => MAV_CMD_NAV_WAYPOINT,
    }
}

/// Bearing to the next waypoint, or from the previous one on the final row.
fn yaw_for(route: &Route, idx: usize) -> f64 {
    let waypoints = &route.waypoints;
    if idx + 1 < waypoints.len() {
        let wp1 = &waypoints[idx];
        let wp2 = &waypoints[idx + 1];
        bearing_deg(wp1.lat, wp1.lon, wp2.lat, wp2.lon)
    } else if idx > 0 {
        let wp1 = &waypoints[idx - 1];
        let wp2 = &waypoints[idx];
        bearing_deg(wp1.lat, wp1.lon, wp2.lat, wp2.lon)
    } else {
        0.0
    }
}

fn segment_speed(aircraft: Option<&AircraftSpec>, avg_speed: Option<f64>) -> f64 {
    if let Some(speed) = avg_speed {
        return speed;
    }
    if let Some(aircraft) = aircraft {
        if aircraft.max_speed_mps > 0.0 {
            return aircraft.max_speed_mps * 0.7;
        }
    }
    10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoint(lat: f64, lon: f64, alt: f64, ty: WaypointType) -> Waypoint {
        Waypoint::new(lat, lon, alt, ty).unwrap()
    }

    fn sample_route() -> Route {
        Route::new(
            vec![
                waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
                waypoint(50.0, 30.0, 50.0, WaypointType::Target),
                waypoint(50.01, 30.01, 60.0, WaypointType::Target),
                waypoint(49.99, 29.99, 0.0, WaypointType::Depot),
            ],
            "uav-1",
        )
    }

    #[test]
    fn header_takeoff_and_land_commands() {
        let text = route_to_qgc(&sample_route(), None);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "QGC WPL 110");

        let first: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(first[1], "1"); // current_wp only on the first row
        assert_eq!(first[3], "22"); // TAKEOFF

        let last: Vec<&str> = lines.last().unwrap().split('\t').collect();
        assert_eq!(last[1], "0");
        assert_eq!(last[3], "21"); // LAND
    }

    #[test]
    fn yaw_rows_precede_plain_waypoints() {
        let text = route_to_qgc(&sample_route(), None);
        let lines: Vec<&str> = text.lines().collect();

        // rows 2 and 3 (after header/takeoff): yaw command then waypoint
        let yaw_row: Vec<&str> = lines[2].split('\t').collect();
        assert_eq!(yaw_row[3], "115");
        assert_eq!(yaw_row[5], "45.0");

        let wp_row: Vec<&str> = lines[3].split('\t').collect();
        assert_eq!(wp_row[3], "16");
    }

    #[test]
    fn coordinates_carry_fixed_precision() {
        let text = route_to_qgc(&sample_route(), None);
        let lines: Vec<&str> = text.lines().collect();
        let wp_row: Vec<&str> = lines[1].split('\t').collect();

        // lat/lon at 10 fractional digits, altitude at 2
        assert_eq!(wp_row[8], "49.9900000000");
        assert_eq!(wp_row[9], "29.9900000000");
        assert_eq!(wp_row[10], "0.00");
        assert_eq!(wp_row[11], "1"); // autocontinue
    }

    #[test]
    fn row_indices_are_sequential() {
        let text = route_to_qgc(&sample_route(), None);
        for (i, line) in text.lines().skip(1).enumerate() {
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields[0], i.to_string());
            assert_eq!(fields.len(), 12);
        }
    }
}
