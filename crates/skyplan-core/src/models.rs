//! Core data models for mission planning.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::spatial::GeoPoint;
use crate::validation::ValidationVerdict;
use crate::zones::MissionConstraints;

/// Role of a waypoint inside a planned route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointType {
    /// Start (and usually end) position on the ground
    Depot,
    /// Point the mission must visit
    Target,
    /// Chosen end of the route
    Finish,
    /// Inserted by a planner between targets
    Intermediate,
    /// Part of the landing sequence, exempt from descent-rate checks
    LandingSegment,
    /// Hover point directly above the finish at minimum flight altitude
    LandingApproach,
}

impl WaypointType {
    /// Ground points are exempt from minimum-altitude checks.
    pub fn is_ground(self) -> bool {
        matches!(self, WaypointType::Depot | WaypointType::Finish)
    }

    pub fn is_landing(self) -> bool {
        matches!(
            self,
            WaypointType::LandingSegment | WaypointType::LandingApproach
        )
    }
}

fn default_waypoint_type() -> WaypointType {
    WaypointType::Target
}

/// A point in 3D space a route passes through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_waypoint_type")]
    pub waypoint_type: WaypointType,
}

impl Waypoint {
    pub fn new(
        lat: f64,
        lon: f64,
        altitude_m: f64,
        waypoint_type: WaypointType,
    ) -> Result<Self, ModelError> {
        let wp = Self {
            lat,
            lon,
            altitude_m,
            name: None,
            waypoint_type,
        };
        wp.validate()?;
        Ok(wp)
    }

    pub fn named(
        lat: f64,
        lon: f64,
        altitude_m: f64,
        waypoint_type: WaypointType,
        name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let mut wp = Self::new(lat, lon, altitude_m, waypoint_type)?;
        wp.name = Some(name.into());
        Ok(wp)
    }

    /// Check the coordinate invariants. Deserialized waypoints must be
    /// validated before planning starts.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ModelError::InvalidLatitude(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(ModelError::InvalidLongitude(self.lon));
        }
        if self.altitude_m < 0.0 {
            return Err(ModelError::InvalidAltitude(self.altitude_m));
        }
        Ok(())
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon, self.altitude_m)
    }

    /// Same horizontal position, ignoring altitude and type.
    pub fn same_location(&self, other: &Waypoint) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

fn default_turn_radius() -> f64 {
    50.0
}

fn default_climb_rate() -> f64 {
    5.0
}

fn default_descent_rate() -> f64 {
    5.0
}

/// Capabilities and limits of one aircraft in the fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftSpec {
    pub name: String,
    pub max_speed_mps: f64,
    pub max_altitude_m: f64,
    pub min_altitude_m: f64,
    /// Battery capacity in Wh
    pub battery_capacity_wh: f64,
    /// Power draw at cruise in W
    pub power_consumption_w: f64,
    /// Flight time limit in seconds; derived from the battery when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_flight_time_s: Option<f64>,
    /// Range limit in meters; derived from speed and flight time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_range_m: Option<f64>,
    #[serde(default = "default_turn_radius")]
    pub turn_radius_m: f64,
    #[serde(default = "default_climb_rate")]
    pub climb_rate_mps: f64,
    #[serde(default = "default_descent_rate")]
    pub descent_rate_mps: f64,
}

impl AircraftSpec {
    pub fn new(
        name: impl Into<String>,
        max_speed_mps: f64,
        min_altitude_m: f64,
        max_altitude_m: f64,
        battery_capacity_wh: f64,
        power_consumption_w: f64,
    ) -> Result<Self, ModelError> {
        let spec = Self {
            name: name.into(),
            max_speed_mps,
            max_altitude_m,
            min_altitude_m,
            battery_capacity_wh,
            power_consumption_w,
            max_flight_time_s: None,
            max_range_m: None,
            turn_radius_m: default_turn_radius(),
            climb_rate_mps: default_climb_rate(),
            descent_rate_mps: default_descent_rate(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.max_speed_mps <= 0.0 {
            return Err(ModelError::InvalidSpeed {
                name: self.name.clone(),
                value: self.max_speed_mps,
            });
        }
        if self.battery_capacity_wh <= 0.0 {
            return Err(ModelError::InvalidBattery {
                name: self.name.clone(),
                value: self.battery_capacity_wh,
            });
        }
        if self.power_consumption_w <= 0.0 {
            return Err(ModelError::InvalidPower {
                name: self.name.clone(),
                value: self.power_consumption_w,
            });
        }
        if self.min_altitude_m < 0.0 || self.min_altitude_m >= self.max_altitude_m {
            return Err(ModelError::InvalidAltitudeBand {
                name: self.name.clone(),
                min: self.min_altitude_m,
                max: self.max_altitude_m,
            });
        }
        for (field, value) in [
            ("turn_radius", self.turn_radius_m),
            ("climb_rate", self.climb_rate_mps),
            ("descent_rate", self.descent_rate_mps),
        ] {
            if value <= 0.0 {
                return Err(ModelError::InvalidRate {
                    name: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Flight time limit in seconds, derived from the battery unless set.
    pub fn max_flight_time(&self) -> f64 {
        self.max_flight_time_s
            .unwrap_or(self.battery_capacity_wh / self.power_consumption_w * 3600.0)
    }

    /// Range limit in meters, derived from speed and flight time unless set.
    pub fn max_range(&self) -> f64 {
        self.max_range_m
            .unwrap_or(self.max_speed_mps * self.max_flight_time())
    }

    /// Time in seconds to cover a segment, limited by the slower of the
    /// horizontal and vertical motion.
    pub fn estimate_flight_time(&self, distance_m: f64, altitude_change_m: f64) -> f64 {
        let horizontal = distance_m / self.max_speed_mps;
        let vertical = altitude_change_m.abs() / self.climb_rate_mps;
        horizontal.max(vertical)
    }

    /// Energy for a segment in Wh at the cruise power draw.
    pub fn estimate_energy(&self, distance_m: f64, altitude_change_m: f64) -> f64 {
        self.power_consumption_w * self.estimate_flight_time(distance_m, altitude_change_m) / 3600.0
    }
}

/// Where a route is required to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishPointType {
    #[default]
    Depot,
    LastTarget,
    Custom,
}

impl FromStr for FinishPointType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "depot" => Ok(FinishPointType::Depot),
            "last_target" => Ok(FinishPointType::LastTarget),
            "custom" => Ok(FinishPointType::Custom),
            other => Err(format!("unknown finish point type: {other}")),
        }
    }
}

/// How the tail of the route reaches the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingMode {
    /// Hold approach altitude, then descend straight down over the finish
    #[default]
    Vertical,
    /// Descend along the final segments, possibly below minimum flight altitude
    Gradual,
}

impl FromStr for LandingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertical" => Ok(LandingMode::Vertical),
            "gradual" => Ok(LandingMode::Gradual),
            other => Err(format!("unknown landing mode: {other}")),
        }
    }
}

impl fmt::Display for LandingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandingMode::Vertical => write!(f, "vertical"),
            LandingMode::Gradual => write!(f, "gradual"),
        }
    }
}

/// A complete planning problem: fleet, targets, depot and constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub name: String,
    pub fleet: Vec<AircraftSpec>,
    pub target_points: Vec<Waypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot: Option<Waypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_point: Option<Waypoint>,
    #[serde(default)]
    pub finish_point_type: FinishPointType,
    #[serde(default)]
    pub landing_mode: LandingMode,
    #[serde(default)]
    pub constraints: MissionConstraints,
    /// aircraft name -> planned route
    #[serde(default)]
    pub routes: BTreeMap<String, Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Mission {
    pub fn new(name: impl Into<String>, fleet: Vec<AircraftSpec>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            fleet,
            target_points: Vec::new(),
            depot: None,
            finish_point: None,
            finish_point_type: FinishPointType::default(),
            landing_mode: LandingMode::default(),
            constraints: MissionConstraints::default(),
            routes: BTreeMap::new(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Validate every constructor invariant after deserialization.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.fleet.is_empty() {
            return Err(ModelError::EmptyFleet);
        }
        for aircraft in &self.fleet {
            aircraft.validate()?;
        }
        for wp in &self.target_points {
            wp.validate()?;
        }
        if let Some(depot) = &self.depot {
            depot.validate()?;
        }
        if let Some(finish) = &self.finish_point {
            finish.validate()?;
        }
        Ok(())
    }

    pub fn set_depot(&mut self, mut waypoint: Waypoint) {
        waypoint.waypoint_type = WaypointType::Depot;
        self.depot = Some(waypoint);
        self.touch();
    }

    pub fn add_target(&mut self, waypoint: Waypoint) {
        self.target_points.push(waypoint);
        self.touch();
    }

    pub fn add_route(&mut self, aircraft_name: impl Into<String>, mut route: Route) {
        let name = aircraft_name.into();
        route.aircraft_name = Some(name.clone());
        self.routes.insert(name, route);
        self.touch();
    }

    pub fn aircraft(&self, name: &str) -> Option<&AircraftSpec> {
        self.fleet.iter().find(|a| a.name == name)
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// Aggregate figures for a planned route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub total_distance_m: f64,
    pub total_time_s: f64,
    pub total_energy_wh: f64,
    pub max_altitude_m: f64,
    pub min_altitude_m: f64,
    pub waypoint_count: usize,
    /// 0-1, higher = more risky
    pub risk_score: f64,
    pub avg_speed_mps: f64,
}

/// Planned flight path for one aircraft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub waypoints: Vec<Waypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RouteMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationVerdict>,
}

impl Route {
    pub fn new(waypoints: Vec<Waypoint>, aircraft_name: impl Into<String>) -> Self {
        Self {
            waypoints,
            aircraft_name: Some(aircraft_name.into()),
            metrics: None,
            validation: None,
        }
    }

    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    /// Index of the last waypoint marked as a target, if any.
    pub fn last_target_index(&self) -> Option<usize> {
        self.waypoints
            .iter()
            .rposition(|wp| wp.waypoint_type == WaypointType::Target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_rejects_bad_coordinates() {
        assert!(Waypoint::new(91.0, 0.0, 0.0, WaypointType::Target).is_err());
        assert!(Waypoint::new(0.0, 181.0, 0.0, WaypointType::Target).is_err());
        assert!(Waypoint::new(0.0, 0.0, -1.0, WaypointType::Target).is_err());
        assert!(Waypoint::new(50.0, 30.0, 100.0, WaypointType::Target).is_ok());
    }

    #[test]
    fn aircraft_derives_flight_time_and_range() {
        let spec = AircraftSpec::new("uav-1", 15.0, 10.0, 120.0, 100.0, 50.0).unwrap();
        assert!((spec.max_flight_time() - 7200.0).abs() < 1e-9);
        assert!((spec.max_range() - 108_000.0).abs() < 1e-9);
    }

    #[test]
    fn aircraft_rejects_inverted_altitude_band() {
        assert!(AircraftSpec::new("bad", 15.0, 120.0, 120.0, 100.0, 50.0).is_err());
        assert!(AircraftSpec::new("bad", 0.0, 10.0, 120.0, 100.0, 50.0).is_err());
    }

    #[test]
    fn waypoint_json_round_trip_is_identity() {
        let wp = Waypoint::named(50.01, 30.02, 55.5, WaypointType::Target, "alpha").unwrap();
        let json = serde_json::to_string(&wp).unwrap();
        let back: Waypoint = serde_json::from_str(&json).unwrap();
        assert_eq!(wp, back);
    }

    #[test]
    fn route_json_round_trip_preserves_metrics() {
        let mut route = Route::new(
            vec![Waypoint::new(50.0, 30.0, 0.0, WaypointType::Depot).unwrap()],
            "uav-1",
        );
        route.metrics = Some(RouteMetrics {
            total_distance_m: 1234.5,
            waypoint_count: 1,
            ..Default::default()
        });
        let json = serde_json::to_string_pretty(&route).unwrap();
        let back: Route = serde_json::from_str(&json).unwrap();
        assert_eq!(back.waypoints, route.waypoints);
        assert_eq!(back.metrics, route.metrics);
    }

    #[test]
    fn last_target_index_finds_rightmost_target() {
        let mut route = Route::new(Vec::new(), "uav-1");
        route.add_waypoint(Waypoint::new(50.0, 30.0, 0.0, WaypointType::Depot).unwrap());
        route.add_waypoint(Waypoint::new(50.01, 30.0, 50.0, WaypointType::Target).unwrap());
        route.add_waypoint(Waypoint::new(50.02, 30.0, 50.0, WaypointType::Target).unwrap());
        route.add_waypoint(Waypoint::new(50.0, 30.0, 0.0, WaypointType::Depot).unwrap());
        assert_eq!(route.last_target_index(), Some(2));
    }
}
