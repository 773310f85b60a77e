//! Route validation: zone, altitude, energy and kinematic checks feeding a
//! single tagged verdict.
//!
//! Violations mark the route invalid but never abort planning; the caller
//! decides whether to accept the route.

mod altitude;
mod energy;
mod kinematics;
mod zone;

pub use kinematics::DubinsAirplane;

use serde::{Deserialize, Serialize};

use crate::models::{AircraftSpec, Route};
use crate::zones::MissionConstraints;

/// One finding, tagged by the checker that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Violation {
    NoFlyZone {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        waypoint_index: Option<usize>,
    },
    Altitude {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        waypoint_index: Option<usize>,
    },
    Energy {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        waypoint_index: Option<usize>,
    },
    Kinematics {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        waypoint_index: Option<usize>,
    },
}

impl Violation {
    pub fn message(&self) -> &str {
        match self {
            Violation::NoFlyZone { message, .. }
            | Violation::Altitude { message, .. }
            | Violation::Energy { message, .. }
            | Violation::Kinematics { message, .. } => message,
        }
    }
}

/// Outcome of validating one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Violation>,
}

impl Default for ValidationVerdict {
    fn default() -> Self {
        Self {
            is_valid: true,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationVerdict {
    pub fn add_violation(&mut self, violation: Violation) {
        self.is_valid = false;
        self.violations.push(violation);
    }

    pub fn add_warning(&mut self, warning: Violation) {
        self.warnings.push(warning);
    }
}

/// Runs every checker over a route.
#[derive(Debug, Default)]
pub struct RouteValidator;

impl RouteValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_route(
        &self,
        route: &Route,
        aircraft: &AircraftSpec,
        constraints: Option<&MissionConstraints>,
    ) -> ValidationVerdict {
        let mut verdict = ValidationVerdict::default();

        if route.waypoints.is_empty() {
            verdict.add_violation(Violation::Altitude {
                message: "Route has no waypoints".to_string(),
                waypoint_index: None,
            });
            return verdict;
        }

        if let Some(constraints) = constraints {
            for violation in zone::check_route(route, constraints) {
                verdict.add_violation(violation);
            }
        }

        for violation in altitude::check_route(route, aircraft, constraints) {
            verdict.add_violation(violation);
        }

        let energy = energy::check_route(route, aircraft);
        if let Some(violation) = energy.violation {
            verdict.add_violation(violation);
        }
        if let Some(warning) = energy.warning {
            verdict.add_warning(warning);
        }

        for violation in kinematics::check_route(route, aircraft) {
            verdict.add_violation(violation);
        }

        verdict
    }
}
