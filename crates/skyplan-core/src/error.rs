//! Error types for mission construction.
//!
//! Only constructors fail loudly; planning routines signal problems through
//! sentinel values and aggregated messages instead of errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("latitude must be between -90 and 90, got {0}")]
    InvalidLatitude(f64),

    #[error("longitude must be between -180 and 180, got {0}")]
    InvalidLongitude(f64),

    #[error("altitude must be non-negative, got {0}")]
    InvalidAltitude(f64),

    #[error("{name}: max_speed must be positive, got {value}")]
    InvalidSpeed { name: String, value: f64 },

    #[error("{name}: battery_capacity must be positive, got {value}")]
    InvalidBattery { name: String, value: f64 },

    #[error("{name}: power_consumption must be positive, got {value}")]
    InvalidPower { name: String, value: f64 },

    #[error("{name}: min_altitude ({min}) must be less than max_altitude ({max})")]
    InvalidAltitudeBand { name: String, min: f64, max: f64 },

    #[error("{name}: {field} must be positive, got {value}")]
    InvalidRate {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("mission requires at least one aircraft")]
    EmptyFleet,
}
