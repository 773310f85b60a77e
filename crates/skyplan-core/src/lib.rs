//! Mission planning core for small unmanned aircraft.
//!
//! Pure logic, no networking: fleet assignment, a weather-aware cost model,
//! graph-search planners (A*, Theta*, D* Lite), route refinement, landing
//! synthesis and validation. An external weather client plugs in through
//! the [`weather::WeatherProvider`] trait.

pub mod cost;
pub mod error;
pub mod export;
pub mod graph;
pub mod landing;
pub mod metrics;
pub mod models;
pub mod optimize;
pub mod ordering;
pub mod orchestrator;
pub mod planners;
pub mod route_planner;
pub mod spatial;
pub mod validation;
pub mod vrp;
pub mod weather;
pub mod zones;

pub use error::ModelError;
pub use models::{
    AircraftSpec, FinishPointType, LandingMode, Mission, Route, RouteMetrics, Waypoint,
    WaypointType,
};
pub use orchestrator::{MissionOrchestrator, PlanOptions};
pub use optimize::OptimizationAlgorithm;
pub use ordering::OptimizationMetric;
pub use planners::Algorithm;
pub use validation::{ValidationVerdict, Violation};
pub use weather::{WeatherManager, WeatherProvider, WeatherSample};
pub use zones::{MissionConstraints, NoFlyZone};
