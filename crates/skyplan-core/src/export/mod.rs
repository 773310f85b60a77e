//! Exporters: QGC waypoint text for ground stations, pretty JSON for
//! everything else.

mod json;
mod qgc;

pub use json::{export_mission_json, export_route_json, import_mission_json, mission_to_json, route_to_json};
pub use qgc::{export_mission_qgc, export_route_qgc, route_to_qgc};
