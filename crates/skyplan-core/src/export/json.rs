//! JSON import/export for missions and routes.

use std::fs;
use std::io;
use std::path::Path;

use crate::models::{Mission, Route};

pub fn route_to_json(route: &Route) -> serde_json::Result<String> {
    serde_json::to_string_pretty(route)
}

pub fn mission_to_json(mission: &Mission) -> serde_json::Result<String> {
    serde_json::to_string_pretty(mission)
}

pub fn export_route_json(route: &Route, path: impl AsRef<Path>) -> io::Result<()> {
    let json = route_to_json(route).map_err(io::Error::other)?;
    fs::write(path, json)
}

pub fn export_mission_json(mission: &Mission, path: impl AsRef<Path>) -> io::Result<()> {
    let json = mission_to_json(mission).map_err(io::Error::other)?;
    fs::write(path, json)
}

pub fn import_mission_json(path: impl AsRef<Path>) -> io::Result<Mission> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(io::Error::other)
}
