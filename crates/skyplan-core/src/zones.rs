//! No-fly zones and mission-level constraints.
//!
//! A zone is a 2D polygon (or multipolygon) combined with an altitude band.
//! A point is inside the zone iff the 2D point is inside or on the polygon
//! AND the altitude falls within the band.

use serde::{Deserialize, Serialize};

use crate::spatial::haversine_distance;

fn default_zone_ceiling() -> f64 {
    1000.0
}

fn default_return_to_depot() -> bool {
    true
}

/// A geographic region closed to flight within an altitude band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoFlyZone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Polygon parts; each is a ring of [lat, lon] vertices (closed ring -
    /// first == last). A single entry is a plain polygon.
    pub polygons: Vec<Vec<[f64; 2]>>,
    /// Lower altitude limit in meters (floor)
    #[serde(default)]
    pub min_altitude_m: f64,
    /// Upper altitude limit in meters (ceiling)
    #[serde(default = "default_zone_ceiling")]
    pub max_altitude_m: f64,
}

impl NoFlyZone {
    pub fn polygon(ring: Vec<[f64; 2]>, min_altitude_m: f64, max_altitude_m: f64) -> Self {
        Self {
            name: None,
            polygons: vec![ring],
            min_altitude_m,
            max_altitude_m,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Validate zone configuration. Returns list of problems (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.polygons.is_empty() {
            errors.push("Zone must have at least one polygon".to_string());
        }
        for ring in &self.polygons {
            if ring.len() < 3 {
                errors.push("Polygon must have at least 3 vertices".to_string());
                continue;
            }
            let first = ring.first().unwrap();
            let last = ring.last().unwrap();
            if (first[0] - last[0]).abs() > 1e-4 || (first[1] - last[1]).abs() > 1e-4 {
                errors.push("Polygon must be closed (first vertex must equal last)".to_string());
            }
        }
        if self.min_altitude_m >= self.max_altitude_m {
            errors.push(format!(
                "Lower altitude ({}) must be less than upper altitude ({})",
                self.min_altitude_m, self.max_altitude_m
            ));
        }
        if self.min_altitude_m < 0.0 {
            errors.push("Lower altitude cannot be negative".to_string());
        }
        errors
    }

    /// Check if a point at the given altitude lies within the zone.
    /// The polygon boundary counts as inside.
    pub fn contains_point(&self, lat: f64, lon: f64, altitude_m: f64) -> bool {
        if altitude_m < self.min_altitude_m || altitude_m > self.max_altitude_m {
            return false;
        }
        self.polygons
            .iter()
            .any(|ring| ring_contains(ring, lat, lon))
    }

    /// Check if the 2D projection of a segment intersects the zone polygon.
    /// Altitude is ignored here; see [`NoFlyZone::crosses_segment`].
    pub fn intersects_segment_2d(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> bool {
        for ring in &self.polygons {
            if ring_contains(ring, lat1, lon1) || ring_contains(ring, lat2, lon2) {
                return true;
            }
            let n = ring.len();
            if n < 2 {
                continue;
            }
            for i in 0..n - 1 {
                let a = ring[i];
                let b = ring[i + 1];
                if segments_intersect(
                    lon1, lat1, lon2, lat2, //
                    a[1], a[0], b[1], b[0],
                ) {
                    return true;
                }
            }
        }
        false
    }

    /// True when the segment's 2D line intersects the polygon AND the
    /// segment's altitude interval overlaps the zone band.
    #[allow(clippy::too_many_arguments)]
    pub fn crosses_segment(
        &self,
        lat1: f64,
        lon1: f64,
        alt1: f64,
        lat2: f64,
        lon2: f64,
        alt2: f64,
    ) -> bool {
        let min_alt = alt1.min(alt2);
        let max_alt = alt1.max(alt2);
        if !(self.min_altitude_m <= max_alt && self.max_altitude_m >= min_alt) {
            return false;
        }
        self.intersects_segment_2d(lat1, lon1, lat2, lon2)
    }
}

/// Ray casting with an explicit boundary test, so points exactly on an edge
/// count as contained.
fn ring_contains(ring: &[[f64; 2]], lat: f64, lon: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    for i in 0..n - 1 {
        let a = ring[i];
        let b = ring[i + 1];
        if point_on_segment(lon, lat, a[1], a[0], b[1], b[0]) {
            return true;
        }
    }

    // Ray casting: count intersections with polygon edges
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = ring[i][0];
        let xi = ring[i][1];
        let yj = ring[j][0];
        let xj = ring[j][1];

        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Signed area of the triangle (a, b, c); zero when collinear.
fn orientation(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) -> f64 {
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

fn point_on_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> bool {
    if orientation(ax, ay, bx, by, px, py).abs() > 1e-12 {
        return false;
    }
    px >= ax.min(bx) && px <= ax.max(bx) && py >= ay.min(by) && py <= ay.max(by)
}

/// Exact segment-segment intersection, touching endpoints included.
#[allow(clippy::too_many_arguments)]
fn segments_intersect(
    p1x: f64,
    p1y: f64,
    p2x: f64,
    p2y: f64,
    p3x: f64,
    p3y: f64,
    p4x: f64,
    p4y: f64,
) -> bool {
    let d1 = orientation(p3x, p3y, p4x, p4y, p1x, p1y);
    let d2 = orientation(p3x, p3y, p4x, p4y, p2x, p2y);
    let d3 = orientation(p1x, p1y, p2x, p2y, p3x, p3y);
    let d4 = orientation(p1x, p1y, p2x, p2y, p4x, p4y);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && point_on_segment(p1x, p1y, p3x, p3y, p4x, p4y))
        || (d2 == 0.0 && point_on_segment(p2x, p2y, p3x, p3y, p4x, p4y))
        || (d3 == 0.0 && point_on_segment(p3x, p3y, p1x, p1y, p2x, p2y))
        || (d4 == 0.0 && point_on_segment(p4x, p4y, p1x, p1y, p2x, p2y))
}

/// Mission-wide restrictions applied on top of aircraft limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConstraints {
    #[serde(default)]
    pub no_fly_zones: Vec<NoFlyZone>,
    /// Global minimum flight altitude in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_altitude_m: Option<f64>,
    /// Global maximum flight altitude in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_altitude_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_flight_time_s: Option<f64>,
    #[serde(default = "default_return_to_depot")]
    pub require_return_to_depot: bool,
}

impl Default for MissionConstraints {
    fn default() -> Self {
        Self {
            no_fly_zones: Vec::new(),
            min_altitude_m: None,
            max_altitude_m: None,
            max_distance_m: None,
            max_flight_time_s: None,
            require_return_to_depot: true,
        }
    }
}

impl MissionConstraints {
    pub fn add_no_fly_zone(&mut self, zone: NoFlyZone) {
        self.no_fly_zones.push(zone);
    }

    /// Check a single point against altitude limits and no-fly zones.
    /// Ground points (depot/finish) skip the minimum-altitude check.
    pub fn check_point(
        &self,
        lat: f64,
        lon: f64,
        altitude_m: f64,
        is_ground_point: bool,
    ) -> (bool, Option<String>) {
        if !is_ground_point {
            if let Some(min) = self.min_altitude_m {
                if altitude_m < min {
                    return (
                        false,
                        Some(format!("Altitude {altitude_m}m is below minimum {min}m")),
                    );
                }
            }
        }
        if let Some(max) = self.max_altitude_m {
            if altitude_m > max {
                return (
                    false,
                    Some(format!("Altitude {altitude_m}m is above maximum {max}m")),
                );
            }
        }

        for zone in &self.no_fly_zones {
            if zone.contains_point(lat, lon, altitude_m) {
                return (
                    false,
                    Some(format!(
                        "Point is in no-fly zone: {}",
                        zone.display_name()
                    )),
                );
            }
        }

        (true, None)
    }
}

/// Nearest distance in meters from a point to any vertex of the zone.
/// Used only for diagnostics.
pub fn distance_to_zone(zone: &NoFlyZone, lat: f64, lon: f64) -> f64 {
    zone.polygons
        .iter()
        .flatten()
        .map(|v| haversine_distance(lat, lon, v[0], v[1]))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_zone() -> NoFlyZone {
        // ~440m x ~280m box around (50.00, 30.00)
        NoFlyZone::polygon(
            vec![
                [49.998, 29.998],
                [49.998, 30.002],
                [50.002, 30.002],
                [50.002, 29.998],
                [49.998, 29.998],
            ],
            0.0,
            200.0,
        )
    }

    #[test]
    fn contains_point_inside_band() {
        let zone = square_zone();
        assert!(zone.contains_point(50.0, 30.0, 50.0));
        assert!(!zone.contains_point(50.0, 30.0, 250.0));
        assert!(!zone.contains_point(50.01, 30.0, 50.0));
    }

    #[test]
    fn boundary_point_counts_as_inside() {
        let zone = square_zone();
        assert!(zone.contains_point(49.998, 30.0, 50.0));
        assert!(zone.contains_point(49.998, 29.998, 50.0));
    }

    #[test]
    fn segment_through_zone_intersects() {
        let zone = square_zone();
        assert!(zone.intersects_segment_2d(49.99, 30.0, 50.01, 30.0));
        assert!(!zone.intersects_segment_2d(49.99, 30.01, 50.01, 30.01));
    }

    #[test]
    fn segment_above_band_does_not_cross() {
        let zone = square_zone();
        // 2D line is tangent to the polygon, but the altitude interval sits
        // entirely above the band.
        assert!(!zone.crosses_segment(49.99, 30.0, 250.0, 50.01, 30.0, 300.0));
        assert!(zone.crosses_segment(49.99, 30.0, 150.0, 50.01, 30.0, 300.0));
    }

    #[test]
    fn segment_touching_edge_intersects() {
        let zone = square_zone();
        // runs exactly along the western edge
        assert!(zone.intersects_segment_2d(49.99, 29.998, 50.01, 29.998));
    }

    #[test]
    fn multipolygon_checks_every_part() {
        let mut zone = square_zone();
        zone.polygons.push(vec![
            [50.008, 29.998],
            [50.008, 30.002],
            [50.012, 30.002],
            [50.012, 29.998],
            [50.008, 29.998],
        ]);
        assert!(zone.contains_point(50.01, 30.0, 50.0));
        assert!(!zone.contains_point(50.005, 30.0, 50.0));
    }

    #[test]
    fn zone_validation_catches_open_ring() {
        let zone = NoFlyZone::polygon(
            vec![[49.998, 29.998], [49.998, 30.002], [50.002, 30.002]],
            0.0,
            200.0,
        );
        assert!(!zone.validate().is_empty());
        assert!(square_zone().validate().is_empty());
    }

    #[test]
    fn check_point_reports_altitude_and_zone() {
        let mut constraints = MissionConstraints {
            min_altitude_m: Some(10.0),
            max_altitude_m: Some(120.0),
            ..Default::default()
        };
        constraints.add_no_fly_zone(square_zone().named("test-zone"));

        let (ok, reason) = constraints.check_point(50.1, 30.1, 5.0, false);
        assert!(!ok);
        assert!(reason.unwrap().contains("below minimum"));

        // ground point skips the minimum check
        let (ok, _) = constraints.check_point(50.1, 30.1, 0.0, true);
        assert!(ok);

        let (ok, reason) = constraints.check_point(50.0, 30.0, 50.0, false);
        assert!(!ok);
        assert!(reason.unwrap().contains("test-zone"));
    }
}
