//! Spatial math for route planning: great-circle distances, bearings and
//! grid snapping used by the weather cache.

/// A position in WGS84 coordinates with altitude above ground in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64, altitude_m: f64) -> Self {
        Self {
            lat,
            lon,
            altitude_m,
        }
    }
}

/// Meters per degree of latitude (constant at all latitudes).
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// This is the standard formula for calculating great-circle distance
/// between two points on a sphere given their latitudes and longitudes.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const R: f64 = 6_371_000.0; // Earth radius in meters
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * R * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial great-circle bearing from point 1 to point 2 in degrees [0, 360),
/// 0 = north.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// 3D distance in meters: haversine horizontally, altitude delta vertically.
pub fn distance_3d(a: GeoPoint, b: GeoPoint) -> f64 {
    let horizontal = haversine_distance(a.lat, a.lon, b.lat, b.lon);
    let vertical = b.altitude_m - a.altitude_m;
    (horizontal * horizontal + vertical * vertical).sqrt()
}

/// Meters per degree of longitude at a given latitude.
/// Longitude degrees shrink as you move toward the poles.
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    METERS_PER_DEG_LAT * lat_deg.to_radians().cos()
}

/// Quantize a coordinate pair to a local grid of the given resolution.
///
/// The grid is anchored at (0, 0); longitude spacing is scaled by the local
/// latitude so cells stay close to square in meters.
pub fn grid_snap(lat: f64, lon: f64, resolution_m: f64) -> (f64, f64) {
    let lat_step = resolution_m / METERS_PER_DEG_LAT;
    let lon_step = resolution_m / meters_per_deg_lon(lat).max(1.0);

    let lat_grid = (lat / lat_step).round() * lat_step;
    let lon_grid = (lon / lon_step).round() * lon_step;
    (lat_grid, lon_grid)
}
