//! Weather contracts and the grid-snapped forecast cache.
//!
//! The planner never talks to a forecast service directly: a
//! [`WeatherProvider`] implementation (see the `skyplan-weather` crate) is
//! wrapped by a [`WeatherManager`] that caches samples on a 1 km grid and
//! reuses nearby samples instead of re-querying.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Mission;
use crate::spatial::{grid_snap, haversine_distance};

/// Wind profile power-law exponent.
const WIND_PROFILE_ALPHA: f64 = 0.15;

/// Default flight-safety thresholds.
const MAX_WIND_SPEED_MPS: f64 = 15.0;
const MAX_PRECIPITATION_MMH: f64 = 5.0;
const MIN_VISIBILITY_KM: f64 = 1.0;

/// Cached weather closer than this is reused instead of fetching (meters).
const MIN_WEATHER_DISTANCE_M: f64 = 5000.0;

/// Grid resolution for weather caching (meters).
const WEATHER_GRID_RESOLUTION_M: f64 = 1000.0;

/// Weather conditions at a specific location and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    pub timestamp: DateTime<Utc>,
    /// Wind speed at 10 m in m/s
    pub wind_speed_10m: f64,
    /// Direction the wind blows from, degrees, 0 = north
    pub wind_direction_10m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed_80m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction_80m: Option<f64>,
    /// Temperature at 2 m in Celsius
    pub temperature_2m: f64,
    /// Precipitation in mm/h
    #[serde(default)]
    pub precipitation: f64,
    /// Cloud cover percentage (0-100)
    #[serde(default)]
    pub cloud_cover: f64,
    /// Visibility in km
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_km: Option<f64>,
}

impl WeatherSample {
    /// Estimate wind speed at the given altitude using a power-law profile:
    /// v(z) = v_ref * (z / z_ref)^0.15. Uses the 80 m reading when the query
    /// is at or above 80 m and that sample is present; clamps to the 10 m
    /// reading below 10 m.
    pub fn wind_at_altitude(&self, altitude_m: f64) -> f64 {
        if altitude_m <= 10.0 {
            return self.wind_speed_10m;
        }

        let (ref_speed, ref_alt) = match self.wind_speed_80m {
            Some(speed) if altitude_m >= 80.0 => (speed, 80.0),
            _ => (self.wind_speed_10m, 10.0),
        };

        ref_speed * (altitude_m / ref_alt).powf(WIND_PROFILE_ALPHA)
    }

    /// Signed wind component along the travel heading.
    /// Positive = headwind, negative = tailwind.
    pub fn effective_wind(&self, heading_deg: f64, altitude_m: f64) -> f64 {
        let wind_speed = self.wind_at_altitude(altitude_m);

        let mut angle_diff = (heading_deg - self.wind_direction_10m).abs();
        if angle_diff > 180.0 {
            angle_diff = 360.0 - angle_diff;
        }

        wind_speed * angle_diff.to_radians().cos()
    }

    /// Check whether these conditions allow flight at the default limits.
    pub fn is_safe_for_flight(&self) -> (bool, Option<String>) {
        self.is_safe_with_limits(MAX_WIND_SPEED_MPS, MAX_PRECIPITATION_MMH, MIN_VISIBILITY_KM)
    }

    pub fn is_safe_with_limits(
        &self,
        max_wind_speed: f64,
        max_precipitation: f64,
        min_visibility: f64,
    ) -> (bool, Option<String>) {
        if self.wind_speed_10m > max_wind_speed {
            return (
                false,
                Some(format!(
                    "Wind speed {:.1} m/s exceeds maximum {} m/s",
                    self.wind_speed_10m, max_wind_speed
                )),
            );
        }
        if self.precipitation > max_precipitation {
            return (
                false,
                Some(format!(
                    "Precipitation {:.1} mm/h exceeds maximum {} mm/h",
                    self.precipitation, max_precipitation
                )),
            );
        }
        if let Some(visibility) = self.visibility_km {
            if visibility < min_visibility {
                return (
                    false,
                    Some(format!(
                        "Visibility {visibility:.1} km is below minimum {min_visibility} km"
                    )),
                );
            }
        }
        (true, None)
    }
}

/// Capability to fetch a weather sample for a point. Any error - network,
/// decoding, missing field - is surfaced as "no sample available".
pub trait WeatherProvider {
    fn fetch(
        &self,
        lat: f64,
        lon: f64,
        altitude_m: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Option<WeatherSample>;
}

type GridKey = (i64, i64);

#[derive(Default)]
struct CacheState {
    samples: HashMap<GridKey, WeatherSample>,
    /// Keys whose fetch already failed this session; not retried.
    failed: HashSet<GridKey>,
}

/// Lazy, grid-snapped cache over an external weather provider.
///
/// Lookup order: exact grid key, then nearest cached sample within 5 km,
/// then an external fetch cached under the grid key. Writes are serialized
/// through an internal lock so one manager can back concurrent planning
/// calls.
pub struct WeatherManager {
    provider: Option<Box<dyn WeatherProvider + Send + Sync>>,
    timestamp: Option<DateTime<Utc>>,
    enabled: bool,
    state: Mutex<CacheState>,
}

impl WeatherManager {
    pub fn new(
        provider: Box<dyn WeatherProvider + Send + Sync>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            provider: Some(provider),
            timestamp,
            enabled: true,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// A manager that answers every query with "no weather".
    pub fn disabled() -> Self {
        Self {
            provider: None,
            timestamp: None,
            enabled: false,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// A manager seeded with samples and no external provider; useful for
    /// tests and offline planning.
    pub fn from_samples(samples: Vec<WeatherSample>) -> Self {
        let manager = Self {
            provider: None,
            timestamp: None,
            enabled: true,
            state: Mutex::new(CacheState::default()),
        };
        {
            let mut state = manager.state.lock().unwrap();
            for sample in samples {
                let key = grid_key(sample.lat, sample.lon);
                state.samples.insert(key, sample);
            }
        }
        manager
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Weather for a point, from cache or the provider.
    pub fn get(&self, lat: f64, lon: f64, altitude_m: f64) -> Option<WeatherSample> {
        if !self.enabled {
            return None;
        }

        let key = grid_key(lat, lon);
        let mut state = self.state.lock().unwrap();

        if let Some(sample) = state.samples.get(&key) {
            return Some(sample.clone());
        }

        if let Some(sample) = find_nearby(&state.samples, lat, lon) {
            return Some(sample);
        }

        if state.failed.contains(&key) {
            return None;
        }

        let fetched = self
            .provider
            .as_ref()
            .and_then(|p| p.fetch(lat, lon, altitude_m, self.timestamp));

        match fetched {
            Some(sample) => {
                state.samples.insert(key, sample.clone());
                Some(sample)
            }
            None => {
                debug!(lat, lon, "weather fetch failed, marking grid cell");
                state.failed.insert(key);
                None
            }
        }
    }

    /// Eagerly populate the cache for the depot, all targets and the finish
    /// point of a mission.
    pub fn pre_fetch(&self, mission: &Mission) {
        if !self.enabled {
            return;
        }

        let mut points = Vec::new();
        if let Some(depot) = &mission.depot {
            points.push(depot);
        }
        points.extend(mission.target_points.iter());
        if let Some(finish) = &mission.finish_point {
            points.push(finish);
        }

        for wp in points {
            self.get(wp.lat, wp.lon, wp.altitude_m);
        }
    }

    pub fn cached_count(&self) -> usize {
        self.state.lock().unwrap().samples.len()
    }
}

fn grid_key(lat: f64, lon: f64) -> GridKey {
    let (lat_grid, lon_grid) = grid_snap(lat, lon, WEATHER_GRID_RESOLUTION_M);
    (
        (lat_grid * 1e6).round() as i64,
        (lon_grid * 1e6).round() as i64,
    )
}

fn find_nearby(
    samples: &HashMap<GridKey, WeatherSample>,
    lat: f64,
    lon: f64,
) -> Option<WeatherSample> {
    let mut min_distance = f64::INFINITY;
    let mut closest = None;

    for sample in samples.values() {
        let distance = haversine_distance(lat, lon, sample.lat, sample.lon);
        if distance < min_distance && distance < MIN_WEATHER_DISTANCE_M {
            min_distance = distance;
            closest = Some(sample);
        }
    }

    closest.cloned()
}
