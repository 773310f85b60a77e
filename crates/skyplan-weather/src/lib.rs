//! Open-Meteo forecast client.
//!
//! Implements the core's [`WeatherProvider`] contract over the public
//! Open-Meteo forecast API. Every failure - network, decoding, a missing
//! field - surfaces as "no sample available"; the planner treats unknown
//! weather as flyable.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::warn;

use skyplan_core::weather::{WeatherProvider, WeatherSample};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the Open-Meteo forecast API.
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
        }
    }

    fn request(&self, lat: f64, lon: f64, hourly: &str) -> Option<ForecastResponse> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("hourly", hourly.to_string()),
                ("windspeed_unit", "ms".to_string()),
                ("timezone", "UTC".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send();

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(lat, lon, error = %err, "weather request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(lat, lon, status = %response.status(), "weather request rejected");
            return None;
        }

        match response.json::<ForecastResponse>() {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(lat, lon, error = %err, "weather response decoding failed");
                None
            }
        }
    }
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherProvider for OpenMeteoClient {
    fn fetch(
        &self,
        lat: f64,
        lon: f64,
        altitude_m: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Option<WeatherSample> {
        let timestamp = timestamp.unwrap_or_else(Utc::now);

        let data = self.request(
            lat,
            lon,
            "temperature_2m,precipitation,windspeed_10m,winddirection_10m,cloudcover,visibility",
        )?;
        let hourly = data.hourly?;

        let index = hourly.closest_index(timestamp);
        let wind_speed_10m = hourly.value(&hourly.windspeed_10m, index)?;
        let wind_direction_10m = hourly.value(&hourly.winddirection_10m, index)?;
        let temperature_2m = hourly.value(&hourly.temperature_2m, index).unwrap_or(15.0);
        let precipitation = hourly.value(&hourly.precipitation, index).unwrap_or(0.0);
        let cloud_cover = hourly.value(&hourly.cloudcover, index).unwrap_or(0.0);
        // Open-Meteo reports visibility in meters
        let visibility_km = hourly
            .value(&hourly.visibility, index)
            .map(|meters| meters / 1000.0);

        // upper-level wind is optional enrichment; ignore failures
        let (wind_speed_80m, wind_direction_80m) = self
            .request(lat, lon, "windspeed_80m,winddirection_80m")
            .and_then(|data| data.hourly)
            .map(|upper| {
                (
                    upper.value(&upper.windspeed_80m, index),
                    upper.value(&upper.winddirection_80m, index),
                )
            })
            .unwrap_or((None, None));

        Some(WeatherSample {
            lat,
            lon,
            altitude_m,
            timestamp,
            wind_speed_10m,
            wind_direction_10m,
            wind_speed_80m,
            wind_direction_80m,
            temperature_2m,
            precipitation,
            cloud_cover,
            visibility_km,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Option<HourlyBlock>,
}

/// Hourly arrays as Open-Meteo returns them; individual readings may be
/// null.
#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    windspeed_10m: Vec<Option<f64>>,
    #[serde(default)]
    winddirection_10m: Vec<Option<f64>>,
    #[serde(default)]
    cloudcover: Vec<Option<f64>>,
    #[serde(default)]
    visibility: Vec<Option<f64>>,
    #[serde(default)]
    windspeed_80m: Vec<Option<f64>>,
    #[serde(default)]
    winddirection_80m: Vec<Option<f64>>,
}

impl HourlyBlock {
    /// Index of the forecast hour matching the timestamp, falling back to
    /// the first entry.
    fn closest_index(&self, timestamp: DateTime<Utc>) -> usize {
        let target = timestamp.format("%Y-%m-%dT%H:00").to_string();
        self.time.iter().position(|t| *t == target).unwrap_or(0)
    }

    fn value(&self, series: &[Option<f64>], index: usize) -> Option<f64> {
        series.get(index).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_block_picks_matching_hour() {
        let block = HourlyBlock {
            time: vec![
                "2026-08-01T00:00".to_string(),
                "2026-08-01T01:00".to_string(),
                "2026-08-01T02:00".to_string(),
            ],
            windspeed_10m: vec![Some(1.0), Some(2.0), Some(3.0)],
            ..Default::default()
        };

        let timestamp = "2026-08-01T01:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let index = block.closest_index(timestamp);
        assert_eq!(index, 1);
        assert_eq!(block.value(&block.windspeed_10m, index), Some(2.0));
    }

    #[test]
    fn missing_hour_falls_back_to_first_entry() {
        let block = HourlyBlock {
            time: vec!["2026-08-01T00:00".to_string()],
            windspeed_10m: vec![Some(4.0)],
            ..Default::default()
        };
        let timestamp = "2026-08-02T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(block.closest_index(timestamp), 0);
    }

    #[test]
    fn null_readings_become_none() {
        let block = HourlyBlock {
            time: vec!["2026-08-01T00:00".to_string()],
            windspeed_10m: vec![None],
            ..Default::default()
        };
        assert_eq!(block.value(&block.windspeed_10m, 0), None);
        assert_eq!(block.value(&block.windspeed_10m, 5), None);
    }
}
