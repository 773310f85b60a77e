//! Route metric computation: distance, time, energy, risk and average
//! speed over a planned waypoint sequence.
//!
//! Time uses an accelerate-cruise-decelerate schedule per segment; speed and
//! energy react to the wind at each segment midpoint; the risk score
//! aggregates precipitation, wind and visibility thresholds.

use crate::models::{AircraftSpec, Route, RouteMetrics};
use crate::spatial::{bearing_deg, haversine_distance};
use crate::weather::WeatherManager;

impl Route {
    /// Compute and attach metrics. Weather, when available, is read through
    /// the manager's cache.
    pub fn compute_metrics(
        &mut self,
        aircraft: &AircraftSpec,
        weather: Option<&WeatherManager>,
    ) -> RouteMetrics {
        if self.waypoints.is_empty() {
            let metrics = RouteMetrics::default();
            self.metrics = Some(metrics.clone());
            return metrics;
        }

        let altitudes: Vec<f64> = self.waypoints.iter().map(|wp| wp.altitude_m).collect();

        let mut total_distance = 0.0;
        let mut total_time = 0.0;
        let mut total_energy = 0.0;
        let mut risk_factors: Vec<f64> = Vec::new();

        let mut current_speed = 0.0f64;
        let acceleration = aircraft.max_speed_mps / 5.0;
        let deceleration = aircraft.max_speed_mps / 5.0;

        for pair in self.waypoints.windows(2) {
            let wp1 = &pair[0];
            let wp2 = &pair[1];

            let distance = haversine_distance(wp1.lat, wp1.lon, wp2.lat, wp2.lon);
            let altitude_change = wp2.altitude_m - wp1.altitude_m;
            let heading = bearing_deg(wp1.lat, wp1.lon, wp2.lat, wp2.lon);

            total_distance += distance;

            let mid_lat = (wp1.lat + wp2.lat) / 2.0;
            let mid_lon = (wp1.lon + wp2.lon) / 2.0;
            let mid_alt = (wp1.altitude_m + wp2.altitude_m) / 2.0;

            let sample = weather.and_then(|manager| manager.get(mid_lat, mid_lon, mid_alt));

            let mut effective_max_speed = aircraft.max_speed_mps;

            if let Some(sample) = &sample {
                let effective_wind = sample.effective_wind(heading, mid_alt);
                effective_max_speed = (aircraft.max_speed_mps - effective_wind * 0.5).clamp(
                    0.1 * aircraft.max_speed_mps,
                    1.2 * aircraft.max_speed_mps,
                );

                let mut risk = 0.0;
                if sample.precipitation > 2.0 {
                    risk += 0.3;
                }
                if sample.precipitation > 5.0 {
                    risk += 0.4;
                }
                let wind_speed = sample.wind_at_altitude(mid_alt);
                if wind_speed > 10.0 {
                    risk += 0.2;
                }
                if wind_speed > 15.0 {
                    risk += 0.3;
                }
                if let Some(visibility) = sample.visibility_km {
                    if visibility < 2.0 {
                        risk += 0.2;
                    }
                }
                risk_factors.push(risk);
            }

            if distance > 0.0 {
                let accel_time = ((effective_max_speed - current_speed) / acceleration).max(0.0);
                let accel_distance =
                    current_speed * accel_time + 0.5 * acceleration * accel_time.powi(2);

                let decel_time = effective_max_speed / deceleration;
                let decel_distance =
                    effective_max_speed * decel_time - 0.5 * deceleration * decel_time.powi(2);

                let cruise_distance = (distance - accel_distance - decel_distance).max(0.0);
                let cruise_time = if effective_max_speed > 0.0 {
                    cruise_distance / effective_max_speed
                } else {
                    0.0
                };

                total_time += accel_time + cruise_time + decel_time;

                // the schedule ends at rest before the next fix
                current_speed = (effective_max_speed - deceleration * decel_time).max(0.0);
            }

            let base_energy = aircraft.estimate_energy(distance, altitude_change);

            // energy grows quadratically with the speed actually flown
            let speed_factor = (effective_max_speed / aircraft.max_speed_mps).powi(2);
            let energy_multiplier = 1.0 + 0.5 * (speed_factor - 1.0);

            let mut weather_multiplier = 1.0;
            if let Some(sample) = &sample {
                let effective_wind = sample.effective_wind(heading, mid_alt);
                if effective_wind > 0.0 {
                    weather_multiplier = 1.0 + (effective_wind / aircraft.max_speed_mps) * 0.3;
                } else if effective_wind < 0.0 {
                    weather_multiplier = 1.0 + (effective_wind / aircraft.max_speed_mps) * 0.1;
                }
                if sample.precipitation > 0.0 {
                    weather_multiplier += sample.precipitation * 0.05;
                }
            }

            total_energy += base_energy * energy_multiplier * weather_multiplier;
        }

        let avg_risk = if risk_factors.is_empty() {
            0.0
        } else {
            (risk_factors.iter().sum::<f64>() / risk_factors.len() as f64).min(1.0)
        };

        let avg_speed = if total_time > 0.0 {
            total_distance / total_time
        } else {
            0.0
        };

        let metrics = RouteMetrics {
            total_distance_m: total_distance,
            total_time_s: total_time,
            total_energy_wh: total_energy,
            max_altitude_m: altitudes.iter().copied().fold(f64::MIN, f64::max),
            min_altitude_m: altitudes.iter().copied().fold(f64::MAX, f64::min),
            waypoint_count: self.waypoints.len(),
            risk_score: avg_risk,
            avg_speed_mps: avg_speed,
        };
        self.metrics = Some(metrics.clone());
        metrics
    }
}
