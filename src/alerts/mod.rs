// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Threshold alerting with hysteresis
//!
//! Each watched sensor carries two independent one-bit machines. The low
//! side fires when a reading is below the minimum and at least one band
//! below the previous alert point, and re-arms once a reading rises above
//! the minimum. The high side mirrors it. State lives in memory only.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::config::AlertConfig;
use crate::protocol::{notification_topic, threshold_message, Envelope, NotificationKind, SensorRef};

/// Which threshold was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Minimum,
    Maximum,
}

impl Direction {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Direction::Minimum => NotificationKind::Minimum,
            Direction::Maximum => NotificationKind::Maximum,
        }
    }
}

/// Per-sensor hysteresis memory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertState {
    /// Value of the last low alert, `+inf` when armed
    pub last_min: f64,
    /// Value of the last high alert, `-inf` when armed
    pub last_max: f64,
}

impl Default for AlertState {
    fn default() -> Self {
        Self {
            last_min: f64::INFINITY,
            last_max: f64::NEG_INFINITY,
        }
    }
}

/// A notification to publish
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub sensor: SensorRef,
    pub display_name: String,
    pub direction: Direction,
    pub value: f64,
    pub threshold: f64,
    /// Previous alert point on this side (infinite if none)
    pub previous: f64,
}

impl Alert {
    pub fn topic(&self) -> String {
        notification_topic(&self.sensor.host, self.direction.kind())
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::notification(threshold_message(&self.display_name, &self.sensor.host, self.value))
    }
}

pub struct AlertEngine {
    min: Option<f64>,
    max: Option<f64>,
    band: f64,
    watched: HashSet<String>,
    states: HashMap<SensorRef, AlertState>,
}

impl AlertEngine {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            min: config.min,
            max: config.max,
            band: config.hysteresis,
            watched: config.sensors.iter().cloned().collect(),
            states: HashMap::new(),
        }
    }

    /// Whether readings under this display name are evaluated
    pub fn is_watched(&self, display_name: &str) -> bool {
        self.watched.contains(display_name)
    }

    pub fn state(&self, sensor: &SensorRef) -> Option<&AlertState> {
        self.states.get(sensor)
    }

    /// Feed one reading; returns the alerts it triggers
    pub fn evaluate(&mut self, sensor: &SensorRef, display_name: &str, value: f64) -> Vec<Alert> {
        if !self.is_watched(display_name) || (self.min.is_none() && self.max.is_none()) {
            return Vec::new();
        }

        let band = self.band;
        let state = self.states.entry(sensor.clone()).or_default();
        let mut fired = Vec::new();

        if let Some(min) = self.min {
            if value < min && value < state.last_min - band {
                fired.push((Direction::Minimum, min, state.last_min));
                state.last_min = value;
            } else if value > min {
                state.last_min = f64::INFINITY;
            }
        }

        if let Some(max) = self.max {
            if value > max && value > state.last_max + band {
                fired.push((Direction::Maximum, max, state.last_max));
                state.last_max = value;
            } else if value < max {
                state.last_max = f64::NEG_INFINITY;
            }
        }

        fired
            .into_iter()
            .map(|(direction, threshold, previous)| {
                info!(
                    sensor = %sensor,
                    "threshold reached, {:.2} vs {:.2} (last {})",
                    value, threshold, previous
                );
                Alert {
                    sensor: sensor.clone(),
                    display_name: display_name.to_string(),
                    direction,
                    value,
                    threshold,
                    previous,
                }
            })
            .inspect(|a| debug!(topic = %a.topic(), "alert raised"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(min: Option<f64>, max: Option<f64>, watched: &[&str]) -> AlertEngine {
        AlertEngine::new(&AlertConfig {
            min,
            max,
            sensors: watched.iter().map(|s| s.to_string()).collect(),
            hysteresis: 1.0,
        })
    }

    fn feed(engine: &mut AlertEngine, sensor: &SensorRef, name: &str, values: &[f64]) -> Vec<Alert> {
        values.iter().flat_map(|v| engine.evaluate(sensor, name, *v)).collect()
    }

    #[test]
    fn test_min_hysteresis_sequence() {
        let mut engine = engine(Some(0.0), None, &["porch"]);
        let s = SensorRef::new("pi1", "28-01");

        let alerts = feed(&mut engine, &s, "porch", &[-0.5, -0.6, -0.8, 0.5, -0.7]);
        let values: Vec<f64> = alerts.iter().map(|a| a.value).collect();
        assert_eq!(values, vec![-0.5, -0.7]);
        assert!(alerts.iter().all(|a| a.direction == Direction::Minimum));
        assert_eq!(alerts[0].topic(), "/surveillance/notification/pi1/temperature/minimum");
    }

    #[test]
    fn test_min_refires_one_band_lower() {
        let mut engine = engine(Some(0.0), None, &["porch"]);
        let s = SensorRef::new("pi1", "a");

        let alerts = feed(&mut engine, &s, "porch", &[-0.5, -1.4, -1.6, -2.0, -2.7]);
        let values: Vec<f64> = alerts.iter().map(|a| a.value).collect();
        assert_eq!(values, vec![-0.5, -1.6, -2.7]);
        assert_eq!(engine.state(&s).unwrap().last_min, -2.7);
    }

    #[test]
    fn test_reading_equal_to_threshold_keeps_state() {
        let mut engine = engine(Some(0.0), None, &["porch"]);
        let s = SensorRef::new("pi1", "a");

        assert_eq!(feed(&mut engine, &s, "porch", &[-0.5, 0.0, -0.6]).len(), 1);
        assert_eq!(engine.state(&s).unwrap().last_min, -0.5);
    }

    #[test]
    fn test_max_side_is_symmetric() {
        let mut engine = engine(None, Some(30.0), &["attic"]);
        let s = SensorRef::new("pi2", "b");

        let alerts = feed(&mut engine, &s, "attic", &[30.5, 31.0, 31.6, 29.0, 30.2]);
        let values: Vec<f64> = alerts.iter().map(|a| a.value).collect();
        assert_eq!(values, vec![30.5, 31.6, 30.2]);
        assert!(alerts.iter().all(|a| a.direction == Direction::Maximum));
        assert_eq!(alerts[0].previous, f64::NEG_INFINITY);
        assert_eq!(alerts[1].previous, 30.5);
    }

    #[test]
    fn test_unwatched_sensor_never_alerts() {
        let mut engine = engine(Some(0.0), Some(30.0), &["porch"]);
        let s = SensorRef::new("pi1", "x");

        assert!(feed(&mut engine, &s, "garage", &[-10.0, 50.0, -20.0]).is_empty());
        assert!(engine.state(&s).is_none());
    }

    #[test]
    fn test_no_thresholds_disables_engine() {
        let mut engine = engine(None, None, &["porch"]);
        let s = SensorRef::new("pi1", "x");
        assert!(feed(&mut engine, &s, "porch", &[-100.0, 100.0]).is_empty());
    }

    #[test]
    fn test_state_is_per_sensor() {
        let mut engine = engine(Some(0.0), None, &["porch", "shed"]);
        let a = SensorRef::new("pi1", "a");
        let b = SensorRef::new("pi1", "b");

        assert_eq!(engine.evaluate(&a, "porch", -0.5).len(), 1);
        // a different sensor is not suppressed by a's alert point
        assert_eq!(engine.evaluate(&b, "shed", -0.6).len(), 1);
        assert_eq!(engine.evaluate(&a, "porch", -0.6).len(), 0);
    }

    #[test]
    fn test_envelope_text() {
        let mut engine = engine(Some(0.0), None, &["porch"]);
        let alerts = engine.evaluate(&SensorRef::new("pi1", "a"), "porch", -2.25);
        assert_eq!(
            alerts[0].envelope(),
            Envelope::notification("sensor porch on host pi1 has reached -2.25C")
        );
    }
}
