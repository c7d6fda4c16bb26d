// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Message dispatcher
//!
//! Runs on the transport's delivery task and processes one envelope at a
//! time: registrations go to the registry and series store, readings update
//! liveness, the series and the alert engine, captures go to surveillance
//! ingest. Nothing raised while processing a message escapes [`Dispatcher::handle`].

use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertEngine;
use crate::core::epoch_now;
use crate::db::Catalog;
use crate::error::{Error, Result};
use crate::protocol::{parse_timestamp, Envelope, ReadingMessage, SensorRef, SurveillanceMessage, Topic};
use crate::streaming::Notifier;
use crate::surveillance::SurveillanceIngest;
use crate::timeseries::TimeSeriesStore;

/// What a single message resulted in
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Registered,
    AlreadyRegistered,
    /// Reading accepted; number of alerts raised
    Reading { alerts: usize },
    /// Reading for a sensor the registry does not know
    Unregistered,
    ImageStored(PathBuf),
    /// Outbound notification echoed back by the broker
    Ignored,
}

pub struct Dispatcher<S, N> {
    catalog: Catalog,
    store: S,
    alerts: AlertEngine,
    ingest: SurveillanceIngest,
    notifier: N,
}

impl<S: TimeSeriesStore, N: Notifier> Dispatcher<S, N> {
    pub fn new(catalog: Catalog, store: S, alerts: AlertEngine, ingest: SurveillanceIngest, notifier: N) -> Self {
        Self {
            catalog,
            store,
            alerts,
            ingest,
            notifier,
        }
    }

    /// Process one delivered message. Failures are logged and the message dropped.
    pub fn handle(&mut self, topic: &str, payload: &[u8]) {
        match self.process(topic, payload) {
            Ok(outcome) => debug!(topic, ?outcome, "message processed"),
            Err(e) if e.is_malformed() => warn!(topic, "dropping message: {}", e),
            Err(e) => error!(topic, "message processing failed: {}", e),
        }
    }

    pub fn process(&mut self, topic: &str, payload: &[u8]) -> Result<Outcome> {
        let route = Topic::classify(topic);
        if let Topic::Notification { .. } = route {
            return Ok(Outcome::Ignored);
        }

        let envelope = Envelope::parse(payload)?;
        if !route.carries(&envelope) {
            return Err(Error::Malformed(format!("{} envelope on unexpected topic", envelope.kind())));
        }
        debug!(topic, kind = envelope.kind(), ?route, "dispatching");

        match envelope {
            Envelope::RegisterSensor(key) => self.register(&key),
            Envelope::Reading(reading) => self.reading(&reading),
            Envelope::Surveillance(capture) => self.surveillance(&capture),
            Envelope::Notification(_) => Ok(Outcome::Ignored),
        }
    }

    fn register(&mut self, key: &SensorRef) -> Result<Outcome> {
        let registry = self.catalog.sensors();
        if registry.get(&key.host, &key.sensor)?.is_some() {
            debug!(sensor = %key, "sensor already registered");
            return Ok(Outcome::AlreadyRegistered);
        }

        let id = registry.register(&key.host, &key.sensor)?;
        info!(sensor = %key, id, "registered sensor");
        if let Err(e) = self.store.create(key) {
            warn!(sensor = %key, "series not created, retrying on first reading: {}", e);
        }
        Ok(Outcome::Registered)
    }

    fn reading(&mut self, reading: &ReadingMessage) -> Result<Outcome> {
        let key = reading.sensor_ref();
        let registry = self.catalog.sensors();
        let Some(sensor) = registry.find(&key.host, &key.sensor)? else {
            warn!(sensor = %key, "reading for unregistered sensor dropped");
            return Ok(Outcome::Unregistered);
        };

        let now = epoch_now();
        registry.touch(&key.host, &key.sensor, now)?;

        let epoch = match parse_timestamp(&reading.timestamp) {
            Some(ts) => ts.timestamp(),
            None => {
                warn!(sensor = %key, timestamp = %reading.timestamp, "unparseable timestamp, using ingestion time");
                now
            }
        };

        if !self.store.has_series(&key) {
            if let Err(e) = self.store.create(&key) {
                warn!(sensor = %key, "series not created: {}", e);
            }
        }
        if let Err(e) = self.store.append(&key, epoch, reading.reading) {
            warn!(sensor = %key, "point not stored: {}", e);
        }

        let alerts = self.alerts.evaluate(&key, sensor.display_name(), reading.reading);
        for alert in &alerts {
            if let Err(e) = self.notifier.publish(&alert.topic(), &alert.envelope()) {
                warn!(sensor = %key, "alert not published: {}", e);
            }
        }
        Ok(Outcome::Reading { alerts: alerts.len() })
    }

    fn surveillance(&mut self, capture: &SurveillanceMessage) -> Result<Outcome> {
        let bytes = SurveillanceIngest::decode(capture)?;
        let path = self
            .ingest
            .store(&self.catalog, &capture.host, &capture.timestamp, &bytes)?;
        Ok(Outcome::ImageStored(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertConfig;
    use crate::protocol::{notification_topic, NotificationKind};
    use crate::testing::{MemoryStore, RecordingNotifier};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::json;

    const TOPIC: &str = "/surveillance/temperature/garden/pi1";

    struct Harness {
        dispatcher: Dispatcher<MemoryStore, RecordingNotifier>,
        store: MemoryStore,
        notifier: RecordingNotifier,
        _images: tempfile::TempDir,
    }

    fn harness(alerts: AlertConfig) -> Harness {
        let images = tempfile::tempdir().unwrap();
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();
        let dispatcher = Dispatcher::new(
            Catalog::open_in_memory().unwrap(),
            store.clone(),
            AlertEngine::new(&alerts),
            SurveillanceIngest::new(images.path()),
            notifier.clone(),
        );
        Harness {
            dispatcher,
            store,
            notifier,
            _images: images,
        }
    }

    fn watching(min: Option<f64>, max: Option<f64>, names: &[&str]) -> AlertConfig {
        AlertConfig {
            min,
            max,
            sensors: names.iter().map(|s| s.to_string()).collect(),
            hysteresis: 1.0,
        }
    }

    fn register(host: &str, sensor: &str) -> Vec<u8> {
        json!({"register_sensor": {"host": host, "sensor": sensor}}).to_string().into_bytes()
    }

    fn reading(host: &str, sensor: &str, value: f64, timestamp: &str) -> Vec<u8> {
        json!({"reading": {"host": host, "sensor": sensor, "reading": value, "timestamp": timestamp}})
            .to_string()
            .into_bytes()
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut h = harness(AlertConfig::default());

        assert_eq!(h.dispatcher.process(TOPIC, &register("pi1", "s1")).unwrap(), Outcome::Registered);
        assert_eq!(
            h.dispatcher.process(TOPIC, &register("pi1", "s1")).unwrap(),
            Outcome::AlreadyRegistered
        );

        assert_eq!(h.dispatcher.catalog.sensors().count().unwrap(), 1);
        assert_eq!(h.store.series_count(), 1);
        assert_eq!(h.store.create_calls(), 1);
    }

    #[test]
    fn test_hysteresis_through_dispatcher() {
        let mut h = harness(watching(Some(0.0), None, &["s1"]));
        h.dispatcher.handle(TOPIC, &register("pi1", "s1"));

        for (i, v) in [-0.5, -0.6, -0.8, 0.5, -0.7].iter().enumerate() {
            let ts = format!("2024-01-01 10:00:{:02}", i * 10);
            h.dispatcher.handle(TOPIC, &reading("pi1", "s1", *v, &ts));
        }

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 2);
        let topic = notification_topic("pi1", NotificationKind::Minimum);
        assert!(sent.iter().all(|(t, _)| *t == topic));
        assert_eq!(sent[0].1, Envelope::notification("sensor s1 on host pi1 has reached -0.50C"));
        assert_eq!(sent[1].1, Envelope::notification("sensor s1 on host pi1 has reached -0.70C"));
    }

    #[test]
    fn test_watch_list_uses_display_name() {
        let mut h = harness(watching(Some(0.0), None, &["garage"]));
        h.dispatcher.handle(TOPIC, &register("pi1", "28-a"));
        h.dispatcher.handle(TOPIC, &register("pi1", "28-b"));
        h.dispatcher.catalog.sensors().set_alias("pi1", "28-a", Some("garage")).unwrap();

        let ts = "2024-01-01 10:00:00";
        assert_eq!(
            h.dispatcher.process(TOPIC, &reading("pi1", "28-a", -5.0, ts)).unwrap(),
            Outcome::Reading { alerts: 1 }
        );
        assert_eq!(
            h.dispatcher.process(TOPIC, &reading("pi1", "28-b", -5.0, ts)).unwrap(),
            Outcome::Reading { alerts: 0 }
        );
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[test]
    fn test_out_of_order_readings_tolerated() {
        let mut h = harness(AlertConfig::default());
        h.dispatcher.handle(TOPIC, &register("pi1", "s1"));

        let before = epoch_now();
        for ts in ["2024-01-01 10:00:00", "2024-01-01 09:59:50", "2024-01-01 10:00:05"] {
            let outcome = h.dispatcher.process(TOPIC, &reading("pi1", "s1", 20.0, ts)).unwrap();
            assert_eq!(outcome, Outcome::Reading { alerts: 0 });
        }
        let after = epoch_now();

        let key = SensorRef::new("pi1", "s1");
        assert_eq!(h.store.points(&key).len(), 2);

        let last_update = h.dispatcher.catalog.sensors().find("pi1", "s1").unwrap().unwrap().last_update.unwrap();
        assert!(last_update >= before && last_update <= after);
    }

    #[test]
    fn test_unparseable_timestamp_uses_ingestion_time() {
        let mut h = harness(AlertConfig::default());
        h.dispatcher.handle(TOPIC, &register("pi1", "s1"));

        let before = epoch_now();
        h.dispatcher.handle(TOPIC, &reading("pi1", "s1", 1.5, "not a time"));
        let points = h.store.points(&SensorRef::new("pi1", "s1"));
        assert_eq!(points.len(), 1);
        assert!(points[0].0 >= before);
    }

    #[test]
    fn test_unregistered_reading_dropped() {
        let mut h = harness(watching(Some(0.0), None, &["s9"]));
        let outcome = h
            .dispatcher
            .process(TOPIC, &reading("pi1", "s9", -10.0, "2024-01-01 10:00:00"))
            .unwrap();

        assert_eq!(outcome, Outcome::Unregistered);
        assert_eq!(h.store.series_count(), 0);
        assert!(h.notifier.sent().is_empty());
    }

    #[test]
    fn test_surveillance_round_trip() {
        let mut h = harness(AlertConfig::default());
        let jpeg: Vec<u8> = (0..=255u8).collect();
        let payload = json!({"surveillance": {
            "host": "cam1",
            "image": STANDARD.encode(&jpeg),
            "timestamp": "2024-01-01 10:00:00.250000",
        }})
        .to_string();

        let outcome = h.dispatcher.process("/surveillance/image/cam1", payload.as_bytes()).unwrap();
        let Outcome::ImageStored(path) = outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };

        let name = SurveillanceIngest::file_name("cam1", "2024-01-01 10:00:00.250000");
        let row = h.dispatcher.catalog.surveillance().find(&name).unwrap().unwrap();
        assert_eq!(row.host, "cam1");
        assert_eq!(h.dispatcher.ingest.path_of(&row), path);
        assert_eq!(std::fs::read(path).unwrap(), jpeg);
    }

    #[test]
    fn test_malformed_messages_are_dropped() {
        let mut h = harness(AlertConfig::default());

        let payloads: [&[u8]; 4] = [
            b"garbage",
            br#"{"unknown": {}}"#,
            br#"{"reading": {"host": "pi1"}}"#,
            br#"{"surveillance": {"host": "cam", "image": "%%%", "timestamp": "t"}}"#,
        ];
        for payload in payloads {
            assert!(h.dispatcher.process(TOPIC, payload).unwrap_err().is_malformed());
            h.dispatcher.handle(TOPIC, payload);
        }

        h.dispatcher.handle(TOPIC, &register("pi1", "s1"));
        assert_eq!(h.dispatcher.catalog.sensors().count().unwrap(), 1);
    }

    #[test]
    fn test_envelope_on_wrong_branch_is_dropped() {
        let mut h = harness(AlertConfig::default());
        let capture = json!({"surveillance": {"host": "cam1", "image": STANDARD.encode(b"jpeg"), "timestamp": "t"}})
            .to_string();

        assert!(h.dispatcher.process(TOPIC, capture.as_bytes()).unwrap_err().is_malformed());
        assert!(h
            .dispatcher
            .process("/surveillance/image/pi1", &register("pi1", "s1"))
            .unwrap_err()
            .is_malformed());
        assert!(h.dispatcher.process("/elsewhere/pi1", &register("pi1", "s1")).unwrap_err().is_malformed());

        assert_eq!(h.dispatcher.catalog.sensors().count().unwrap(), 0);
        assert_eq!(h.dispatcher.catalog.surveillance().count().unwrap(), 0);
    }

    #[test]
    fn test_own_notifications_ignored() {
        let mut h = harness(AlertConfig::default());
        let topic = notification_topic("pi1", NotificationKind::Alert);
        let payload = Envelope::notification("x").to_bytes().unwrap();

        assert_eq!(h.dispatcher.process(&topic, &payload).unwrap(), Outcome::Ignored);
        assert_eq!(h.dispatcher.process(TOPIC, &payload).unwrap(), Outcome::Ignored);
    }
}
