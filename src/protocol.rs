// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Wire protocol shared with the field nodes
//!
//! Every message is a JSON object with exactly one top-level key naming
//! its kind:
//!
//! ```text
//! {"register_sensor": {"host": "...", "sensor": "..."}}
//! {"reading":         {"host": "...", "sensor": "...", "reading": 21.5, "timestamp": "..."}}
//! {"surveillance":    {"host": "...", "image": "<base64>", "timestamp": "..."}}
//! {"notification":    "..."}
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Root of the topic namespace
pub const TOPIC_ROOT: &str = "/surveillance";

/// Wildcard subscription covering every topic under the root
pub const SUBSCRIPTION: &str = "/surveillance/#";

/// Inbound or outbound envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    RegisterSensor(SensorRef),
    Reading(ReadingMessage),
    Surveillance(SurveillanceMessage),
    /// Outbound only
    Notification(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorRef {
    pub host: String,
    pub sensor: String,
}

impl SensorRef {
    pub fn new(host: impl Into<String>, sensor: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            sensor: sensor.into(),
        }
    }
}

impl fmt::Display for SensorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.sensor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingMessage {
    pub host: String,
    pub sensor: String,
    pub reading: f64,
    pub timestamp: String,
}

impl ReadingMessage {
    pub fn sensor_ref(&self) -> SensorRef {
        SensorRef::new(&self.host, &self.sensor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveillanceMessage {
    pub host: String,
    /// Base64 encoded JPEG
    pub image: String,
    pub timestamp: String,
}

impl Envelope {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::Malformed(format!("payload is not UTF-8: {}", e)))?;
        Ok(serde_json::from_str(text)?)
    }

    pub fn notification(text: impl Into<String>) -> Self {
        Envelope::Notification(text.into())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::RegisterSensor(_) => "register_sensor",
            Envelope::Reading(_) => "reading",
            Envelope::Surveillance(_) => "surveillance",
            Envelope::Notification(_) => "notification",
        }
    }
}

/// Suffix of an outbound notification topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Sensor stopped reporting
    Alert,
    Minimum,
    Maximum,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Alert => "alert",
            NotificationKind::Minimum => "minimum",
            NotificationKind::Maximum => "maximum",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "alert" => Some(NotificationKind::Alert),
            "minimum" => Some(NotificationKind::Minimum),
            "maximum" => Some(NotificationKind::Maximum),
            _ => None,
        }
    }
}

/// `/surveillance/notification/<host>/temperature/<kind>`
pub fn notification_topic(host: &str, kind: NotificationKind) -> String {
    format!("{}/notification/{}/temperature/{}", TOPIC_ROOT, host, kind.as_str())
}

/// Classified topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic<'a> {
    /// `/surveillance/temperature/<tag>/<identifier>`: registrations and readings
    Temperature { tag: &'a str, identifier: &'a str },
    /// `/surveillance/image/<identifier>`: captures
    Image { identifier: &'a str },
    Notification { host: &'a str, kind: NotificationKind },
    Other,
}

impl<'a> Topic<'a> {
    pub fn classify(topic: &'a str) -> Self {
        let Some(rest) = topic
            .strip_prefix(TOPIC_ROOT)
            .and_then(|r| r.strip_prefix('/'))
        else {
            return Topic::Other;
        };

        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            ["temperature", tag, identifier] => Topic::Temperature {
                tag: *tag,
                identifier: *identifier,
            },
            ["image", identifier] => Topic::Image {
                identifier: *identifier,
            },
            ["notification", host, "temperature", kind] => match NotificationKind::parse(kind) {
                Some(kind) => Topic::Notification { host: *host, kind },
                None => Topic::Other,
            },
            _ => Topic::Other,
        }
    }

    /// Whether `envelope` belongs on this branch of the namespace.
    /// Notifications are accepted anywhere so the server's own echoes can
    /// be recognised and skipped.
    pub fn carries(&self, envelope: &Envelope) -> bool {
        matches!(
            (self, envelope),
            (Topic::Temperature { .. }, Envelope::RegisterSensor(_) | Envelope::Reading(_))
                | (Topic::Image { .. }, Envelope::Surveillance(_))
                | (_, Envelope::Notification(_))
        )
    }
}

/// Parse a node timestamp into server-local time.
///
/// Nodes send `YYYY-MM-DD HH:MM:SS[.ffffff]` in their local time; RFC 3339
/// is accepted as well.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

/// Text of a threshold notification
pub fn threshold_message(display_name: &str, host: &str, value: f64) -> String {
    format!("sensor {} on host {} has reached {:.2}C", display_name, host, value)
}

/// Text of a staleness notification
pub fn stale_message(host: &str, sensor: &str, last_update: i64) -> String {
    format!("Sensor {} on host {}, last update {}", sensor, host, last_update)
}
