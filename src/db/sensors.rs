// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Sensor registry backed by the `Sensors` table

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::integrity;
use crate::error::Result;
use crate::protocol::SensorRef;

/// Catalog row describing a known sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: i64,
    pub host: String,
    pub sensor: String,
    pub alias: Option<String>,
    pub graph_enabled: bool,
    pub last_update: Option<i64>,
    pub notification_sent: bool,
}

impl Sensor {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            host: row.get(1)?,
            sensor: row.get(2)?,
            alias: row.get(3)?,
            graph_enabled: row.get::<_, Option<i64>>(4)?.unwrap_or(0) != 0,
            last_update: row.get(5)?,
            notification_sent: row.get::<_, i64>(6)? != 0,
        })
    }

    /// Alias if set, otherwise the raw sensor id
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.sensor)
    }
}

/// Sensor that has not reported within the liveness window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleSensor {
    pub host: String,
    pub sensor: String,
    pub last_update: i64,
}

/// Registry operations on a borrowed catalog connection
pub struct SensorRegistry<'a> {
    conn: &'a Connection,
}

impl<'a> SensorRegistry<'a> {
    pub(super) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Row id of a registered sensor
    pub fn get(&self, host: &str, sensor: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM Sensors WHERE host = ?1 AND sensor = ?2",
                params![host, sensor],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Full catalog row
    pub fn find(&self, host: &str, sensor: &str) -> Result<Option<Sensor>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, host, sensor, alias, rrdGraph, last_update, notification_sent \
                 FROM Sensors WHERE host = ?1 AND sensor = ?2",
                params![host, sensor],
                Sensor::from_row,
            )
            .optional()?)
    }

    /// Insert a new sensor.
    ///
    /// Callers check [`get`](Self::get) first; inserting a pair twice fails
    /// with [`Error::Integrity`](crate::Error::Integrity).
    pub fn register(&self, host: &str, sensor: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO Sensors(host, sensor) VALUES (?1, ?2)",
                params![host, sensor],
            )
            .map_err(|e| integrity(e, format!("sensor {}:{} already registered", host, sensor)))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Display name: alias when set, raw sensor id otherwise
    pub fn resolve_alias(&self, host: &str, sensor: &str) -> Result<String> {
        let alias: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT alias FROM Sensors WHERE host = ?1 AND sensor = ?2",
                params![host, sensor],
                |row| row.get(0),
            )
            .optional()?;
        Ok(alias.flatten().unwrap_or_else(|| sensor.to_string()))
    }

    pub fn set_alias(&self, host: &str, sensor: &str, alias: Option<&str>) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE Sensors SET alias = ?1 WHERE host = ?2 AND sensor = ?3",
            params![alias, host, sensor],
        )?;
        Ok(n > 0)
    }

    pub fn set_graph_enabled(&self, host: &str, sensor: &str, enabled: bool) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE Sensors SET rrdGraph = ?1 WHERE host = ?2 AND sensor = ?3",
            params![enabled as i64, host, sensor],
        )?;
        Ok(n > 0)
    }

    /// Record liveness. A fresh reading also re-arms the staleness latch.
    pub fn touch(&self, host: &str, sensor: &str, epoch: i64) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE Sensors SET last_update = ?1, notification_sent = 0 WHERE host = ?2 AND sensor = ?3",
            params![epoch, host, sensor],
        )?;
        Ok(n > 0)
    }

    pub fn sensors_enabled_for_graphing(&self) -> Result<Vec<SensorRef>> {
        let mut stmt = self
            .conn
            .prepare("SELECT host, sensor FROM Sensors WHERE rrdGraph = 1 ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok(SensorRef::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Sensors whose last reading is older than `max_age_secs` before
    /// `now` and that have not been reported yet
    pub fn stale_sensors(&self, max_age_secs: u64, now: i64) -> Result<Vec<StaleSensor>> {
        let cutoff = now - max_age_secs as i64;
        let mut stmt = self.conn.prepare(
            "SELECT host, sensor, last_update FROM Sensors \
             WHERE last_update < ?1 AND notification_sent = 0 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![cutoff], |row| {
            Ok(StaleSensor {
                host: row.get(0)?,
                sensor: row.get(1)?,
                last_update: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Latch the staleness notification so it is sent once per episode
    pub fn mark_notified(&self, host: &str, sensor: &str) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE Sensors SET notification_sent = 1 WHERE host = ?1 AND sensor = ?2",
            params![host, sensor],
        )?;
        Ok(n > 0)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Sensors", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
