// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Relational catalog of sensors and surveillance images
//!
//! A [`Catalog`] owns a single SQLite connection. Every thread of control
//! opens its own catalog on the same file and relies on SQLite locking for
//! consistency; handles are never shared across threads.

mod sensors;
mod surveillance;

pub use sensors::*;
pub use surveillance::*;

use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// How long a writer waits for another connection's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Catalog handle
#[derive(Debug)]
pub struct Catalog {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Catalog {
    /// Open or create the catalog file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        "#,
        )?;

        let catalog = Self::init(conn, Some(path.to_path_buf()))?;
        info!("Catalog opened at {:?}", path);
        Ok(catalog)
    }

    /// Open at startup, where a catalog that cannot be opened ends the
    /// process: every failure is reported as [`Error::Fatal`]
    pub fn open_or_fatal(path: &Path) -> Result<Self> {
        Self::open(path).map_err(|e| Error::Fatal(format!("cannot open catalog {:?}: {}", path, e)))
    }

    /// Private catalog that lives only as long as the handle
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let catalog = Self { conn, path };
        catalog.create_tables()?;
        catalog.migrate()?;
        Ok(catalog)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS Sensors (
                id INTEGER PRIMARY KEY,
                host TEXT NOT NULL,
                sensor TEXT NOT NULL,
                alias TEXT,
                rrdGraph INTEGER DEFAULT 0,
                last_update INTEGER,
                notification_sent INTEGER NOT NULL DEFAULT 0
            );

            CREATE UNIQUE INDEX IF NOT EXISTS SensorsIdx ON Sensors(host, sensor);

            CREATE TABLE IF NOT EXISTS Surveillance (
                id INTEGER PRIMARY KEY,
                host TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                imageLink TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS SurveillanceIdx ON Surveillance(imageLink);
            CREATE INDEX IF NOT EXISTS SurveillanceHostIdx ON Surveillance(host);
        "#,
        )?;
        Ok(())
    }

    /// Catalogs created before the staleness latch existed lack its column
    fn migrate(&self) -> Result<()> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info('Sensors')")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if !columns.iter().any(|c| c == "notification_sent") {
            debug!("adding notification_sent column to Sensors");
            self.conn.execute(
                "ALTER TABLE Sensors ADD COLUMN notification_sent INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }
        Ok(())
    }

    /// File backing this catalog, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Sensor registry view
    pub fn sensors(&self) -> SensorRegistry<'_> {
        SensorRegistry::new(&self.conn)
    }

    /// Surveillance image index view
    pub fn surveillance(&self) -> SurveillanceIndex<'_> {
        SurveillanceIndex::new(&self.conn)
    }
}

/// Turn a uniqueness failure into [`Error::Integrity`]
fn integrity(err: rusqlite::Error, what: String) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Error::Integrity(what)
        }
        _ => Error::Catalog(err),
    }
}
