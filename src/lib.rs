// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Thermowatch - temperature and surveillance telemetry server
//!
//! Field nodes publish sensor registrations, temperature readings and
//! camera captures over MQTT. The server:
//! - keeps a catalog of sensors and captures (SQLite)
//! - stores readings in one round-robin series per sensor (rrdtool)
//! - raises threshold notifications with hysteresis
//! - renders rolling charts and reports silent sensors
//! - compacts past days of captures into timelapse videos
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       MQTT transport                         │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ↓ one message at a time
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Dispatcher                           │
//! │  ┌──────────┐  ┌─────────────┐  ┌────────┐  ┌──────────────┐ │
//! │  │ Registry │  │ Time series │  │ Alerts │  │ Surveillance │ │
//! │  └──────────┘  └─────────────┘  └────────┘  └──────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//!        ↓ own catalog handle each          ↑ notifications
//! ┌─────────────────────┐  ┌─────────────────────┐
//! │   Graph scheduler   │  │ Timelapse scheduler │
//! └─────────────────────┘  └─────────────────────┘
//! ```

pub mod alerts;
pub mod config;
pub mod core;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod protocol;
pub mod streaming;
pub mod surveillance;
pub mod timelapse;
pub mod timeseries;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use config::{Config, Layout};
pub use db::Catalog;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};

/// Thermowatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Thermowatch name
pub const NAME: &str = "Thermowatch";
