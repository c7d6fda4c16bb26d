// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Round-robin time-series storage
//!
//! One series per `(host, sensor)`. Retention and downsampling belong to
//! the backing engine; the ingestion path only creates series and appends
//! points.

mod rrd;

pub use rrd::{series_file, RrdTool};

use crate::error::Result;
use crate::protocol::SensorRef;

/// Append/query contract over the round-robin engine
pub trait TimeSeriesStore: Send {
    /// Provision a series; a series that already exists is left untouched
    fn create(&self, key: &SensorRef) -> Result<()>;

    /// Append a point. The engine may reject points older than its last one.
    fn append(&self, key: &SensorRef, epoch: i64, value: f64) -> Result<()>;

    fn has_series(&self, key: &SensorRef) -> bool;
}
