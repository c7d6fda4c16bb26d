// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Graph scheduler - liveness checks and periodic chart rendering
//!
//! Every cycle first reports sensors that went silent, then renders one
//! chart per fixed time range covering all graph-enabled sensors.

mod plot;
mod solar;

pub use plot::{build_definitions, PlotSeries, PALETTE};
pub use solar::{sun_times, SolarCalendar, SunTimes};

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{GraphConfig, Layout};
use crate::core::{epoch_now, PeriodicJob};
use crate::db::Catalog;
use crate::error::Result;
use crate::protocol::{notification_topic, stale_message, Envelope, NotificationKind};
use crate::streaming::Notifier;
use crate::timeseries::series_file;

/// A rendered time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphRange {
    /// Output suffix: `temperature-<name>.png`
    pub name: &'static str,
    pub start: &'static str,
    pub end: Option<&'static str>,
    /// Vertical axis label
    pub label: Option<&'static str>,
}

pub const RANGES: [GraphRange; 5] = [
    GraphRange { name: "hour", start: "-6h", end: None, label: None },
    GraphRange { name: "day", start: "-1d", end: Some("now"), label: Some("Last 24 hours") },
    GraphRange { name: "week", start: "-1w", end: Some("now"), label: Some("Last week") },
    GraphRange { name: "month", start: "-1month", end: Some("now"), label: Some("Last month") },
    GraphRange { name: "year", start: "-1y", end: Some("now"), label: Some("Last year") },
];

/// Chart geometry and value bounds
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub upper_limit: f64,
    pub lower_limit: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::from(&GraphConfig::default())
    }
}

impl From<&GraphConfig> for ChartStyle {
    fn from(config: &GraphConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            upper_limit: config.upper_limit,
            lower_limit: config.lower_limit,
        }
    }
}

/// External chart rasterizer
pub trait GraphRenderer: Send {
    fn render(&self, output: &Path, range: &GraphRange, style: &ChartStyle, definitions: &[String]) -> Result<()>;
}

/// Outcome of one rendering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub sensors: usize,
    pub rendered: usize,
    pub failed: usize,
}

pub struct GraphJob<R, N> {
    catalog: Catalog,
    renderer: R,
    notifier: N,
    rrd_dir: PathBuf,
    charts_dir: PathBuf,
    style: ChartStyle,
    liveness_window_secs: u64,
    solar: SolarCalendar,
}

impl<R: GraphRenderer, N: Notifier> GraphJob<R, N> {
    pub fn new(catalog: Catalog, renderer: R, notifier: N, config: &GraphConfig, layout: &Layout) -> Self {
        Self {
            catalog,
            renderer,
            notifier,
            rrd_dir: layout.rrd_dir.clone(),
            charts_dir: layout.charts_dir.clone(),
            style: ChartStyle::from(config),
            liveness_window_secs: config.liveness_window_secs,
            solar: SolarCalendar::new(config.latitude, config.longitude),
        }
    }

    pub fn chart_path(&self, range: &GraphRange) -> PathBuf {
        self.charts_dir.join(format!("temperature-{}.png", range.name))
    }

    /// Report each sensor silent for longer than the liveness window once.
    ///
    /// The latch is only set when the notification was queued, so a failed
    /// publish is retried next cycle.
    pub fn check_liveness(&mut self, now: i64) -> Result<usize> {
        let registry = self.catalog.sensors();
        let stale = registry.stale_sensors(self.liveness_window_secs, now)?;

        let mut reported = 0;
        for s in stale {
            let envelope = Envelope::notification(stale_message(&s.host, &s.sensor, s.last_update));
            let topic = notification_topic(&s.host, NotificationKind::Alert);
            match self.notifier.publish(&topic, &envelope) {
                Ok(()) => {
                    registry.mark_notified(&s.host, &s.sensor)?;
                    info!(host = %s.host, sensor = %s.sensor, last_update = s.last_update, "sensor stopped reporting");
                    reported += 1;
                }
                Err(e) => warn!(host = %s.host, sensor = %s.sensor, "staleness notification not sent: {}", e),
            }
        }
        Ok(reported)
    }

    /// Render every range for the graph-enabled sensors
    pub fn render_charts(&mut self, sun: &SunTimes) -> Result<RenderReport> {
        let registry = self.catalog.sensors();
        let sensors = registry.sensors_enabled_for_graphing()?;
        if sensors.is_empty() {
            debug!("no graph-enabled sensors");
            return Ok(RenderReport::default());
        }

        let mut entries = Vec::with_capacity(sensors.len());
        for key in &sensors {
            debug!("Get sensor name: {}", key);
            let label = registry.resolve_alias(&key.host, &key.sensor)?;
            entries.push((label, series_file(&self.rrd_dir, key)));
        }
        let definitions = build_definitions(&PlotSeries::assign(entries), sun);

        let mut report = RenderReport {
            sensors: sensors.len(),
            ..RenderReport::default()
        };
        for range in &RANGES {
            let output = self.chart_path(range);
            match self.renderer.render(&output, range, &self.style, &definitions) {
                Ok(()) => report.rendered += 1,
                Err(e) => {
                    warn!(range = range.name, "chart rendering failed: {}", e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

impl<R, N> PeriodicJob for GraphJob<R, N>
where
    R: GraphRenderer + 'static,
    N: Notifier + 'static,
{
    fn name(&self) -> &'static str {
        "graph"
    }

    fn run_cycle(&mut self) -> Result<()> {
        info!("Checking last_update");
        let reported = self.check_liveness(epoch_now())?;

        info!("Updating RRD Graphs");
        let sun = self.solar.today();
        let report = self.render_charts(&sun)?;
        debug!(reported, rendered = report.rendered, failed = report.failed, "Done updating RRD Graphs");
        Ok(())
    }
}
