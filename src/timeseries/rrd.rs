// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! rrdtool-backed series store and chart renderer

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::TimeSeriesStore;
use crate::core::run_tool;
use crate::error::Result;
use crate::graph::{ChartStyle, GraphRange, GraphRenderer};
use crate::protocol::SensorRef;

/// Base step of every series, seconds
const STEP_SECS: u32 = 60;

/// Gauge `a`, 120 s heartbeat, valid range -50..50
const DATA_SOURCE: &str = "DS:a:GAUGE:120:-50:50";

/// 1 day at 2 min, 1 week at 15 min, 1 month at 1 h, 1 year at 6 h
const ARCHIVES: [&str; 4] = [
    "RRA:AVERAGE:0.5:2:720",
    "RRA:AVERAGE:0.5:15:672",
    "RRA:AVERAGE:0.5:60:720",
    "RRA:AVERAGE:0.5:360:1460",
];

/// Path of the series file for `key` under `dir`
pub fn series_file(dir: &Path, key: &SensorRef) -> PathBuf {
    dir.join(format!(
        "{}_{}_temperature.rrd",
        file_safe(&key.host),
        file_safe(&key.sensor)
    ))
}

fn file_safe(s: &str) -> String {
    s.replace(['/', '\\'], "_")
}

/// Wrapper around the `rrdtool` command line
#[derive(Debug, Clone)]
pub struct RrdTool {
    binary: PathBuf,
    dir: PathBuf,
}

impl RrdTool {
    pub fn new(binary: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            dir: dir.into(),
        }
    }

    pub fn series_path(&self, key: &SensorRef) -> PathBuf {
        series_file(&self.dir, key)
    }

    fn create_args(path: &Path) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            path.display().to_string(),
            "--start".to_string(),
            "now".to_string(),
            "--step".to_string(),
            STEP_SECS.to_string(),
            DATA_SOURCE.to_string(),
        ];
        args.extend(ARCHIVES.iter().map(|a| a.to_string()));
        args
    }

    fn update_args(path: &Path, epoch: i64, value: f64) -> Vec<String> {
        vec![
            "update".to_string(),
            path.display().to_string(),
            "--template".to_string(),
            "a".to_string(),
            format!("{}:{}", epoch, value),
        ]
    }

    fn graph_args(output: &Path, range: &GraphRange, style: &ChartStyle, definitions: &[String]) -> Vec<String> {
        let mut args = vec![
            "graph".to_string(),
            output.display().to_string(),
            "--start".to_string(),
            range.start.to_string(),
        ];
        if let Some(end) = range.end {
            args.push("--end".to_string());
            args.push(end.to_string());
        }
        args.extend([
            "-u".to_string(),
            style.upper_limit.to_string(),
            "-l".to_string(),
            style.lower_limit.to_string(),
        ]);
        if let Some(label) = range.label {
            args.push("-v".to_string());
            args.push(label.to_string());
        }
        args.extend([
            "--full-size-mode".to_string(),
            "--width".to_string(),
            style.width.to_string(),
            "--height".to_string(),
            style.height.to_string(),
            "--slope-mode".to_string(),
            "--color".to_string(),
            "SHADEB#9999CC".to_string(),
        ]);
        args.extend(definitions.iter().cloned());
        args
    }
}

impl TimeSeriesStore for RrdTool {
    fn create(&self, key: &SensorRef) -> Result<()> {
        let path = self.series_path(key);
        if path.exists() {
            debug!(sensor = %key, "series already exists at {:?}", path);
            return Ok(());
        }
        info!("creating rrd database for {}", key);
        run_tool(&self.binary, Self::create_args(&path), None)?;
        Ok(())
    }

    fn append(&self, key: &SensorRef, epoch: i64, value: f64) -> Result<()> {
        let args = Self::update_args(&self.series_path(key), epoch, value);
        debug!(sensor = %key, "RRD update: {}", args[4]);
        run_tool(&self.binary, args, None)?;
        Ok(())
    }

    fn has_series(&self, key: &SensorRef) -> bool {
        self.series_path(key).exists()
    }
}

impl GraphRenderer for RrdTool {
    fn render(&self, output: &Path, range: &GraphRange, style: &ChartStyle, definitions: &[String]) -> Result<()> {
        run_tool(&self.binary, Self::graph_args(output, range, style, definitions), None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RANGES;

    #[test]
    fn test_series_file_name() {
        let key = SensorRef::new("pi1", "28-0001");
        assert_eq!(
            series_file(Path::new("/data/rrd"), &key),
            PathBuf::from("/data/rrd/pi1_28-0001_temperature.rrd")
        );
        let nasty = SensorRef::new("../etc", "a/b");
        assert_eq!(
            series_file(Path::new("/data/rrd"), &nasty).parent(),
            Some(Path::new("/data/rrd"))
        );
    }

    #[test]
    fn test_create_and_update_args() {
        let path = Path::new("/r/pi1_s_temperature.rrd");
        let create = RrdTool::create_args(path);
        assert_eq!(&create[..7], ["create", "/r/pi1_s_temperature.rrd", "--start", "now", "--step", "60", DATA_SOURCE]);
        assert_eq!(create.len(), 7 + ARCHIVES.len());

        let update = RrdTool::update_args(path, 1_700_000_000, 21.5);
        assert_eq!(update, ["update", "/r/pi1_s_temperature.rrd", "--template", "a", "1700000000:21.5"]);
    }

    #[test]
    fn test_graph_args() {
        let style = ChartStyle::default();
        let defs = vec!["HRULE:0#0000FF:freezing\\n".to_string()];

        let hour = RrdTool::graph_args(Path::new("/c/temperature-hour.png"), &RANGES[0], &style, &defs);
        assert_eq!(&hour[..4], ["graph", "/c/temperature-hour.png", "--start", "-6h"]);
        assert!(!hour.contains(&"--end".to_string()));
        assert!(!hour.contains(&"-v".to_string()));
        assert_eq!(hour.last().unwrap(), &defs[0]);

        let day = RrdTool::graph_args(Path::new("/c/temperature-day.png"), &RANGES[1], &style, &defs);
        let end = day.iter().position(|a| a == "--end").unwrap();
        assert_eq!(day[end + 1], "now");
        let label = day.iter().position(|a| a == "-v").unwrap();
        assert_eq!(day[label + 1], "Last 24 hours");
        assert!(day.contains(&"700".to_string()));
    }

    #[test]
    fn test_create_skips_existing_series() {
        let tmp = tempfile::tempdir().unwrap();
        let rrd = RrdTool::new("/nonexistent/rrdtool", tmp.path());
        let key = SensorRef::new("pi1", "s1");
        assert!(!rrd.has_series(&key));

        std::fs::write(rrd.series_path(&key), b"existing").unwrap();
        assert!(rrd.has_series(&key));
        // the binary is never invoked, so the bogus path does not matter
        rrd.create(&key).unwrap();
    }
}
