// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! In-memory stand-ins for the broker, rrdtool and mencoder

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graph::{ChartStyle, GraphRange, GraphRenderer};
use crate::protocol::{Envelope, SensorRef};
use crate::streaming::Notifier;
use crate::timelapse::VideoRenderer;
use crate::timeseries::TimeSeriesStore;

/// Records every publish; optionally refuses them all
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, Envelope)>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, Envelope)> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, topic: &str, envelope: &Envelope) -> Result<()> {
        if self.fail {
            return Err(Error::Publish("client queue full".into()));
        }
        self.sent.lock().push((topic.to_string(), envelope.clone()));
        Ok(())
    }
}

/// Series store that, like rrdtool, refuses points not newer than the last
#[derive(Clone, Default)]
pub struct MemoryStore {
    series: Arc<Mutex<HashMap<SensorRef, Vec<(i64, f64)>>>>,
    creates: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn series_count(&self) -> usize {
        self.series.lock().len()
    }

    pub fn create_calls(&self) -> usize {
        *self.creates.lock()
    }

    pub fn points(&self, key: &SensorRef) -> Vec<(i64, f64)> {
        self.series.lock().get(key).cloned().unwrap_or_default()
    }
}

impl TimeSeriesStore for MemoryStore {
    fn create(&self, key: &SensorRef) -> Result<()> {
        *self.creates.lock() += 1;
        self.series.lock().entry(key.clone()).or_default();
        Ok(())
    }

    fn append(&self, key: &SensorRef, epoch: i64, value: f64) -> Result<()> {
        let mut series = self.series.lock();
        let points = series
            .get_mut(key)
            .ok_or_else(|| Error::renderer("rrdtool", format!("no series for {}", key)))?;
        if let Some((last, _)) = points.last() {
            if epoch <= *last {
                return Err(Error::renderer(
                    "rrdtool",
                    format!("illegal attempt to update using time {} when last update time is {}", epoch, last),
                ));
            }
        }
        points.push((epoch, value));
        Ok(())
    }

    fn has_series(&self, key: &SensorRef) -> bool {
        self.series.lock().contains_key(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub output: PathBuf,
    pub range: &'static str,
    pub definitions: Vec<String>,
}

/// Chart renderer that records calls and fails for the named ranges
#[derive(Clone, Default)]
pub struct ScriptedGraphRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    failing: Vec<&'static str>,
}

impl ScriptedGraphRenderer {
    pub fn failing_on(ranges: &[&'static str]) -> Self {
        Self {
            failing: ranges.to_vec(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }
}

impl GraphRenderer for ScriptedGraphRenderer {
    fn render(&self, output: &Path, range: &GraphRange, _style: &ChartStyle, definitions: &[String]) -> Result<()> {
        self.calls.lock().push(RenderCall {
            output: output.to_path_buf(),
            range: range.name,
            definitions: definitions.to_vec(),
        });
        if self.failing.contains(&range.name) {
            return Err(Error::renderer("rrdtool", format!("scripted failure for {}", range.name)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoCall {
    pub workdir: PathBuf,
    pub images: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Video renderer that writes a placeholder output or fails every call
#[derive(Clone, Default)]
pub struct ScriptedVideoRenderer {
    calls: Arc<Mutex<Vec<VideoCall>>>,
    fail: bool,
}

impl ScriptedVideoRenderer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<VideoCall> {
        self.calls.lock().clone()
    }
}

impl VideoRenderer for ScriptedVideoRenderer {
    fn render(&self, workdir: &Path, images: &[PathBuf], output: &Path) -> Result<()> {
        self.calls.lock().push(VideoCall {
            workdir: workdir.to_path_buf(),
            images: images.to_vec(),
            output: output.to_path_buf(),
        });
        if self.fail {
            return Err(Error::renderer("mencoder", "exit status: 1"));
        }
        std::fs::write(output, b"avi").map_err(|e| Error::io(output, e))
    }
}
