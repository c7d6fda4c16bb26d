// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Timelapse scheduler - compacts past days of captures into videos
//!
//! Each cycle renders one video per host and calendar day strictly before
//! today, deletes the compacted captures and their rows, then prunes old
//! videos. A failed render leaves its captures for the next cycle.

mod encoder;

pub use encoder::{Mencoder, VideoRenderer};

use chrono::{Local, NaiveDate};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::config::{Layout, TimelapseConfig};
use crate::core::PeriodicJob;
use crate::db::{Catalog, SurveillanceImage};
use crate::error::{Error, Result};
use crate::surveillance::SurveillanceIngest;

/// Outcome of one compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    pub groups: usize,
    pub rendered: usize,
    pub failed: usize,
    /// Groups whose captures were all gone from disk
    pub orphaned: usize,
    /// Groups whose video already existed; their captures were discarded
    pub late: usize,
    pub images_removed: usize,
}

pub struct TimelapseJob<V> {
    catalog: Catalog,
    images: SurveillanceIngest,
    output_dir: PathBuf,
    renderer: V,
    retention: Duration,
}

impl<V: VideoRenderer> TimelapseJob<V> {
    pub fn new(catalog: Catalog, renderer: V, config: &TimelapseConfig, layout: &Layout) -> Self {
        Self {
            catalog,
            images: SurveillanceIngest::new(&layout.surveillance_dir),
            output_dir: layout.timelapse_dir.clone(),
            renderer,
            retention: config.retention(),
        }
    }

    pub fn output_path(&self, host: &str, date: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.avi", host.replace(['/', '\\'], "_"), date.format("%Y-%m-%d")))
    }

    /// Render and remove every `(host, day)` group before `today`.
    ///
    /// A group that fails is logged and left for the next cycle; the
    /// remaining groups still run.
    pub fn compact(&mut self, today: NaiveDate) -> Result<CompactionReport> {
        let mut report = CompactionReport::default();

        for host in self.catalog.surveillance().hosts()? {
            let dates = match self.catalog.surveillance().dates_before(&host, today) {
                Ok(dates) => dates,
                Err(e) => {
                    warn!(host = %host, "cannot list capture days: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            for date in dates {
                report.groups += 1;
                if let Err(e) = self.compact_group(&host, date, &mut report) {
                    warn!(host = %host, %date, "timelapse not created: {}", e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    fn compact_group(&self, host: &str, date: NaiveDate, report: &mut CompactionReport) -> Result<()> {
        let index = self.catalog.surveillance();
        let rows = index.images_for(host, date)?;
        let output = self.output_path(host, date);

        // captures redelivered after their day was compacted
        if output.exists() {
            warn!(host, %date, "{:?} already rendered, discarding {} late captures", output, rows.len());
            report.images_removed += remove_captures(&self.images, &rows);
            index.delete(&rows)?;
            report.late += 1;
            return Ok(());
        }

        let frames: Vec<PathBuf> = rows
            .iter()
            .map(|row| self.images.path_of(row))
            .filter(|path| path.exists())
            .collect();

        if frames.is_empty() {
            warn!(host, %date, "no capture files left, dropping {} rows", rows.len());
            index.delete(&rows)?;
            report.orphaned += 1;
            return Ok(());
        }

        info!(host, %date, "creating timelapse from {} images", frames.len());
        self.renderer.render(self.images.dir(), &frames, &output)?;
        report.images_removed += remove_captures(&self.images, &rows);
        index.delete(&rows)?;
        report.rendered += 1;
        Ok(())
    }

    /// Delete `*.avi` outputs modified more than the retention window before `now`
    pub fn prune(&self, now: SystemTime) -> Result<usize> {
        let cutoff = now.checked_sub(self.retention).unwrap_or(SystemTime::UNIX_EPOCH);
        prune_dir(&self.output_dir, cutoff)
    }
}

fn remove_captures(images: &SurveillanceIngest, rows: &[SurveillanceImage]) -> usize {
    let mut removed = 0;
    for row in rows {
        let path = images.path_of(row);
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove {:?}: {}", path, e),
        }
    }
    removed
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("avi"))
        .unwrap_or(false)
}

fn prune_dir(dir: &Path, cutoff: SystemTime) -> Result<usize> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut removed = 0;

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| Error::io(&path, e))?;

        if meta.is_dir() {
            removed += prune_dir(&path, cutoff)?;
            continue;
        }
        if !is_video(&path) {
            continue;
        }
        let modified = meta.modified().map_err(|e| Error::io(&path, e))?;
        if modified < cutoff {
            debug!("removing expired timelapse {:?}", path);
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

impl<V: VideoRenderer + 'static> PeriodicJob for TimelapseJob<V> {
    fn name(&self) -> &'static str {
        "timelapse"
    }

    fn run_cycle(&mut self) -> Result<()> {
        info!("Looking for images to create timelapse");
        let compacted = self.compact(Local::now().date_naive());
        let pruned = self.prune(SystemTime::now());
        let (report, pruned) = (compacted?, pruned?);
        debug!(
            groups = report.groups,
            rendered = report.rendered,
            failed = report.failed,
            pruned,
            "timelapse cycle done"
        );
        Ok(())
    }
}
