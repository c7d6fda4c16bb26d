// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Periodic background jobs with cooperative shutdown

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;

/// Work executed once per tick on the blocking pool.
///
/// A job owns its own catalog handle; it is only ever driven by the task
/// that [`Scheduler::spawn`] creates for it.
pub trait PeriodicJob: Send + 'static {
    fn name(&self) -> &'static str;

    fn run_cycle(&mut self) -> Result<()>;
}

struct ScheduledTask {
    name: &'static str,
    interval: Duration,
    handle: JoinHandle<()>,
}

/// Drives periodic jobs until cancelled
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            tasks: Vec::new(),
            cancel,
        }
    }

    /// Token cancelled by [`shutdown`](Self::shutdown)
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start `job`; the first cycle runs immediately, then every `interval`
    pub fn spawn<J: PeriodicJob>(&mut self, job: J, interval: Duration) {
        let name = job.name();
        let cancel = self.cancel.clone();
        let job = Arc::new(Mutex::new(job));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(job = name, "stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let job = Arc::clone(&job);
                        let outcome = tokio::task::spawn_blocking(move || job.lock().run_cycle()).await;
                        match outcome {
                            Ok(Ok(())) => debug!(job = name, "cycle complete"),
                            Ok(Err(e)) if e.is_transient() => warn!(job = name, "cycle failed, retrying next tick: {}", e),
                            Ok(Err(e)) => error!(job = name, "cycle failed: {}", e),
                            Err(e) => error!(job = name, "cycle aborted: {}", e),
                        }
                    }
                }
            }
        });

        info!(job = name, ?interval, "scheduled");
        self.tasks.push(ScheduledTask {
            name,
            interval,
            handle,
        });
    }

    /// Cancel every job and wait for in-flight cycles to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.handle.await {
                error!(job = task.name, "task ended abnormally: {}", e);
            } else {
                debug!(job = task.name, interval = ?task.interval, "joined");
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
