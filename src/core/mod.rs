//! Core runtime pieces - background scheduling and external tool invocation

mod process;
mod scheduler;

pub use process::run_tool;
pub use scheduler::{PeriodicJob, Scheduler};

/// Current wall-clock time as Unix seconds
pub fn epoch_now() -> i64 {
    chrono::Utc::now().timestamp()
}
