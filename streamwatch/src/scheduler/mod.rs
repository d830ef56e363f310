//! Scheduling of the watch loop.
//!
//! [`WatchScheduler`] owns the liveness set and runs poll, detect and
//! dispatch on a fixed cadence until cancelled. At shutdown it writes the
//! snapshot consumed by the next start.

mod service;

pub use service::{CycleReport, SchedulerConfig, ShutdownReport, WatchScheduler};
