//! Scheduler module for recurring price checks.
//!
//! - [`Cadence`]: parsed cron expression
//! - [`JobRegistry`]: at most one [`ScheduleHandle`] per product
//! - [`Scheduler`]: spawns one task per scheduled product and runs on-demand checks

mod cadence;
mod cycle;
mod handle;
mod registry;
mod service;

pub use cadence::{Cadence, DEFAULT_CADENCE};
pub use cycle::{CheckResult, CycleGuards};
pub use handle::{ScheduleHandle, ScheduleInfo};
pub use registry::JobRegistry;
pub use service::{Scheduler, SchedulerConfig};
