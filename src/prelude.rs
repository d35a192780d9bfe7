//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Scheduling
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::LocalPoolScheduler;
pub use crate::{
  disposable::{Disposable, DisposableLike, DisposeGuard, TeardownId},
  error::{Error, Fallible},
  event::Event,
  report::{report_error, set_reporter, LogReporter, ReportError, ReporterGuard},
  scheduler::{
    callback, schedule_queued, schedule_queued_discrete, Callback, Clock, ManualScheduler,
    ScheduleFunction, ScheduleQueued, ScheduleQueuedDiscrete, SystemClock,
  },
  sink::Sink,
  source::{create, Create, Source},
  subject::*,
};
