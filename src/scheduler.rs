//! Scheduling primitives and the FIFO adapters built on top of them.
//!
//! A *schedule function* takes one callback and runs it once, later, unless
//! the disposable handed along with it is disposed first. Timers, animation
//! frames and executor spawns all fit that shape. [`ScheduleQueued`]
//! serializes any number of callbacks onto such a primitive, and
//! [`ScheduleQueuedDiscrete`] turns it into a repeating driver.

use std::time::Instant;

use crate::{
  disposable::Disposable,
  error::{Error, Fallible},
};

mod discrete;
#[cfg(feature = "futures-scheduler")]
mod local_pool;
mod manual;
mod queued;

pub use discrete::{schedule_queued_discrete, ScheduleQueuedDiscrete};
#[cfg(feature = "futures-scheduler")]
pub use local_pool::LocalPoolScheduler;
pub use manual::ManualScheduler;
pub use queued::{schedule_queued, ScheduleQueued};

/// A unit of scheduled work.
pub type Callback = Box<dyn FnOnce() -> Result<(), Error>>;

/// Box a closure returning `()` or a `Result` into a [`Callback`].
pub fn callback<F, R>(f: F) -> Callback
where
  F: FnOnce() -> R + 'static,
  R: Fallible,
{
  Box::new(move || f().into_result())
}

/// Runs a callback once, at a time of its own choosing.
///
/// If `disposable` is given and gets disposed before the callback runs, the
/// callback must not run. An `Err` from `schedule` means the callback was not
/// accepted and will never run.
pub trait ScheduleFunction {
  fn schedule(&self, callback: Callback, disposable: Option<&Disposable>) -> Result<(), Error>;
}

impl<F> ScheduleFunction for F
where
  F: Fn(Callback, Option<&Disposable>) -> Result<(), Error>,
{
  #[inline]
  fn schedule(&self, callback: Callback, disposable: Option<&Disposable>) -> Result<(), Error> {
    self(callback, disposable)
  }
}

/// A source of monotonic time.
pub trait Clock {
  fn now(&self) -> Instant;
}

/// The wall clock, via [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }
}

impl<F: Fn() -> Instant> Clock for F {
  #[inline]
  fn now(&self) -> Instant { self() }
}
