use std::{cell::RefCell, rc::Rc};

use super::{ScheduleFunction, ScheduleQueued};
use crate::{
  disposable::Disposable,
  error::{Error, Fallible},
};

type Repeating = Rc<RefCell<dyn FnMut() -> Result<(), Error>>>;

/// A [`ScheduleQueued`] that keeps re-running each callback.
///
/// Every delivered callback is scheduled again, behind whatever else is
/// queued, as long as its disposable stays active and it did not fail. This
/// turns a one-shot primitive such as a timeout into a repeating driver.
pub struct ScheduleQueuedDiscrete<S>(ScheduleQueued<S>);

impl<S> Clone for ScheduleQueuedDiscrete<S> {
  fn clone(&self) -> Self { ScheduleQueuedDiscrete(self.0.clone()) }
}

#[inline]
pub fn schedule_queued_discrete<S: ScheduleFunction + 'static>(
  schedule: S,
) -> ScheduleQueuedDiscrete<S> {
  ScheduleQueuedDiscrete::new(schedule)
}

impl<S: ScheduleFunction + 'static> ScheduleQueuedDiscrete<S> {
  pub fn new(schedule: S) -> Self { ScheduleQueuedDiscrete(ScheduleQueued::new(schedule)) }

  /// Run `callback` repeatedly until `disposable` is disposed.
  pub fn schedule<F, R>(&self, callback: F, disposable: &Disposable) -> Result<(), Error>
  where
    F: FnMut() -> R + 'static,
    R: Fallible,
  {
    let mut callback = callback;
    let repeating: Repeating = Rc::new(RefCell::new(move || callback().into_result()));
    deliver(self.0.clone(), repeating, disposable.clone())
  }

  /// Number of callbacks waiting for their next run.
  pub fn pending(&self) -> usize { self.0.pending() }
}

fn deliver<S: ScheduleFunction + 'static>(
  queued: ScheduleQueued<S>,
  callback: Repeating,
  disposable: Disposable,
) -> Result<(), Error> {
  let (c_queued, c_disposable) = (queued.clone(), disposable.clone());
  let once = Box::new(move || {
    let result = (&mut *callback.borrow_mut())();
    if result.is_ok() && c_disposable.active() {
      deliver(c_queued, callback, c_disposable)?;
    }
    result
  });
  queued.schedule(once, Some(&disposable))
}
