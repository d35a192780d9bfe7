use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use super::{Callback, ScheduleFunction};
use crate::{
  disposable::Disposable,
  error::{self, Error},
};

struct Scheduled {
  callback: Callback,
  disposable: Option<Disposable>,
}

/// A schedule function whose callbacks only run when its owner says so.
///
/// Callbacks run in the order they were scheduled, one per
/// [`run_next`](ManualScheduler::run_next). Cancelled callbacks are skipped.
/// Useful to drive a [`ScheduleQueued`](super::ScheduleQueued) step by step,
/// or to embed it in a loop the application already owns.
#[derive(Clone, Default)]
pub struct ManualScheduler(Rc<RefCell<VecDeque<Scheduled>>>);

impl ManualScheduler {
  pub fn new() -> Self { Self::default() }

  /// Number of scheduled callbacks that were not cancelled.
  pub fn pending(&self) -> usize {
    self
      .0
      .borrow()
      .iter()
      .filter(|s| s.disposable.as_ref().map_or(true, |d| d.active()))
      .count()
  }

  /// Run the oldest live callback. Returns `None` if there was none.
  pub fn run_next(&self) -> Option<Result<(), Error>> {
    loop {
      let next = self.0.borrow_mut().pop_front()?;
      if next.disposable.as_ref().map_or(true, |d| d.active()) {
        return Some((next.callback)());
      }
    }
  }

  /// Run callbacks until none is left, including those scheduled meanwhile.
  /// Every error is collected; a failing callback does not stop the flush.
  pub fn flush(&self) -> Result<(), Error> {
    let mut errors = vec![];
    while let Some(result) = self.run_next() {
      errors.extend(result.err());
    }
    error::collect(errors)
  }
}

impl ScheduleFunction for ManualScheduler {
  fn schedule(&self, callback: Callback, disposable: Option<&Disposable>) -> Result<(), Error> {
    let disposable = disposable.cloned();
    self.0.borrow_mut().push_back(Scheduled { callback, disposable });
    Ok(())
  }
}
