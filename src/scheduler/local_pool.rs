use futures::{executor::LocalSpawner, task::LocalSpawnExt};

use super::{Callback, ScheduleFunction};
use crate::{disposable::Disposable, error::Error, report::report_error};

/// A schedule function that spawns each callback onto a
/// [`LocalPool`](futures::executor::LocalPool).
///
/// The callback runs the next time the pool is polled, unless its disposable
/// was disposed in between. Nobody waits on the spawned task, so a callback
/// error is reported.
#[derive(Clone)]
pub struct LocalPoolScheduler {
  spawner: LocalSpawner,
}

impl LocalPoolScheduler {
  pub fn new(spawner: LocalSpawner) -> Self { LocalPoolScheduler { spawner } }
}

impl ScheduleFunction for LocalPoolScheduler {
  fn schedule(&self, callback: Callback, disposable: Option<&Disposable>) -> Result<(), Error> {
    let disposable = disposable.cloned();
    self
      .spawner
      .spawn_local(async move {
        if disposable.as_ref().map_or(true, Disposable::active) {
          if let Err(err) = callback() {
            report_error(err);
          }
        }
      })
      .map_err(Error::new)
  }
}
