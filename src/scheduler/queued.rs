use std::{
  cell::{Cell, RefCell},
  collections::VecDeque,
  rc::Rc,
};

use super::{Callback, ScheduleFunction};
use crate::{
  disposable::{Disposable, TeardownId},
  error::{self, Error},
};

struct Entry {
  callback: RefCell<Option<Callback>>,
  removed: Cell<bool>,
  running: Cell<bool>,
  /// The caller's cancellation node and the teardown linking it to us.
  linked: RefCell<Option<(Disposable, TeardownId)>>,
}

impl Entry {
  fn new(callback: Callback) -> Rc<Self> {
    Rc::new(Entry {
      callback: RefCell::new(Some(callback)),
      removed: Cell::new(false),
      running: Cell::new(false),
      linked: RefCell::new(None),
    })
  }

  fn cancel(&self) {
    if self.running.get() {
      return;
    }
    self.removed.set(true);
    let callback = self.callback.borrow_mut().take();
    drop(callback);
  }

  /// Detach from the caller's cancellation node once we can no longer run.
  fn unlink(&self) {
    let linked = self.linked.borrow_mut().take();
    if let Some((disposable, id)) = linked {
      disposable.remove_teardown(id);
    }
  }
}

#[derive(Default)]
struct QueueState {
  queue: VecDeque<Rc<Entry>>,
  /// Cancels the one outstanding underlying call, if any.
  driver: Option<Disposable>,
  in_callback: bool,
  /// Entries scheduled by the callback currently running.
  recursive: Vec<Rc<Entry>>,
}

struct QueuedInner<S> {
  schedule: S,
  state: RefCell<QueueState>,
}

/// Serializes any number of callbacks onto a one-shot schedule function.
///
/// Callbacks run in FIFO order, one per underlying call, and at most one
/// underlying call is outstanding at any time. A callback scheduled from
/// inside a running callback goes to the back of the queue, behind work that
/// was already waiting.
///
/// If a callback fails, every callback still queued is dropped and the error
/// is returned to the underlying scheduler. Callbacks scheduled afterwards run
/// normally.
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use rxcore::prelude::*;
///
/// let manual = ManualScheduler::new();
/// let queued = schedule_queued(manual.clone());
/// let order = Rc::new(RefCell::new(vec![]));
///
/// for i in 0..3 {
///   let order = order.clone();
///   queued.schedule(callback(move || order.borrow_mut().push(i)), None).unwrap();
/// }
/// // Only one underlying call is outstanding.
/// assert_eq!(manual.pending(), 1);
///
/// manual.flush().unwrap();
/// assert_eq!(*order.borrow(), vec![0, 1, 2]);
/// ```
pub struct ScheduleQueued<S>(Rc<QueuedInner<S>>);

impl<S> Clone for ScheduleQueued<S> {
  fn clone(&self) -> Self { ScheduleQueued(self.0.clone()) }
}

/// Wrap `schedule` into a [`ScheduleQueued`].
#[inline]
pub fn schedule_queued<S: ScheduleFunction + 'static>(schedule: S) -> ScheduleQueued<S> {
  ScheduleQueued::new(schedule)
}

impl<S: ScheduleFunction + 'static> ScheduleQueued<S> {
  pub fn new(schedule: S) -> Self {
    ScheduleQueued(Rc::new(QueuedInner { schedule, state: RefCell::new(QueueState::default()) }))
  }

  /// Number of callbacks waiting to run.
  pub fn pending(&self) -> usize {
    let state = self.0.state.borrow();
    state
      .queue
      .iter()
      .chain(state.recursive.iter())
      .filter(|e| !e.removed.get())
      .count()
  }

  fn enqueue(&self, callback: Callback, disposable: Option<&Disposable>) -> Result<(), Error> {
    if disposable.is_some_and(|d| !d.active()) {
      return Ok(());
    }
    let entry = Entry::new(callback);
    if let Some(disposable) = disposable {
      let weak = Rc::downgrade(&entry);
      let id = disposable.add_teardown(move || {
        if let Some(entry) = weak.upgrade() {
          entry.cancel();
        }
      })?;
      *entry.linked.borrow_mut() = Some((disposable.clone(), id));
    }

    let arm = {
      let mut state = self.0.state.borrow_mut();
      if state.in_callback {
        state.recursive.push(entry);
        false
      } else {
        state.queue.push_back(entry);
        state.driver.is_none()
      }
    };
    if arm { self.arm() } else { Ok(()) }
  }

  /// Issue the single underlying call that will run the queue head.
  fn arm(&self) -> Result<(), Error> {
    let driver = Disposable::new();
    self.0.state.borrow_mut().driver = Some(driver.clone());

    let this = self.clone();
    let scheduled = self.0.schedule.schedule(Box::new(move || this.run()), Some(&driver));
    if let Err(err) = scheduled {
      // A synchronous schedule function hands back the callback's own error.
      log::debug!("schedule function returned an error: {err}");
      let dropped = {
        let mut state = self.0.state.borrow_mut();
        if state.driver.as_ref().is_some_and(|d| d.ptr_eq(&driver)) {
          state.driver = None;
        }
        std::mem::take(&mut state.queue)
      };
      dropped.iter().for_each(|e| e.unlink());
      return Err(err);
    }
    Ok(())
  }

  fn run(&self) -> Result<(), Error> {
    let entry = {
      let mut state = self.0.state.borrow_mut();
      let mut next = state.queue.pop_front();
      while next.as_ref().is_some_and(|e| e.removed.get()) {
        next = state.queue.pop_front();
      }
      let Some(entry) = next else {
        state.driver = None;
        log::trace!("schedule queue drained");
        return Ok(());
      };
      state.in_callback = true;
      entry
    };

    entry.running.set(true);
    let callback = entry.callback.borrow_mut().take();
    let result = callback.map_or(Ok(()), |callback| callback());
    entry.running.set(false);
    entry.unlink();

    let mut state = self.0.state.borrow_mut();
    state.in_callback = false;
    let recursive = std::mem::take(&mut state.recursive);
    state.queue.extend(recursive);

    match result {
      Ok(()) => {
        if state.queue.iter().any(|e| !e.removed.get()) {
          drop(state);
          return self.arm();
        }
        let finished = std::mem::take(&mut state.queue);
        state.driver = None;
        drop(state);
        drop(finished);
        Ok(())
      }
      Err(err) => {
        let dropped = std::mem::take(&mut state.queue);
        let driver = state.driver.take();
        drop(state);

        log::debug!("scheduled callback failed, dropping {} queued callback(s)", dropped.len());
        dropped.iter().for_each(|e| e.unlink());
        drop(dropped);
        match driver.map(|d| d.dispose()) {
          Some(Err(dispose_err)) => error::collect(vec![err, dispose_err]),
          _ => Err(err),
        }
      }
    }
  }
}

impl<S: ScheduleFunction + 'static> ScheduleFunction for ScheduleQueued<S> {
  #[inline]
  fn schedule(&self, callback: Callback, disposable: Option<&Disposable>) -> Result<(), Error> {
    self.enqueue(callback, disposable)
  }
}
