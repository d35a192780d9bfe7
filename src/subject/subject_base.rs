use std::{
  cell::RefCell,
  rc::{Rc, Weak},
};

use super::{subscribers::Subscribers, SubjectLike};
use crate::{
  disposable::{Disposable, DisposableLike},
  error::{self, Error},
  event::Event,
  report::report_error,
  sink::Sink,
  source::Source,
};

type Recorder<T> = Box<dyn Fn(&Event<T>)>;

struct BaseInner<T> {
  disposable: Disposable,
  subscribers: RefCell<Subscribers<T>>,
  /// Sees every accepted event as its distribution starts.
  recorder: Option<Recorder<T>>,
}

impl<T> BaseInner<T> {
  #[inline]
  fn record(&self, event: &Event<T>) {
    if let Some(recorder) = &self.recorder {
      recorder(event);
    }
  }

  /// Drop every internal collection unless a distribution still needs them.
  /// The released records are dropped after the borrow ends, since dropping a
  /// sink may run arbitrary code.
  fn release(&self) {
    let released = {
      let mut subs = self.subscribers.borrow_mut();
      if subs.distributing() {
        return;
      }
      std::mem::take(&mut *subs)
    };
    drop(released);
  }
}

/// The multicast distribution engine every subject is built on.
///
/// Handing it an event fans the event out synchronously to every registered
/// sink. The registry may be changed from inside a handler while that happens:
///
/// - A sink subscribed during a distribution is staged. It never sees the
///   event being distributed and joins for the next one.
/// - A sink disposed during a distribution is unregistered without the loop
///   skipping or revisiting anyone.
/// - An event sent from inside a handler is queued and distributed once the
///   current event reached every sink, so all sinks observe the same order.
///
/// A terminal event disposes the subject before it is distributed.
pub struct SubjectBase<T>(Rc<BaseInner<T>>);

impl<T> Clone for SubjectBase<T> {
  fn clone(&self) -> Self { SubjectBase(self.0.clone()) }
}

impl<T: Clone + 'static> Default for SubjectBase<T> {
  fn default() -> Self { Self::new() }
}

impl<T: Clone + 'static> SubjectBase<T> {
  pub fn new() -> Self { Self::build(None) }

  /// A base that calls `recorder` with each event when it starts handing that
  /// event out, after any event queued before it was handed out. Replaying
  /// subjects keep their state this way, so a sink subscribed while an event
  /// is still queued is never given that event twice.
  pub(crate) fn with_recorder(recorder: impl Fn(&Event<T>) + 'static) -> Self {
    Self::build(Some(Box::new(recorder)))
  }

  fn build(recorder: Option<Recorder<T>>) -> Self {
    SubjectBase(Rc::new_cyclic(|weak: &Weak<BaseInner<T>>| {
      let weak = weak.clone();
      let disposable = Disposable::with_teardown(move || {
        if let Some(inner) = weak.upgrade() {
          log::trace!("subject disposed");
          inner.release();
        }
      });
      BaseInner { disposable, subscribers: RefCell::new(Subscribers::default()), recorder }
    }))
  }

  /// Number of registered sinks, staged ones included.
  pub fn subscriber_count(&self) -> usize { self.0.subscribers.borrow().len() }

  fn distribute(&self, mut event: Event<T>) {
    let inner = &self.0;
    loop {
      inner.record(&event);
      let push = event.is_push();
      loop {
        let current = inner.subscribers.borrow().current();
        let Some(record) = current else { break };

        if record.removed.get() || !record.sink.active() {
          let mut subs = inner.subscribers.borrow_mut();
          // A terminal pass clears the registry afterwards anyway.
          if push { subs.evict_current() } else { subs.advance() }
          continue;
        }

        record.sink.send(event.clone());

        let mut subs = inner.subscribers.borrow_mut();
        if record.removed.get() || !record.sink.active() {
          subs.evict_current();
        } else {
          subs.advance();
        }
      }

      let mut subs = inner.subscribers.borrow_mut();
      if push {
        subs.merge_staged();
        if let Some(next) = subs.queue.pop_front() {
          subs.cursor = Some(0);
          event = next;
          continue;
        }
        subs.cursor = None;
        return;
      }
      let released = std::mem::take(&mut *subs);
      drop(subs);
      drop(released);
      return;
    }
  }
}

impl<T: Clone + 'static> Source<T> for SubjectBase<T> {
  fn subscribe(&self, sink: &Sink<T>) {
    if !self.0.disposable.active() || !sink.active() {
      return;
    }
    let record = self.0.subscribers.borrow_mut().insert(sink.clone());

    let subject = Rc::downgrade(&self.0);
    let record = Rc::downgrade(&record);
    let unregister = sink.add_teardown(move || {
      if let (Some(subject), Some(record)) = (subject.upgrade(), record.upgrade()) {
        subject.subscribers.borrow_mut().remove(&record);
      }
    });
    if let Err(err) = unregister {
      report_error(err);
    }
  }
}

impl<T: Clone + 'static> SubjectLike<T> for SubjectBase<T> {
  /// Distribute `event`. Errors raised while disposing the subject on a
  /// terminal event are collected and returned once the whole pass, queued
  /// events included, has finished.
  fn send(&self, event: Event<T>) -> Result<(), Error> {
    let inner = &self.0;
    if !inner.disposable.active() {
      if let Event::Throw(err) = event {
        report_error(err);
      }
      return Ok(());
    }

    let mut errors = vec![];
    let (idle, empty) = {
      let subs = inner.subscribers.borrow();
      (!subs.distributing(), subs.records.is_empty())
    };

    if idle && empty {
      inner.record(&event);
      if let Event::Throw(err) = &event {
        report_error(err.clone());
      }
      if event.is_terminal() {
        errors.extend(inner.disposable.dispose().err());
      }
      return error::collect(errors);
    }

    if idle {
      // Mark the distribution as running first so disposing below keeps the
      // registry alive for this pass.
      inner.subscribers.borrow_mut().cursor = Some(0);
    }
    if event.is_terminal() {
      errors.extend(inner.disposable.dispose().err());
    }

    if idle {
      self.distribute(event);
    } else {
      inner.subscribers.borrow_mut().queue.push_back(event);
    }

    if !inner.disposable.active() {
      inner.release();
    }
    error::collect(errors)
  }
}

impl<T> DisposableLike for SubjectBase<T> {
  #[inline]
  fn disposable(&self) -> &Disposable { &self.0.disposable }
}
