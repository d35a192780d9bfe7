use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use super::{Subject, SubjectLike, Terminal};
use crate::{
  disposable::{Disposable, DisposableLike},
  error::{self, Error},
  event::Event,
  sink::Sink,
  source::Source,
};

struct FinalState<T> {
  last: RefCell<Option<T>>,
  ending: Cell<bool>,
}

/// A subject that only emits the last pushed value, right before `End`.
///
/// Pushes are remembered, not distributed. On `End` the last value (if any)
/// is pushed to every subscriber, followed by `End`; late subscribers receive
/// the same pair. `Throw` discards the value.
pub struct FinalValueSubject<T> {
  subject: Subject<T>,
  state: Rc<FinalState<T>>,
}

impl<T> Clone for FinalValueSubject<T> {
  fn clone(&self) -> Self { FinalValueSubject { subject: self.subject.clone(), state: self.state.clone() } }
}

impl<T: Clone + 'static> Default for FinalValueSubject<T> {
  fn default() -> Self { Self::new() }
}

impl<T: Clone + 'static> FinalValueSubject<T> {
  pub fn new() -> Self {
    let state = FinalState { last: RefCell::new(None), ending: Cell::new(false) };
    FinalValueSubject { subject: Subject::new(), state: Rc::new(state) }
  }

  pub fn subscriber_count(&self) -> usize { self.subject.subscriber_count() }

  fn last(&self) -> Option<T> { self.state.last.borrow().clone() }
}

impl<T: Clone + 'static> Source<T> for FinalValueSubject<T> {
  fn subscribe(&self, sink: &Sink<T>) {
    let ended = self.state.ending.get() || matches!(self.subject.terminal(), Some(Terminal::Ended));
    if ended && sink.active() {
      if let Some(value) = self.last() {
        sink.push(value);
      }
    }
    // While `End` is being distributed the sink is handed the remembered
    // terminal by the inner subject.
    self.subject.subscribe(sink);
  }
}

impl<T: Clone + 'static> SubjectLike<T> for FinalValueSubject<T> {
  fn send(&self, event: Event<T>) -> Result<(), Error> {
    let state = &self.state;
    if !self.subject.active() || state.ending.get() {
      return self.subject.send(event);
    }
    match event {
      Event::Push(value) => {
        *state.last.borrow_mut() = Some(value);
        Ok(())
      }
      Event::Throw(err) => {
        let discarded = state.last.borrow_mut().take();
        drop(discarded);
        self.subject.send(Event::Throw(err))
      }
      Event::End => {
        state.ending.set(true);
        let mut errors = vec![];
        if let Some(value) = self.last() {
          errors.extend(self.subject.send(Event::Push(value)).err());
        }
        errors.extend(self.subject.send(Event::End).err());
        state.ending.set(false);
        error::collect(errors)
      }
    }
  }
}

impl<T> DisposableLike for FinalValueSubject<T> {
  #[inline]
  fn disposable(&self) -> &Disposable { self.subject.disposable() }
}
