use std::{cell::RefCell, rc::Rc};

use super::{Subject, SubjectLike};
use crate::{
  disposable::{Disposable, DisposableLike},
  error::Error,
  event::Event,
  sink::Sink,
  source::Source,
};

/// A subject that always has a current value.
///
/// Every subscriber is first handed the current value, then the live events.
/// After the subject ended, a late subscriber only receives the terminal
/// event, like a plain [`Subject`].
///
/// A push becomes the current value once the subject starts handing it out.
/// A push sent from a handler waits behind the event being distributed, and
/// so does its turn as current value.
pub struct CurrentValueSubject<T> {
  subject: Subject<T>,
  value: Rc<RefCell<T>>,
}

impl<T> Clone for CurrentValueSubject<T> {
  fn clone(&self) -> Self {
    CurrentValueSubject { subject: self.subject.clone(), value: self.value.clone() }
  }
}

impl<T: Clone + Default + 'static> Default for CurrentValueSubject<T> {
  fn default() -> Self { Self::new(T::default()) }
}

impl<T: Clone + 'static> CurrentValueSubject<T> {
  #[inline]
  pub fn new(value: T) -> Self {
    let value = Rc::new(RefCell::new(value));
    let c_value = value.clone();
    let subject = Subject::with_recorder(move |event: &Event<T>| {
      if let Event::Push(v) = event {
        *c_value.borrow_mut() = v.clone();
      }
    });
    CurrentValueSubject { subject, value }
  }

  /// The last value pushed, or the initial one.
  #[inline]
  pub fn value(&self) -> T { self.value.borrow().clone() }

  pub fn subscriber_count(&self) -> usize { self.subject.subscriber_count() }
}

impl<T: Clone + 'static> Source<T> for CurrentValueSubject<T> {
  fn subscribe(&self, sink: &Sink<T>) {
    if self.subject.active() && sink.active() {
      let current = self.value.borrow().clone();
      sink.push(current);
    }
    self.subject.subscribe(sink);
  }
}

impl<T: Clone + 'static> SubjectLike<T> for CurrentValueSubject<T> {
  #[inline]
  fn send(&self, event: Event<T>) -> Result<(), Error> { self.subject.send(event) }
}

impl<T> DisposableLike for CurrentValueSubject<T> {
  #[inline]
  fn disposable(&self) -> &Disposable { self.subject.disposable() }
}
