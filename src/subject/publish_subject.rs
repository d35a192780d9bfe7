use std::{cell::RefCell, rc::Rc};

use super::{SubjectBase, SubjectLike, Terminal};
use crate::{
  disposable::{Disposable, DisposableLike},
  error::Error,
  event::Event,
  sink::Sink,
  source::Source,
};

/// A multicast hub that remembers how it terminated.
///
/// A sink subscribing after the subject ended is handed the remembered
/// terminal event immediately and is not registered.
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use rxcore::prelude::*;
///
/// let subject = Subject::new();
/// let got = Rc::new(RefCell::new(vec![]));
/// let c_got = got.clone();
/// subject.subscribe(&Sink::on_push(move |v: i32| c_got.borrow_mut().push(v)));
///
/// subject.push(1).unwrap();
/// subject.push(2).unwrap();
/// assert_eq!(*got.borrow(), vec![1, 2]);
/// ```
pub struct Subject<T> {
  base: SubjectBase<T>,
  terminal: Rc<RefCell<Option<Terminal>>>,
}

impl<T> Clone for Subject<T> {
  fn clone(&self) -> Self { Subject { base: self.base.clone(), terminal: self.terminal.clone() } }
}

impl<T: Clone + 'static> Default for Subject<T> {
  fn default() -> Self { Self::new() }
}

impl<T: Clone + 'static> Subject<T> {
  pub fn new() -> Self { Subject { base: SubjectBase::new(), terminal: Rc::default() } }

  pub fn subscriber_count(&self) -> usize { self.base.subscriber_count() }

  /// See [`SubjectBase::with_recorder`].
  pub(crate) fn with_recorder(recorder: impl Fn(&Event<T>) + 'static) -> Self {
    Subject { base: SubjectBase::with_recorder(recorder), terminal: Rc::default() }
  }

  /// Whether the subject ended, and how.
  pub(crate) fn terminal(&self) -> Option<Terminal> { self.terminal.borrow().clone() }
}

impl<T: Clone + 'static> Source<T> for Subject<T> {
  fn subscribe(&self, sink: &Sink<T>) {
    if self.base.active() {
      self.base.subscribe(sink);
    } else if let Some(terminal) = self.terminal() {
      sink.send(terminal.into_event());
    }
  }
}

impl<T: Clone + 'static> SubjectLike<T> for Subject<T> {
  fn send(&self, event: Event<T>) -> Result<(), Error> {
    if self.base.active() {
      if let Some(terminal) = Terminal::of(&event) {
        *self.terminal.borrow_mut() = Some(terminal);
      }
    }
    self.base.send(event)
  }
}

impl<T> DisposableLike for Subject<T> {
  #[inline]
  fn disposable(&self) -> &Disposable { self.base.disposable() }
}
