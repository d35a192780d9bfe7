//! Source: a producer invoked once per subscription.

use std::rc::Rc;

use crate::{
  disposable::DisposableLike,
  error::{Error, Fallible},
  event::Event,
  report::report_error,
  sink::Sink,
};

/// Anything a [`Sink`] can subscribe to.
///
/// Each call is an independent subscription. Cancelling it is done by
/// disposing the sink.
pub trait Source<T> {
  fn subscribe(&self, sink: &Sink<T>);
}

impl<T, S: Source<T> + ?Sized> Source<T> for Rc<S> {
  #[inline]
  fn subscribe(&self, sink: &Sink<T>) { (**self).subscribe(sink) }
}

/// A source backed by a producer function.
///
/// This struct is created by [`create`].
pub struct Create<T> {
  produce: Rc<dyn Fn(&Sink<T>) -> Result<(), Error>>,
}

impl<T> Clone for Create<T> {
  fn clone(&self) -> Self { Create { produce: self.produce.clone() } }
}

/// Build a [`Source`] from a producer function.
///
/// The producer is skipped for a sink that is already inactive. An `Err`
/// returned by the producer is forwarded as a `Throw` while the sink can
/// still accept it, and reported otherwise.
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use rxcore::prelude::*;
///
/// let numbers = create(|sink: &Sink<i32>| {
///   sink.push(1);
///   sink.push(2);
///   sink.end();
/// });
///
/// let got = Rc::new(RefCell::new(vec![]));
/// let c_got = got.clone();
/// numbers.subscribe(&Sink::on_push(move |v: i32| c_got.borrow_mut().push(v)));
/// assert_eq!(*got.borrow(), vec![1, 2]);
/// ```
pub fn create<T, F, R>(produce: F) -> Create<T>
where
  T: 'static,
  F: Fn(&Sink<T>) -> R + 'static,
  R: Fallible,
{
  Create { produce: Rc::new(move |sink: &Sink<T>| produce(sink).into_result()) }
}

impl<T> Source<T> for Create<T> {
  fn subscribe(&self, sink: &Sink<T>) {
    if !sink.active() {
      return;
    }
    if let Err(err) = (self.produce)(sink) {
      if sink.active() {
        sink.send(Event::Throw(err));
      } else {
        report_error(err);
      }
    }
  }
}
