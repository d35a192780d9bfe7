//! Sink: a disposable, callable event consumer.
//!
//! A sink wraps a user handler and enforces the event contract around it:
//!
//! - A terminal event disposes the sink *before* the handler runs, so any code
//!   reached from the handler already sees the sink as inactive.
//! - Once disposed, further pushes are ignored. A `Throw` arriving after that
//!   point is reported instead of dropped.
//! - A handler returning `Err` never propagates back to the producer: the
//!   error is reported and the sink disposed.

use std::rc::Rc;

use crate::{
  disposable::{Disposable, DisposableLike},
  error::{Error, Fallible},
  event::Event,
  report::report_error,
};

type Handler<T> = dyn Fn(Event<T>) -> Result<(), Error>;

struct SinkInner<T> {
  disposable: Disposable,
  handler: Box<Handler<T>>,
}

/// A cheaply cloneable handle to an event consumer.
///
/// The handler is an `Fn` rather than `FnMut` because delivery may legally
/// reenter the same sink; handlers keep their state in `Cell`/`RefCell`.
pub struct Sink<T>(Rc<SinkInner<T>>);

impl<T> Clone for Sink<T> {
  fn clone(&self) -> Self { Sink(self.0.clone()) }
}

impl<T> std::fmt::Debug for Sink<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Sink")
      .field("disposable", &self.0.disposable)
      .finish()
  }
}

impl<T: 'static> Sink<T> {
  pub fn new<F, R>(handler: F) -> Self
  where
    F: Fn(Event<T>) -> R + 'static,
    R: Fallible,
  {
    Self::with_disposable(Disposable::new(), handler)
  }

  /// Build a sink whose lifetime is the given node.
  pub fn with_disposable<F, R>(disposable: Disposable, handler: F) -> Self
  where
    F: Fn(Event<T>) -> R + 'static,
    R: Fallible,
  {
    let handler: Box<Handler<T>> = Box::new(move |event| handler(event).into_result());
    Sink(Rc::new(SinkInner { disposable, handler }))
  }

  /// A sink that only cares about pushed values.
  pub fn on_push<F, R>(f: F) -> Self
  where
    F: Fn(T) -> R + 'static,
    R: Fallible,
  {
    Self::new(move |event| match event {
      Event::Push(value) => f(value).into_result(),
      Event::Throw(err) => Err(err),
      Event::End => Ok(()),
    })
  }
}

impl<T> Sink<T> {
  /// Deliver one event.
  pub fn send(&self, event: Event<T>) {
    let disposable = &self.0.disposable;
    if !disposable.active() {
      if let Event::Throw(err) = event {
        report_error(err);
      }
      return;
    }

    if event.is_terminal() {
      if let Err(err) = disposable.dispose() {
        report_error(err);
      }
    }

    if let Err(err) = (self.0.handler)(event) {
      report_error(err);
      if let Err(err) = disposable.dispose() {
        report_error(err);
      }
    }
  }

  #[inline]
  pub fn push(&self, value: T) { self.send(Event::Push(value)) }

  #[inline]
  pub fn throw(&self, err: impl Into<Error>) { self.send(Event::Throw(err.into())) }

  #[inline]
  pub fn end(&self) { self.send(Event::End) }

  #[inline]
  pub fn ptr_eq(&self, other: &Sink<T>) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl<T> DisposableLike for Sink<T> {
  #[inline]
  fn disposable(&self) -> &Disposable { &self.0.disposable }
}
