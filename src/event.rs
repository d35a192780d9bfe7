use crate::error::Error;

/// The three shapes an event can take.
///
/// Every sink sees `Push*` followed by at most one terminal event, `Throw` or
/// `End`.
#[derive(Clone, Debug)]
pub enum Event<T> {
  Push(T),
  Throw(Error),
  End,
}

impl<T> Event<T> {
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Event::Push(_)) }

  #[inline]
  pub fn is_push(&self) -> bool { matches!(self, Event::Push(_)) }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Event<U> {
    match self {
      Event::Push(value) => Event::Push(f(value)),
      Event::Throw(err) => Event::Throw(err),
      Event::End => Event::End,
    }
  }

  pub fn as_ref(&self) -> Event<&T> {
    match self {
      Event::Push(value) => Event::Push(value),
      Event::Throw(err) => Event::Throw(err.clone()),
      Event::End => Event::End,
    }
  }
}
