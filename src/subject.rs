//! Subjects: values that are both a sink and a source.
//!
//! [`SubjectBase`] is the distribution engine; the other subjects layer a
//! replay policy for late subscribers on top of it:
//!
//! | Type | Late subscriber receives |
//! |------|--------------------------|
//! | [`Subject`] | the terminal event, once there is one |
//! | [`CurrentValueSubject`] | the current value, then live events |
//! | [`ReplaySubject`] | the buffered pushes (bounded by count and/or age), then live events |
//! | [`FinalValueSubject`] | only the last push, together with `End` |

use crate::{
  disposable::DisposableLike,
  error::Error,
  event::Event,
  sink::Sink,
  source::Source,
};

mod current_value_subject;
mod final_value_subject;
mod publish_subject;
mod replay_subject;
mod subject_base;
mod subscribers;

pub use current_value_subject::CurrentValueSubject;
pub use final_value_subject::FinalValueSubject;
pub use publish_subject::Subject;
pub use replay_subject::{ReplayBuilder, ReplaySubject};
pub use subject_base::SubjectBase;

/// The dual calling convention shared by every subject: subscribing a sink
/// through [`Source::subscribe`], distributing an event through
/// [`SubjectLike::send`].
pub trait SubjectLike<T>: Source<T> + DisposableLike {
  /// Distribute `event` to every registered sink.
  ///
  /// Returns the errors collected during the pass (for example teardown
  /// failures while the subject disposes on a terminal event).
  fn send(&self, event: Event<T>) -> Result<(), Error>;

  #[inline]
  fn push(&self, value: T) -> Result<(), Error> { self.send(Event::Push(value)) }

  #[inline]
  fn throw(&self, err: impl Into<Error>) -> Result<(), Error>
  where
    Self: Sized,
  {
    self.send(Event::Throw(err.into()))
  }

  #[inline]
  fn end(&self) -> Result<(), Error> { self.send(Event::End) }

  /// A sink forwarding every event into this subject, for subscribing the
  /// subject to another source. Errors from a pass are reported.
  fn as_sink(&self) -> Sink<T>
  where
    Self: Clone + Sized + 'static,
    T: 'static,
  {
    let subject = self.clone();
    Sink::new(move |event| subject.send(event))
  }
}

/// A remembered terminal event.
#[derive(Clone, Debug)]
pub(crate) enum Terminal {
  Threw(Error),
  Ended,
}

impl Terminal {
  pub(crate) fn of<T>(event: &Event<T>) -> Option<Terminal> {
    match event {
      Event::Push(_) => None,
      Event::Throw(err) => Some(Terminal::Threw(err.clone())),
      Event::End => Some(Terminal::Ended),
    }
  }

  pub(crate) fn into_event<T>(self) -> Event<T> {
    match self {
      Terminal::Threw(err) => Event::Throw(err),
      Terminal::Ended => Event::End,
    }
  }
}
