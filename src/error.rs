//! Error type shared by every component of the core.
//!
//! A callback "throws" by returning `Err`. Errors are cheap to clone because a
//! single `Throw` event may be fanned out to many sinks.

use std::{fmt::Display, sync::Arc};

/// The error carried by `Event::Throw` and returned from disposal,
/// distribution and scheduling.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
  /// A plain message.
  #[error("{0}")]
  Message(Arc<str>),

  /// Any other error value.
  #[error(transparent)]
  Custom(Arc<dyn std::error::Error + Send + Sync + 'static>),

  /// Several errors collected during one disposal or distribution pass.
  ///
  /// The list is always flat: an aggregate never directly contains another
  /// aggregate.
  #[error("{} error(s) occurred: {}", .0.len(), join(.0))]
  Aggregate(Vec<Error>),
}

fn join(errors: &[Error]) -> String {
  errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl Error {
  pub fn msg(message: impl Display) -> Self { Error::Message(message.to_string().into()) }

  pub fn new<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Custom(Arc::new(error))
  }

  /// Wrap collected errors into one aggregate, flattening nested aggregates
  /// one level. Returns `None` when nothing was collected.
  pub fn aggregate(errors: impl IntoIterator<Item = Error>) -> Option<Error> {
    let mut flat = Vec::new();
    for error in errors {
      match error {
        Error::Aggregate(inner) => flat.extend(inner),
        other => flat.push(other),
      }
    }
    if flat.is_empty() { None } else { Some(Error::Aggregate(flat)) }
  }

  /// The members of an aggregate, or the error itself for a leaf error.
  pub fn errors(&self) -> &[Error] {
    match self {
      Error::Aggregate(inner) => inner,
      leaf => std::slice::from_ref(leaf),
    }
  }

  pub fn is_aggregate(&self) -> bool { matches!(self, Error::Aggregate(_)) }
}

impl From<&str> for Error {
  fn from(message: &str) -> Self { Error::msg(message) }
}

impl From<String> for Error {
  fn from(message: String) -> Self { Error::Message(message.into()) }
}

/// Turns `Result<(), Error>` collections into a single result.
pub(crate) fn collect(errors: Vec<Error>) -> Result<(), Error> {
  match Error::aggregate(errors) {
    Some(error) => Err(error),
    None => Ok(()),
  }
}

/// Output of a user callback.
///
/// Callbacks may return `()` when they cannot fail, or a `Result` whose error
/// converts into [`Error`].
pub trait Fallible {
  fn into_result(self) -> Result<(), Error>;
}

impl Fallible for () {
  #[inline]
  fn into_result(self) -> Result<(), Error> { Ok(()) }
}

impl<E: Into<Error>> Fallible for Result<(), E> {
  #[inline]
  fn into_result(self) -> Result<(), Error> { self.map_err(Into::into) }
}
