//! Reporting of errors that have no synchronous destination.
//!
//! A throw delivered to an already-disposed sink, a failing sink handler, or a
//! teardown failing inside a drop guard has no caller left to return to. Such
//! errors are handed to the reporter installed on the current thread instead
//! of being dropped. The default reporter logs them through the `log` facade.
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use rxcore::prelude::*;
//!
//! let seen = Rc::new(RefCell::new(vec![]));
//! let c_seen = seen.clone();
//! let _guard = set_reporter(move |e: Error| c_seen.borrow_mut().push(e.to_string()));
//!
//! report_error(Error::msg("lost"));
//! assert_eq!(*seen.borrow(), vec!["lost"]);
//! ```

use std::{cell::RefCell, rc::Rc};

use crate::error::Error;

/// Destination for errors nobody is waiting on.
///
/// A reporter runs on the call stack of whatever reported, which may be in the
/// middle of disposing a node or distributing an event. It must not call back
/// into that component; defer such work to a scheduler instead.
pub trait ReportError {
  fn report(&self, error: Error);
}

impl<F: Fn(Error)> ReportError for F {
  #[inline]
  fn report(&self, error: Error) { self(error) }
}

/// Writes every reported error to the `error` log level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl ReportError for LogReporter {
  fn report(&self, error: Error) { log::error!("unhandled error: {error}"); }
}

thread_local! {
  static REPORTER: RefCell<Option<Rc<dyn ReportError>>> = const { RefCell::new(None) };
}

/// Hand `error` to the reporter of the current thread.
///
/// Delivery is synchronous: the reporter has run by the time this returns.
/// Nothing is deferred to a later turn, so the reporter must not re-enter the
/// component that reported.
pub fn report_error(error: Error) {
  let reporter = REPORTER.with(|r| r.borrow().clone());
  match reporter {
    Some(reporter) => reporter.report(error),
    None => LogReporter.report(error),
  }
}

/// Install `reporter` for the current thread. The previous reporter is
/// restored when the returned guard drops.
pub fn set_reporter(reporter: impl ReportError + 'static) -> ReporterGuard {
  let reporter: Rc<dyn ReportError> = Rc::new(reporter);
  let previous = REPORTER.with(|r| r.borrow_mut().replace(reporter));
  ReporterGuard { previous }
}

#[must_use]
pub struct ReporterGuard {
  previous: Option<Rc<dyn ReportError>>,
}

impl Drop for ReporterGuard {
  fn drop(&mut self) {
    let previous = self.previous.take();
    REPORTER.with(|r| *r.borrow_mut() = previous);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn guard_restores_previous_reporter() {
    let outer = Rc::new(RefCell::new(vec![]));
    let inner = Rc::new(RefCell::new(vec![]));

    let c_outer = outer.clone();
    let _outer_guard = set_reporter(move |e: Error| c_outer.borrow_mut().push(e.to_string()));
    {
      let c_inner = inner.clone();
      let _inner_guard = set_reporter(move |e: Error| c_inner.borrow_mut().push(e.to_string()));
      report_error(Error::msg("first"));
    }
    report_error(Error::msg("second"));

    assert_eq!(*inner.borrow(), vec!["first"]);
    assert_eq!(*outer.borrow(), vec!["second"]);
  }

  #[test]
  fn reporter_may_report_reentrantly() {
    let seen = Rc::new(RefCell::new(vec![]));
    let c_seen = seen.clone();
    let _guard = set_reporter(move |e: Error| {
      let first = c_seen.borrow().is_empty();
      c_seen.borrow_mut().push(e.to_string());
      if first {
        report_error(Error::msg("nested"));
      }
    });

    report_error(Error::msg("outer"));
    assert_eq!(*seen.borrow(), vec!["outer", "nested"]);
  }

  #[test]
  fn reporter_runs_before_report_returns() {
    let reported = Rc::new(RefCell::new(false));
    let c_reported = reported.clone();
    let _guard = set_reporter(move |_: Error| *c_reported.borrow_mut() = true);

    report_error(Error::msg("now"));
    assert!(*reported.borrow());
  }
}
