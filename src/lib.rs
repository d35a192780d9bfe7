//! # rxcore: a push-based reactive core
//!
//! The lifetime, delivery and scheduling machinery a stream library is built
//! on, without the operators.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use rxcore::prelude::*;
//!
//! let subject = Subject::new();
//! let seen = Rc::new(RefCell::new(vec![]));
//!
//! let c_seen = seen.clone();
//! let sink = Sink::on_push(move |v: i32| c_seen.borrow_mut().push(v));
//! subject.subscribe(&sink);
//!
//! subject.push(1).unwrap();
//! sink.dispose().unwrap();
//! subject.push(2).unwrap();
//! assert_eq!(*seen.borrow(), vec![1]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Disposable`] | A node in a tree of cleanup work, disposed at most once |
//! | [`Sink`] | Consumes `Push`, `Throw` and `End` events, and owns a [`Disposable`] |
//! | [`Source`] | Produces events into a sink, once per subscription |
//! | [`Subject`] | Both at once: fans every event out to its subscribers |
//! | [`ScheduleQueued`] | Serializes callbacks onto a one-shot scheduling primitive |
//!
//! Everything here is single threaded: handles are `Rc` based and callbacks
//! may reenter the object that invoked them.
//!
//! ## Errors
//!
//! A callback fails by returning `Err`. Errors that still have a caller are
//! returned to it; the rest go to the reporter installed with
//! [`set_reporter`], which by default logs them through the `log` facade.
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): [`LocalPoolScheduler`], running
//!   callbacks on a `futures` local executor.
//!
//! [`Disposable`]: disposable::Disposable
//! [`Sink`]: sink::Sink
//! [`Source`]: source::Source
//! [`Subject`]: subject::Subject
//! [`ScheduleQueued`]: scheduler::ScheduleQueued
//! [`set_reporter`]: report::set_reporter
//! [`LocalPoolScheduler`]: scheduler::LocalPoolScheduler

pub mod disposable;
pub mod error;
pub mod event;
pub mod prelude;
pub mod report;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod subject;

pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
