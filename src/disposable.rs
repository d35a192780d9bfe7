//! The resource-ownership graph.
//!
//! A [`Disposable`] owns an ordered list of children (other disposables or
//! bare teardown callbacks) and an optional primary teardown. Disposing a node
//! detaches it from its parents, runs the primary teardown and then tears down
//! every child in insertion order. Parents are kept as weak back-references so
//! the graph never forms an ownership cycle.

use std::{
  cell::RefCell,
  fmt::{Debug, Formatter},
  rc::{Rc, Weak},
};

use smallvec::SmallVec;

use crate::{
  error::{self, Error, Fallible},
  report::report_error,
};

/// A zero-argument cleanup callback.
pub type Teardown = Box<dyn FnOnce() -> Result<(), Error>>;

/// Handle returned by [`Disposable::add_teardown`], used to unlink the
/// callback again without running it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TeardownId(usize);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
  Active,
  Disposing,
  Disposed,
}

enum Child {
  Node(Disposable),
  Callback(TeardownId, Teardown),
}

struct Inner {
  state: State,
  teardown: Option<Teardown>,
  children: SmallVec<[Child; 2]>,
  parents: SmallVec<[Weak<RefCell<Inner>>; 1]>,
  next_id: usize,
}

impl Inner {
  fn new(teardown: Option<Teardown>) -> Self {
    Inner {
      state: State::Active,
      teardown,
      children: SmallVec::new(),
      parents: SmallVec::new(),
      next_id: 0,
    }
  }

  fn contains(&self, child: &Disposable) -> bool {
    self
      .children
      .iter()
      .any(|c| matches!(c, Child::Node(node) if node.ptr_eq(child)))
  }
}

/// A node in the resource-ownership forest.
///
/// Cloning a `Disposable` clones the handle, not the node: every clone
/// observes and controls the same lifetime.
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use rxcore::prelude::*;
///
/// let log = Rc::new(RefCell::new(vec![]));
/// let (l1, l2) = (log.clone(), log.clone());
///
/// let parent = Disposable::with_teardown(move || l1.borrow_mut().push("parent"));
/// let child = Disposable::with_teardown(move || l2.borrow_mut().push("child"));
/// parent.add(&child).unwrap();
///
/// parent.dispose().unwrap();
/// assert!(!child.active());
/// assert_eq!(*log.borrow(), vec!["parent", "child"]);
/// ```
#[derive(Clone)]
pub struct Disposable(Rc<RefCell<Inner>>);

impl Default for Disposable {
  fn default() -> Self { Self::new() }
}

impl Debug for Disposable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let inner = self.0.borrow();
    f.debug_struct("Disposable")
      .field("state", &inner.state)
      .field("children", &inner.children.len())
      .field("parents", &inner.parents.len())
      .finish()
  }
}

impl Disposable {
  /// A new active node without a primary teardown.
  pub fn new() -> Self { Disposable(Rc::new(RefCell::new(Inner::new(None)))) }

  /// A new active node that runs `teardown` first when disposed.
  pub fn with_teardown<F, R>(teardown: F) -> Self
  where
    F: FnOnce() -> R + 'static,
    R: Fallible,
  {
    let teardown: Teardown = Box::new(move || teardown().into_result());
    Disposable(Rc::new(RefCell::new(Inner::new(Some(teardown)))))
  }

  /// `false` as soon as disposal has started.
  #[inline]
  pub fn active(&self) -> bool { self.0.borrow().state == State::Active }

  #[inline]
  pub fn ptr_eq(&self, other: &Disposable) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  /// Link `child` so it is disposed together with `self`.
  ///
  /// If `self` is no longer active the child is disposed before this returns
  /// and its teardown errors are returned. Adding a node to itself, adding a
  /// child twice, or adding an inactive child does nothing.
  pub fn add(&self, child: &Disposable) -> Result<(), Error> {
    if self.ptr_eq(child) || !child.active() {
      return Ok(());
    }
    {
      let mut inner = self.0.borrow_mut();
      if inner.state == State::Active {
        if !inner.contains(child) {
          inner.children.push(Child::Node(child.clone()));
          child.0.borrow_mut().parents.push(Rc::downgrade(&self.0));
        }
        return Ok(());
      }
    }
    child.dispose()
  }

  /// Link a bare teardown callback.
  ///
  /// If `self` is no longer active the callback runs before this returns.
  pub fn add_teardown<F, R>(&self, teardown: F) -> Result<TeardownId, Error>
  where
    F: FnOnce() -> R + 'static,
    R: Fallible,
  {
    let teardown: Teardown = Box::new(move || teardown().into_result());
    let id = {
      let mut inner = self.0.borrow_mut();
      let id = TeardownId(inner.next_id);
      inner.next_id += 1;
      if inner.state == State::Active {
        inner.children.push(Child::Callback(id, teardown));
        return Ok(id);
      }
      id
    };
    teardown().map(|_| id)
  }

  /// Unlink `child` without disposing it. Returns whether it was linked.
  ///
  /// Does nothing once `self` has begun disposing.
  pub fn remove(&self, child: &Disposable) -> bool {
    let removed = {
      let mut inner = self.0.borrow_mut();
      if inner.state != State::Active {
        return false;
      }
      let pos = inner
        .children
        .iter()
        .position(|c| matches!(c, Child::Node(node) if node.ptr_eq(child)));
      pos.map(|pos| inner.children.remove(pos)).is_some()
    };
    if removed {
      child.unlink_parent(&self.0);
    }
    removed
  }

  /// Unlink a teardown callback without running it.
  pub fn remove_teardown(&self, id: TeardownId) -> bool {
    let mut inner = self.0.borrow_mut();
    if inner.state != State::Active {
      return false;
    }
    let pos = inner
      .children
      .iter()
      .position(|c| matches!(c, Child::Callback(cid, _) if *cid == id));
    // Dropped outside of the borrow in case the closure owns other handles.
    let removed = pos.map(|pos| inner.children.remove(pos));
    drop(inner);
    removed.is_some()
  }

  /// Tear the node down. Calling this more than once does nothing.
  ///
  /// Every teardown runs even when an earlier one fails; all failures are
  /// returned together as one flattened [`Error::Aggregate`].
  pub fn dispose(&self) -> Result<(), Error> {
    let (teardown, children, parents) = {
      let mut inner = self.0.borrow_mut();
      if inner.state != State::Active {
        return Ok(());
      }
      inner.state = State::Disposing;
      (
        inner.teardown.take(),
        std::mem::take(&mut inner.children),
        std::mem::take(&mut inner.parents),
      )
    };

    for parent in parents.iter().filter_map(Weak::upgrade) {
      Disposable(parent).unlink_child(self);
    }

    let mut errors = vec![];
    if let Some(teardown) = teardown {
      if let Err(e) = teardown() {
        errors.push(e);
      }
    }
    for child in children {
      let result = match child {
        Child::Node(node) => {
          node.unlink_parent(&self.0);
          node.dispose()
        }
        Child::Callback(_, teardown) => teardown(),
      };
      if let Err(e) = result {
        errors.push(e);
      }
    }

    self.0.borrow_mut().state = State::Disposed;
    if !errors.is_empty() {
      log::debug!("disposal finished with {} teardown error(s)", errors.len());
    }
    error::collect(errors)
  }

  /// Dispose automatically when the returned guard goes out of scope.
  ///
  /// **Attention:** binding the guard to `_` drops it, and disposes the node,
  /// immediately.
  pub fn dispose_on_drop(self) -> DisposeGuard { DisposeGuard(Some(self)) }

  fn unlink_child(&self, child: &Disposable) {
    let mut inner = self.0.borrow_mut();
    if inner.state == State::Active {
      inner
        .children
        .retain(|c| !matches!(c, Child::Node(node) if node.ptr_eq(child)));
    }
  }

  fn unlink_parent(&self, parent: &Rc<RefCell<Inner>>) {
    self
      .0
      .borrow_mut()
      .parents
      .retain(|p| !std::ptr::eq(p.as_ptr(), Rc::as_ptr(parent)));
  }
}

/// An RAII guard that disposes its node when dropped.
///
/// Teardown errors have no caller to return to, so they are reported through
/// [`report_error`].
#[derive(Debug)]
#[must_use]
pub struct DisposeGuard(Option<Disposable>);

impl DisposeGuard {
  pub fn disposable(&self) -> Option<&Disposable> { self.0.as_ref() }

  /// Give up the guard without disposing.
  pub fn into_inner(mut self) -> Option<Disposable> { self.0.take() }
}

impl Drop for DisposeGuard {
  fn drop(&mut self) {
    if let Some(Err(e)) = self.0.take().map(|d| d.dispose()) {
      report_error(e);
    }
  }
}

/// The capability set shared by everything that owns a lifetime: sinks,
/// subjects and plain disposables.
pub trait DisposableLike {
  fn disposable(&self) -> &Disposable;

  #[inline]
  fn active(&self) -> bool { self.disposable().active() }

  #[inline]
  fn dispose(&self) -> Result<(), Error> { self.disposable().dispose() }

  #[inline]
  fn add(&self, child: &Disposable) -> Result<(), Error> { self.disposable().add(child) }

  #[inline]
  fn add_teardown<F, R>(&self, teardown: F) -> Result<TeardownId, Error>
  where
    F: FnOnce() -> R + 'static,
    R: Fallible,
    Self: Sized,
  {
    self.disposable().add_teardown(teardown)
  }

  #[inline]
  fn remove(&self, child: &Disposable) -> bool { self.disposable().remove(child) }
}

impl DisposableLike for Disposable {
  #[inline]
  fn disposable(&self) -> &Disposable { self }
}
