use std::{cell::Cell, collections::VecDeque, rc::Rc};

use crate::{event::Event, sink::Sink};

/// One registered sink.
pub(crate) struct Record<T> {
  pub(crate) sink: Sink<T>,
  /// Unsubscribed while it was the loop's cursor element; the loop evicts it.
  pub(crate) removed: Cell<bool>,
  /// Still waiting in the staging list.
  pub(crate) pending_add: Cell<bool>,
}

impl<T> Record<T> {
  pub(crate) fn new(sink: Sink<T>, pending_add: bool) -> Rc<Self> {
    Rc::new(Record { sink, removed: Cell::new(false), pending_add: Cell::new(pending_add) })
  }
}

/// Registry of a subject while it is active.
///
/// `staged` and `queue` are only non-empty while a distribution runs, which is
/// exactly when `cursor` is `Some`.
pub(crate) struct Subscribers<T> {
  pub(crate) records: Vec<Rc<Record<T>>>,
  pub(crate) staged: Vec<Rc<Record<T>>>,
  pub(crate) queue: VecDeque<Event<T>>,
  /// Index of the record currently being delivered to.
  pub(crate) cursor: Option<usize>,
}

impl<T> Default for Subscribers<T> {
  fn default() -> Self {
    Subscribers { records: Vec::new(), staged: Vec::new(), queue: VecDeque::new(), cursor: None }
  }
}

impl<T> Subscribers<T> {
  #[inline]
  pub(crate) fn distributing(&self) -> bool { self.cursor.is_some() }

  /// Register a sink, staging it when a distribution is in progress.
  pub(crate) fn insert(&mut self, sink: Sink<T>) -> Rc<Record<T>> {
    let staged = self.distributing();
    let record = Record::new(sink, staged);
    if staged {
      self.staged.push(record.clone());
    } else {
      self.records.push(record.clone());
    }
    record
  }

  /// Unregister `record`, keeping the loop cursor pointing at the same
  /// element so the loop neither skips nor revisits anyone.
  pub(crate) fn remove(&mut self, record: &Rc<Record<T>>) {
    if record.pending_add.get() {
      self.staged.retain(|r| !Rc::ptr_eq(r, record));
      record.pending_add.set(false);
      return;
    }
    let Some(pos) = self.records.iter().position(|r| Rc::ptr_eq(r, record)) else {
      return;
    };
    match self.cursor {
      Some(cursor) if cursor == pos => record.removed.set(true),
      Some(cursor) => {
        self.records.remove(pos);
        if pos < cursor {
          self.cursor = Some(cursor - 1);
        }
      }
      None => {
        self.records.remove(pos);
      }
    }
  }

  /// The record under the cursor, if the pass is not finished.
  pub(crate) fn current(&self) -> Option<Rc<Record<T>>> {
    self.cursor.and_then(|c| self.records.get(c).cloned())
  }

  /// Drop the record under the cursor; the cursor now points at its successor.
  pub(crate) fn evict_current(&mut self) {
    if let Some(c) = self.cursor {
      if c < self.records.len() {
        self.records.remove(c);
      }
    }
  }

  pub(crate) fn advance(&mut self) {
    if let Some(c) = self.cursor.as_mut() {
      *c += 1;
    }
  }

  /// Move sinks staged during the last pass into the registry.
  pub(crate) fn merge_staged(&mut self) {
    for record in self.staged.drain(..) {
      record.pending_add.set(false);
      self.records.push(record);
    }
  }

  pub(crate) fn len(&self) -> usize { self.records.len() + self.staged.len() }
}
