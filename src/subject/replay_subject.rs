use std::{
  cell::RefCell,
  collections::VecDeque,
  marker::PhantomData,
  rc::Rc,
  time::{Duration, Instant},
};

use super::{Subject, SubjectLike};
use crate::{
  disposable::{Disposable, DisposableLike},
  error::Error,
  event::Event,
  scheduler::{Clock, SystemClock},
  sink::Sink,
  source::Source,
};

struct ReplayBuffer<T> {
  values: VecDeque<T>,
  /// Expiry instant of each value, parallel to `values`. Empty without a
  /// window. Non-decreasing, so expiry is a binary search.
  deadlines: VecDeque<Instant>,
  /// Values before this index are expired but not yet dropped.
  first_valid: usize,
  /// Number of replays in progress. Compaction waits until it is zero.
  replaying: usize,
}

impl<T> Default for ReplayBuffer<T> {
  fn default() -> Self {
    ReplayBuffer {
      values: VecDeque::new(),
      deadlines: VecDeque::new(),
      first_valid: 0,
      replaying: 0,
    }
  }
}

impl<T> ReplayBuffer<T> {
  fn trim(&mut self, count: Option<usize>, windowed: bool, now: Instant) {
    let mut start = self.first_valid;
    if let Some(count) = count {
      start = start.max(self.values.len().saturating_sub(count));
    }
    if windowed {
      start = start.max(self.deadlines.partition_point(|deadline| *deadline <= now));
    }
    self.first_valid = start;
    self.compact();
  }

  fn compact(&mut self) {
    if self.replaying > 0 || self.first_valid == 0 {
      return;
    }
    let start = self.first_valid;
    self.values.drain(..start);
    self.deadlines.drain(..start.min(self.deadlines.len()));
    self.first_valid = 0;
  }
}

struct ReplayState<T> {
  buffer: RefCell<ReplayBuffer<T>>,
  count: Option<usize>,
  window: Option<Duration>,
  clock: Rc<dyn Clock>,
}

impl<T: Clone> ReplayState<T> {
  fn trim(&self) {
    let now = self.clock.now();
    self.buffer.borrow_mut().trim(self.count, self.window.is_some(), now);
  }

  fn record(&self, value: &T) {
    let now = self.clock.now();
    {
      let mut buffer = self.buffer.borrow_mut();
      buffer.values.push_back(value.clone());
      if let Some(window) = self.window {
        buffer.deadlines.push_back(now + window);
      }
    }
    self.trim();
  }
}

/// A subject that buffers pushed values and replays them, oldest first, to
/// every new subscriber before the live events.
///
/// The buffer is bounded by a count, an age, both or neither. Buffered values
/// survive `End` and `Throw`: a subscriber arriving after either receives the
/// buffer followed by the terminal event. A push is buffered once the subject
/// starts handing it out, so a push still queued behind the event being
/// distributed reaches a new subscriber live, not by replay.
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use rxcore::prelude::*;
///
/// let subject = ReplaySubject::new(2);
/// subject.push(1).unwrap();
/// subject.push(2).unwrap();
/// subject.push(3).unwrap();
///
/// let got = Rc::new(RefCell::new(vec![]));
/// let c_got = got.clone();
/// subject.subscribe(&Sink::on_push(move |v: i32| c_got.borrow_mut().push(v)));
/// assert_eq!(*got.borrow(), vec![2, 3]);
/// ```
pub struct ReplaySubject<T> {
  subject: Subject<T>,
  state: Rc<ReplayState<T>>,
}

impl<T> Clone for ReplaySubject<T> {
  fn clone(&self) -> Self { ReplaySubject { subject: self.subject.clone(), state: self.state.clone() } }
}

/// Configures a [`ReplaySubject`].
pub struct ReplayBuilder<T> {
  count: Option<usize>,
  window: Option<Duration>,
  clock: Rc<dyn Clock>,
  _item: PhantomData<T>,
}

impl<T> Default for ReplayBuilder<T> {
  fn default() -> Self {
    ReplayBuilder { count: None, window: None, clock: Rc::new(SystemClock), _item: PhantomData }
  }
}

impl<T: Clone + 'static> ReplayBuilder<T> {
  /// Keep at most `count` values.
  pub fn count(mut self, count: usize) -> Self {
    self.count = Some(count);
    self
  }

  /// Drop values older than `window`.
  pub fn window(mut self, window: Duration) -> Self {
    self.window = Some(window);
    self
  }

  /// The time source used to age values. Defaults to [`SystemClock`].
  pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Rc::new(clock);
    self
  }

  pub fn build(self) -> ReplaySubject<T> {
    let state = Rc::new(ReplayState {
      buffer: RefCell::new(ReplayBuffer::default()),
      count: self.count,
      window: self.window,
      clock: self.clock,
    });
    let c_state = state.clone();
    let subject = Subject::with_recorder(move |event: &Event<T>| {
      if let Event::Push(value) = event {
        c_state.record(value);
      }
    });
    ReplaySubject { subject, state }
  }
}

impl<T: Clone + 'static> Default for ReplaySubject<T> {
  fn default() -> Self { Self::unbounded() }
}

impl<T: Clone + 'static> ReplaySubject<T> {
  /// Replay at most the last `count` values.
  #[inline]
  pub fn new(count: usize) -> Self { Self::builder().count(count).build() }

  /// Replay every value ever pushed.
  #[inline]
  pub fn unbounded() -> Self { Self::builder().build() }

  #[inline]
  pub fn builder() -> ReplayBuilder<T> { ReplayBuilder::default() }

  /// The values a subscriber arriving now would be replayed.
  pub fn buffered(&self) -> Vec<T> {
    self.state.trim();
    let buffer = self.state.buffer.borrow();
    buffer.values.range(buffer.first_valid..).cloned().collect()
  }

  pub fn subscriber_count(&self) -> usize { self.subject.subscriber_count() }

  fn replay(&self, sink: &Sink<T>) {
    let state = &self.state;
    state.trim();
    state.buffer.borrow_mut().replaying += 1;

    // The bound is re-read each step: values pushed from inside the sink are
    // delivered by this loop, since the sink is not registered yet.
    let mut idx = 0;
    while sink.active() {
      let value = {
        let buffer = state.buffer.borrow();
        idx = idx.max(buffer.first_valid);
        buffer.values.get(idx).cloned()
      };
      let Some(value) = value else { break };
      sink.push(value);
      idx += 1;
    }

    let mut buffer = state.buffer.borrow_mut();
    buffer.replaying -= 1;
    buffer.compact();
  }
}

impl<T: Clone + 'static> Source<T> for ReplaySubject<T> {
  fn subscribe(&self, sink: &Sink<T>) {
    if !sink.active() {
      return;
    }
    // A plain disposal leaves nothing to replay.
    if self.subject.active() || self.subject.terminal().is_some() {
      self.replay(sink);
    }
    self.subject.subscribe(sink);
  }
}

impl<T: Clone + 'static> SubjectLike<T> for ReplaySubject<T> {
  #[inline]
  fn send(&self, event: Event<T>) -> Result<(), Error> { self.subject.send(event) }
}

impl<T> DisposableLike for ReplaySubject<T> {
  #[inline]
  fn disposable(&self) -> &Disposable { self.subject.disposable() }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;

  fn collect(subject: &ReplaySubject<i32>) -> (Sink<i32>, Rc<RefCell<Vec<String>>>) {
    let log = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    let sink = Sink::new(move |e: Event<i32>| {
      c_log.borrow_mut().push(match e {
        Event::Push(v) => v.to_string(),
        Event::Throw(err) => format!("throw {err}"),
        Event::End => "end".into(),
      })
    });
    subject.subscribe(&sink);
    (sink, log)
  }

  fn manual_clock() -> (Rc<Cell<Instant>>, impl Clock + 'static) {
    let now = Rc::new(Cell::new(Instant::now()));
    let c_now = now.clone();
    (now, move || c_now.get())
  }

  #[test]
  fn count_bound() {
    let subject = ReplaySubject::new(2);
    for v in 1..=3 {
      subject.push(v).unwrap();
    }
    let (_, log) = collect(&subject);
    assert_eq!(*log.borrow(), vec!["2", "3"]);

    subject.push(4).unwrap();
    assert_eq!(*log.borrow(), vec!["2", "3", "4"]);
    assert_eq!(subject.buffered(), vec![3, 4]);
  }

  #[test]
  fn unbounded_keeps_everything() {
    let subject = ReplaySubject::unbounded();
    for v in 0..5 {
      subject.push(v).unwrap();
    }
    assert_eq!(subject.buffered(), vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn window_bound() {
    let (now, clock) = manual_clock();
    let subject = ReplaySubject::builder().window(Duration::from_secs(10)).clock(clock).build();

    subject.push(1).unwrap();
    now.set(now.get() + Duration::from_secs(6));
    subject.push(2).unwrap();
    now.set(now.get() + Duration::from_secs(6));

    let (_, log) = collect(&subject);
    assert_eq!(*log.borrow(), vec!["2"]);

    now.set(now.get() + Duration::from_secs(10));
    assert!(subject.buffered().is_empty());
  }

  #[test]
  fn count_and_window_together() {
    let (now, clock) = manual_clock();
    let subject =
      ReplaySubject::builder().count(2).window(Duration::from_secs(5)).clock(clock).build();
    for v in 1..=3 {
      subject.push(v).unwrap();
    }
    assert_eq!(subject.buffered(), vec![2, 3]);

    now.set(now.get() + Duration::from_secs(5));
    assert!(subject.buffered().is_empty());
  }

  #[test]
  fn replays_buffer_then_end_after_completion() {
    let subject = ReplaySubject::unbounded();
    subject.push(1).unwrap();
    subject.push(2).unwrap();
    subject.end().unwrap();

    let (sink, log) = collect(&subject);
    assert_eq!(*log.borrow(), vec!["1", "2", "end"]);
    assert!(!sink.active());
  }

  #[test]
  fn plain_dispose_replays_nothing() {
    let subject = ReplaySubject::unbounded();
    subject.push(1).unwrap();
    subject.dispose().unwrap();

    let (sink, log) = collect(&subject);
    assert!(log.borrow().is_empty());
    assert!(sink.active());
  }

  #[test]
  fn sink_disposing_itself_stops_replay() {
    let subject = ReplaySubject::unbounded();
    for v in 0..5 {
      subject.push(v).unwrap();
    }
    let got = Rc::new(RefCell::new(vec![]));
    let slot: Rc<RefCell<Option<Sink<i32>>>> = Rc::default();
    let (c_got, c_slot) = (got.clone(), slot.clone());
    let sink = Sink::on_push(move |v: i32| {
      c_got.borrow_mut().push(v);
      if v == 1 {
        if let Some(me) = c_slot.borrow_mut().take() {
          me.dispose().unwrap();
        }
      }
    });
    *slot.borrow_mut() = Some(sink.clone());
    subject.subscribe(&sink);

    assert_eq!(*got.borrow(), vec![0, 1]);
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[test]
  fn push_during_replay_is_delivered_once() {
    let subject = ReplaySubject::new(2);
    subject.push(1).unwrap();
    subject.push(2).unwrap();

    let got = Rc::new(RefCell::new(vec![]));
    let (c_got, c_subject) = (got.clone(), subject.clone());
    subject.subscribe(&Sink::on_push(move |v: i32| {
      c_got.borrow_mut().push(v);
      if v == 1 {
        c_subject.push(3).unwrap();
      }
    }));

    assert_eq!(*got.borrow(), vec![1, 2, 3]);
    assert_eq!(subject.buffered(), vec![2, 3]);

    subject.push(4).unwrap();
    assert_eq!(*got.borrow(), vec![1, 2, 3, 4]);
  }

  #[test]
  fn subscriber_joining_before_queued_push_gets_it_once() {
    let subject = ReplaySubject::unbounded();
    let late = Rc::new(RefCell::new(vec![]));
    let (c_subject, c_late) = (subject.clone(), late.clone());
    subject.subscribe(&Sink::on_push(move |v: i32| {
      if v == 1 {
        c_subject.push(2).unwrap();
        let late = c_late.clone();
        c_subject.subscribe(&Sink::on_push(move |v: i32| late.borrow_mut().push(v)));
      }
    }));

    subject.push(1).unwrap();
    assert_eq!(*late.borrow(), vec![1, 2]);
    assert_eq!(subject.buffered(), vec![1, 2]);
  }

  #[test]
  fn count_bound_keeps_storage_bounded() {
    let subject = ReplaySubject::new(3);
    for v in 0..1000 {
      subject.push(v).unwrap();
      assert!(subject.state.buffer.borrow().values.len() <= 3);
    }
    assert_eq!(subject.buffered(), vec![997, 998, 999]);
  }
}
