//! Integration tests for rxcore
//!
//! Exercises disposal, delivery, subjects and queued scheduling together,
//! through the public prelude only.

use std::{cell::RefCell, rc::Rc};

use rxcore::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;

fn named_sink(name: &'static str, log: &Log) -> Sink<i32> {
  let log = log.clone();
  Sink::new(move |e: Event<i32>| {
    log.borrow_mut().push(match e {
      Event::Push(v) => format!("{name}:{v}"),
      Event::Throw(err) => format!("{name}:throw {err}"),
      Event::End => format!("{name}:end"),
    })
  })
}

fn capture_reports() -> (ReporterGuard, Log) {
  let reports = Log::default();
  let c_reports = reports.clone();
  let guard = set_reporter(move |e: Error| c_reports.borrow_mut().push(e.to_string()));
  (guard, reports)
}

#[test]
fn test_idempotent_disposal() {
  let runs = Rc::new(RefCell::new(0));
  let c_runs = runs.clone();
  let d = Disposable::with_teardown(move || *c_runs.borrow_mut() += 1);

  for _ in 0..3 {
    d.dispose().unwrap();
    assert!(!d.active());
  }
  assert_eq!(*runs.borrow(), 1);
}

#[test]
fn test_no_leak_on_late_add() {
  let parent = Disposable::new();
  parent.dispose().unwrap();

  let torn_down = Rc::new(RefCell::new(false));
  let c_torn_down = torn_down.clone();
  let child = Disposable::with_teardown(move || *c_torn_down.borrow_mut() = true);
  parent.add(&child).unwrap();

  assert!(*torn_down.borrow());
  assert!(!child.active());
}

#[test]
fn test_sibling_isolation() {
  let log = Log::default();
  let parent = Disposable::new();
  for name in ["a", "b", "c"] {
    let log = log.clone();
    let child = Disposable::with_teardown(move || {
      log.borrow_mut().push(name.to_string());
      if name == "b" { Err(Error::msg("b failed")) } else { Ok(()) }
    });
    parent.add(&child).unwrap();
  }

  let err = parent.dispose().unwrap_err();
  assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
  let messages: Vec<_> = err.errors().iter().map(ToString::to_string).collect();
  assert_eq!(messages, vec!["b failed"]);
}

#[test]
fn test_terminal_event_exclusivity() {
  let log = Log::default();
  let sink = named_sink("s", &log);
  sink.push(1);
  sink.throw("first");
  assert!(!sink.active());

  let (_guard, reports) = capture_reports();
  sink.push(2);
  sink.end();
  sink.throw("second");
  assert_eq!(*log.borrow(), vec!["s:1", "s:throw first"]);
  assert_eq!(*reports.borrow(), vec!["second"]);
}

#[test]
fn test_self_modifying_distribution_order() {
  let log = Log::default();
  let subject = Subject::new();
  let b = named_sink("B", &log);
  let d = named_sink("D", &log);

  let first = Rc::new(RefCell::new(true));
  let (c_subject, c_b, c_d, c_log) = (subject.clone(), b.clone(), d.clone(), log.clone());
  let a = Sink::on_push(move |v: i32| {
    c_log.borrow_mut().push(format!("A:{v}"));
    if first.replace(false) {
      c_b.dispose()?;
      c_subject.subscribe(&c_d);
    }
    Ok::<(), Error>(())
  });

  subject.subscribe(&a);
  subject.subscribe(&b);
  subject.subscribe(&named_sink("C", &log));

  subject.push(1).unwrap();
  subject.push(2).unwrap();
  assert_eq!(*log.borrow(), vec!["A:1", "C:1", "A:2", "C:2", "D:2"]);
}

#[test]
fn test_reentrant_push_ordering() {
  let log = Log::default();
  let subject = Subject::new();
  let c_subject = subject.clone();
  let c_log = log.clone();
  subject.subscribe(&Sink::on_push(move |v: i32| {
    c_log.borrow_mut().push(format!("first:{v}"));
    if v == 1 {
      c_subject.push(2)?;
    }
    Ok::<(), Error>(())
  }));
  subject.subscribe(&named_sink("second", &log));
  subject.subscribe(&named_sink("third", &log));

  subject.push(1).unwrap();
  assert_eq!(
    *log.borrow(),
    vec!["first:1", "second:1", "third:1", "first:2", "second:2", "third:2"]
  );
}

#[test]
fn test_replay_subject_bounds() {
  let subject = ReplaySubject::new(2);
  for v in 1..=3 {
    subject.push(v).unwrap();
  }
  let log = Log::default();
  subject.subscribe(&named_sink("late", &log));
  assert_eq!(*log.borrow(), vec!["late:2", "late:3"]);
}

#[test]
fn test_subject_variants_late_subscribers() {
  let log = Log::default();

  let plain = Subject::new();
  plain.push(1).unwrap();
  plain.end().unwrap();
  plain.subscribe(&named_sink("plain", &log));

  let current = CurrentValueSubject::new(0);
  current.push(1).unwrap();
  current.subscribe(&named_sink("current", &log));

  let last = FinalValueSubject::new();
  last.push(1).unwrap();
  last.push(2).unwrap();
  last.end().unwrap();
  last.subscribe(&named_sink("final", &log));

  assert_eq!(*log.borrow(), vec!["plain:end", "current:1", "final:2", "final:end"]);
}

#[test]
fn test_subscribing_while_push_is_queued() {
  let log = Log::default();

  let current = CurrentValueSubject::new(0);
  let replay = ReplaySubject::unbounded();
  let (c_current, c_replay, c_log) = (current.clone(), replay.clone(), log.clone());
  current.subscribe(&Sink::on_push(move |v: i32| {
    if v == 1 {
      c_current.push(2).unwrap();
      c_current.subscribe(&named_sink("current", &c_log));
    }
  }));
  let c_log = log.clone();
  replay.subscribe(&Sink::on_push(move |v: i32| {
    if v == 1 {
      c_replay.push(2).unwrap();
      c_replay.subscribe(&named_sink("replay", &c_log));
    }
  }));

  current.push(1).unwrap();
  replay.push(1).unwrap();
  assert_eq!(*log.borrow(), vec!["current:1", "current:2", "replay:1", "replay:2"]);
}

#[test]
fn test_subject_fed_by_source() {
  let log = Log::default();
  let subject = ReplaySubject::unbounded();
  subject.subscribe(&named_sink("early", &log));

  create(|sink: &Sink<i32>| {
    (1..=3).for_each(|v| sink.push(v));
    sink.end();
  })
  .subscribe(&subject.as_sink());

  subject.subscribe(&named_sink("late", &log));
  assert_eq!(
    *log.borrow(),
    vec!["early:1", "early:2", "early:3", "early:end", "late:1", "late:2", "late:3", "late:end"]
  );
}

#[test]
fn test_sink_lifetime_follows_parent() {
  let log = Log::default();
  let subject = Subject::new();
  let scope = Disposable::new();
  let sink = named_sink("scoped", &log);
  scope.add(sink.disposable()).unwrap();
  subject.subscribe(&sink);

  subject.push(1).unwrap();
  scope.dispose().unwrap();
  subject.push(2).unwrap();

  assert_eq!(*log.borrow(), vec!["scoped:1"]);
  assert_eq!(subject.subscriber_count(), 0);
}

#[test]
fn test_schedule_queued_fifo_under_recursion() {
  let manual = ManualScheduler::new();
  let queued = schedule_queued(manual.clone());
  let log = Log::default();

  let (c_queued, c_log) = (queued.clone(), log.clone());
  queued
    .schedule(
      callback(move || {
        c_log.borrow_mut().push("f1".into());
        let log = c_log.clone();
        c_queued.schedule(callback(move || log.borrow_mut().push("f3".into())), None)
      }),
      None,
    )
    .unwrap();
  let c_log = log.clone();
  queued.schedule(callback(move || c_log.borrow_mut().push("f2".into())), None).unwrap();

  manual.flush().unwrap();
  assert_eq!(*log.borrow(), vec!["f1", "f2", "f3"]);
}

#[test]
fn test_schedule_queued_failure_isolation() {
  let manual = ManualScheduler::new();
  let queued = schedule_queued(manual.clone());
  let log = Log::default();

  queued.schedule(callback(|| Err::<(), _>("f1 failed")), None).unwrap();
  let c_log = log.clone();
  queued.schedule(callback(move || c_log.borrow_mut().push("f2".into())), None).unwrap();

  let err = manual.flush().unwrap_err();
  assert_eq!(err.errors()[0].to_string(), "f1 failed");
  assert!(log.borrow().is_empty());

  let c_log = log.clone();
  queued.schedule(callback(move || c_log.borrow_mut().push("f3".into())), None).unwrap();
  manual.flush().unwrap();
  assert_eq!(*log.borrow(), vec!["f3"]);
}

#[cfg(feature = "futures-scheduler")]
#[test]
fn test_subject_driven_by_local_pool() {
  use futures::executor::LocalPool;

  let mut pool = LocalPool::new();
  let queued = schedule_queued(LocalPoolScheduler::new(pool.spawner()));
  let subject = Subject::new();
  let log = Log::default();
  subject.subscribe(&named_sink("s", &log));

  for v in 1..=3 {
    let subject = subject.clone();
    queued.schedule(callback(move || subject.push(v)), None).unwrap();
  }
  let c_subject = subject.clone();
  queued.schedule(callback(move || c_subject.end()), None).unwrap();
  assert!(log.borrow().is_empty());

  pool.run_until_stalled();
  assert_eq!(*log.borrow(), vec!["s:1", "s:2", "s:3", "s:end"]);
}
