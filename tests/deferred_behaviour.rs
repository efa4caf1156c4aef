// tests/deferred_behaviour.rs

mod common;
use crate::common::{capture, init_tracing, resolve_now};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use stageflow::{Continuation, Deferred, FlowError};

#[test]
fn immediate_success_runs_continuation_once_on_same_stack() {
    init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let caller = thread::current().id();
    let seen_thread = Arc::new(Mutex::new(None));

    let (c, t) = (Arc::clone(&calls), Arc::clone(&seen_thread));
    Deferred::value(11).perform(move |result| {
        c.fetch_add(1, Ordering::SeqCst);
        *t.lock().unwrap() = Some(thread::current().id());
        assert_eq!(result.unwrap(), 11);
    });

    // Returned only after the continuation ran: synchronous delivery.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen_thread.lock().unwrap(), Some(caller));
}

#[test]
fn failure_skips_map_and_flat_map() {
    init_tracing();

    let transforms = Arc::new(AtomicUsize::new(0));
    let (t1, t2) = (Arc::clone(&transforms), Arc::clone(&transforms));

    let d = Deferred::<u32>::failed(FlowError::failure("disk gone"))
        .map(move |v| {
            t1.fetch_add(1, Ordering::SeqCst);
            v + 1
        })
        .and_then(move |v| {
            t2.fetch_add(1, Ordering::SeqCst);
            Deferred::value(v * 2)
        });

    let err = resolve_now(d).unwrap_err();
    assert_eq!(err.to_string(), "disk gone");
    assert_eq!(transforms.load(Ordering::SeqCst), 0);
}

#[test]
fn flat_map_receives_the_raw_failure() {
    let d = Deferred::<u32>::failed(FlowError::Cancelled).flat_map(|result| match result {
        Ok(_) => Deferred::value("ok"),
        Err(err) if err.is_cancellation() => Deferred::value("recovered"),
        Err(err) => Deferred::failed(err),
    });
    assert_eq!(resolve_now(d).unwrap(), "recovered");
}

#[test]
fn try_flat_map_error_becomes_failed_deferred() {
    let d = Deferred::value(3).try_flat_map(|_| -> stageflow::Result<Deferred<u32>> {
        Err(FlowError::failure("bad header"))
    });
    assert!(resolve_now(d).is_err());
}

#[test]
fn map_fusion_matches_composed_map() {
    let f = |x: i64| x * 3;
    let g = |x: i64| x - 4;

    for input in [-2_i64, 0, 5, 1000] {
        let calls_a = Arc::new(AtomicUsize::new(0));
        let calls_b = Arc::new(AtomicUsize::new(0));

        let (ca, cb) = (Arc::clone(&calls_a), Arc::clone(&calls_b));
        let chained = Arc::new(Mutex::new(None));
        let fused = Arc::new(Mutex::new(None));
        let (sa, sb) = (Arc::clone(&chained), Arc::clone(&fused));

        Deferred::value(input).map(f).map(g).perform(move |r| {
            ca.fetch_add(1, Ordering::SeqCst);
            *sa.lock().unwrap() = Some(r.unwrap());
        });
        Deferred::value(input).map(move |x| g(f(x))).perform(move |r| {
            cb.fetch_add(1, Ordering::SeqCst);
            *sb.lock().unwrap() = Some(r.unwrap());
        });

        assert_eq!(*chained.lock().unwrap(), *fused.lock().unwrap());
        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn future_deferred_resolves_on_the_registrations_thread() {
    let d = Deferred::future(|cont: Continuation<thread::ThreadId>| {
        thread::spawn(move || cont.succeed(thread::current().id()));
    });

    let (tx, rx) = std::sync::mpsc::channel();
    d.map(|id| (id, thread::current().id())).perform(move |r| {
        tx.send(r).unwrap();
    });

    let (produced_on, mapped_on) = rx.recv().unwrap().unwrap();
    assert_eq!(produced_on, mapped_on);
    assert_ne!(produced_on, thread::current().id());
}

#[test]
fn first_error_wins_across_a_chain() {
    let d = Deferred::value(1)
        .try_map(|_| -> stageflow::Result<u32> { Err(FlowError::Stopped) })
        .try_map(|_| -> stageflow::Result<u32> { Err(FlowError::failure("later")) });
    assert!(matches!(resolve_now(d), Err(FlowError::Stopped)));
}

#[test]
fn promise_delivers_across_threads() {
    let (promise, d) = Deferred::promise();
    let slot = capture(d.map(|s: String| s.len()));
    assert!(slot.lock().unwrap().is_none());

    thread::spawn(move || promise.succeed("twelve chars".to_string()))
        .join()
        .unwrap();
    assert_eq!(slot.lock().unwrap().take().unwrap().unwrap(), 12);
}

#[test]
fn all_collects_in_order() {
    let (promise, late) = Deferred::promise();
    let d = Deferred::all(vec![Deferred::value(1), late, Deferred::value(3)]);
    let slot = capture(d);
    assert!(slot.lock().unwrap().is_none());

    promise.succeed(2);
    assert_eq!(slot.lock().unwrap().take().unwrap().unwrap(), vec![1, 2, 3]);
}
