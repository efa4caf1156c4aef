// tests/serial_order.rs

mod common;
use crate::common::builders::{CountdownBuilder, Event, EventLog, Recorded};
use crate::common::fake_service::ManualService;
use crate::common::{capture, init_tracing, resolve_now, with_timeout};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stageflow::exec::{DelayedService, ImmediateService, Performer, PoolMode, PoolService};
use stageflow::{FlowError, Progress, Progression, Serial, Serially, serially};

fn immediate() -> Performer {
    Arc::new(ImmediateService)
}

/// Panics if any stage started before the previous one finished.
fn assert_no_overlap(log: &[Event]) {
    let mut open: Option<usize> = None;
    for event in log {
        match (*event, open) {
            (Event::Started(tag), None) => open = Some(tag),
            (Event::Finished(tag), Some(current)) if tag == current => open = None,
            (event, open) => panic!("{event:?} while {open:?} was running: {log:?}"),
        }
    }
    assert!(open.is_none(), "stage {open:?} never finished");
}

#[test]
fn empty_sequence_finishes_with_no_results() {
    let results = resolve_now(serially(Vec::<Recorded>::new(), immediate())).unwrap();
    assert!(results.is_empty());
}

#[test]
fn next_stage_waits_for_the_previous_one() {
    init_tracing();

    let hop = ManualService::new();
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let stages: Vec<Recorded> = (0..3)
        .map(|tag| Recorded::new(tag, Arc::clone(&log), hop.clone()))
        .collect();

    let slot = capture(stages.serially(immediate()));
    assert_eq!(*log.lock().unwrap(), vec![Event::Started(0)]);
    assert_eq!(hop.queued(), 1);

    assert!(hop.run_next());
    assert_eq!(
        *log.lock().unwrap(),
        vec![Event::Started(0), Event::Finished(0), Event::Started(1)]
    );
    assert_eq!(hop.queued(), 1);

    hop.run_all();
    assert_eq!(slot.lock().unwrap().take().unwrap().unwrap(), vec![0, 1, 2]);
    assert_no_overlap(&log.lock().unwrap());
}

#[test]
fn a_failing_stage_ends_the_sequence() {
    let third_ran = Arc::new(AtomicUsize::new(0));
    let stages = vec![
        CountdownBuilder::new(2).value(1).build(),
        CountdownBuilder::new(2).fail_on_step(2).build(),
        CountdownBuilder::new(2).counter(Arc::clone(&third_ran)).build(),
    ];

    let err = resolve_now(serially(stages, immediate())).unwrap_err();
    assert!(matches!(err, FlowError::Other(_)));
    assert!(err.to_string().contains("countdown failed"));
    assert_eq!(third_ran.load(Ordering::SeqCst), 0);
}

#[test]
fn progress_is_checked_inside_each_child() {
    let executed = Arc::new(AtomicUsize::new(0));
    let stages: Vec<_> = (0..2)
        .map(|_| CountdownBuilder::new(5).counter(Arc::clone(&executed)).build())
        .collect();

    let watched = Arc::clone(&executed);
    let progress = Progress::new(move || watched.load(Ordering::SeqCst) < 3);
    let sequence = Serial::new(stages, immediate()).with_progress(progress.clone());

    let err = resolve_now(sequence.deferred(immediate(), Some(progress))).unwrap_err();
    assert!(matches!(err, FlowError::Cancelled));
    // The first child stops after its third step instead of running all five.
    assert_eq!(executed.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn random_latencies_keep_submission_order() {
    init_tracing();

    let pool: Performer = Arc::new(PoolService::current(PoolMode::Async).unwrap());
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));

    // Later stages are faster, so any overlap would reorder the log.
    let stages: Vec<Recorded> = (0..8)
        .map(|tag| {
            let delay = Duration::from_millis(((8 - tag) * 3) as u64);
            let hop: Performer =
                Arc::new(DelayedService::current(Performer::clone(&pool), delay).unwrap());
            Recorded::new(tag, Arc::clone(&log), hop)
        })
        .collect();

    let results = with_timeout(serially(stages, pool).wait()).await.unwrap();
    assert_eq!(results, (0..8).collect::<Vec<_>>());

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 16);
    assert_no_overlap(&log);
}
