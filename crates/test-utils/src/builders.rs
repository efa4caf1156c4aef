#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stageflow::exec::{Performer, Service};
use stageflow::{Deferred, FlowError, Progression, Result, Update};

/// Purely synchronous progression taking a fixed number of transitions.
///
/// Every executed transition bumps the shared `executed` counter, so tests can
/// see exactly how many steps ran before a cancellation.
#[derive(Debug)]
pub struct Countdown {
    remaining: u32,
    value: u64,
    fail_at: Option<u32>,
    executed: Arc<AtomicUsize>,
}

impl Progression for Countdown {
    type Output = u64;

    fn update_or_defer_next(self) -> Result<Update<Self>> {
        let step = self.executed.fetch_add(1, Ordering::SeqCst) as u32 + 1;
        if self.fail_at == Some(self.remaining) {
            return Err(FlowError::failure(format!("countdown failed at step {step}")));
        }
        if self.remaining <= 1 {
            return Ok(Update::finish(self.value));
        }
        Ok(Update::advance(Countdown {
            remaining: self.remaining - 1,
            ..self
        }))
    }
}

/// Builder for [`Countdown`].
pub struct CountdownBuilder {
    steps: u32,
    value: u64,
    fail_at: Option<u32>,
    executed: Arc<AtomicUsize>,
}

impl CountdownBuilder {
    /// A countdown of `steps` transitions (at least one).
    pub fn new(steps: u32) -> Self {
        Self {
            steps: steps.max(1),
            value: 0,
            fail_at: None,
            executed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn counter(mut self, executed: Arc<AtomicUsize>) -> Self {
        self.executed = executed;
        self
    }

    /// Fail on the `step`-th transition (1-based).
    pub fn fail_on_step(mut self, step: u32) -> Self {
        self.fail_at = Some(self.steps + 1 - step.clamp(1, self.steps));
        self
    }

    pub fn build(self) -> Countdown {
        Countdown {
            remaining: self.steps,
            value: self.value,
            fail_at: self.fail_at,
            executed: self.executed,
        }
    }
}

/// Lifecycle event recorded by [`Recorded`] progressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Started(usize),
    Finished(usize),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Two-phase progression: log `Started`, do an async hop on `hop`, log
/// `Finished` and yield its tag.
pub enum Recorded {
    Start {
        tag: usize,
        log: EventLog,
        hop: Performer,
    },
    Working {
        tag: usize,
        log: EventLog,
    },
}

impl Recorded {
    pub fn new(tag: usize, log: EventLog, hop: Performer) -> Self {
        Recorded::Start { tag, log, hop }
    }
}

impl Progression for Recorded {
    type Output = usize;

    fn update_or_defer_next(self) -> Result<Update<Self>> {
        match self {
            Recorded::Start { tag, log, hop } => {
                log.lock().unwrap().push(Event::Started(tag));
                let next = Deferred::future(move |cont| {
                    hop.run(Box::new(move || cont.succeed(Recorded::Working { tag, log })));
                });
                Ok(Update::later_advance(next))
            }
            Recorded::Working { tag, log } => {
                log.lock().unwrap().push(Event::Finished(tag));
                Ok(Update::finish(tag))
            }
        }
    }
}

/// Tracks how many progressions are inside their critical section at once.
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Progression that enters a [`Gauge`], waits out an async hop, then exits.
pub enum Metered {
    Enter {
        tag: usize,
        gauge: Arc<Gauge>,
        hop: Performer,
    },
    Exit {
        tag: usize,
        gauge: Arc<Gauge>,
    },
}

impl Metered {
    pub fn new(tag: usize, gauge: Arc<Gauge>, hop: Performer) -> Self {
        Metered::Enter { tag, gauge, hop }
    }
}

impl Progression for Metered {
    type Output = usize;

    fn update_or_defer_next(self) -> Result<Update<Self>> {
        match self {
            Metered::Enter { tag, gauge, hop } => {
                gauge.enter();
                Ok(Update::later_advance(Deferred::future(move |cont| {
                    hop.run(Box::new(move || cont.succeed(Metered::Exit { tag, gauge })));
                })))
            }
            Metered::Exit { tag, gauge } => {
                gauge.exit();
                Ok(Update::finish(tag))
            }
        }
    }
}
