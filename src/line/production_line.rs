// src/line/production_line.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::config::LineConfig;
use crate::deferred::{Deferred, Promise};
use crate::errors::{FlowError, Result};
use crate::exec::{Performer, SerialQueue, Service};
use crate::stage::Progression;

use super::core::{Completed, ItemId, LineCore, LineSnapshot};

/// Bounded-concurrency queue of progressions.
///
/// At most `max_count` items run at once; the rest wait in FIFO order. All
/// bookkeeping happens in jobs on one private [`SerialQueue`], so a
/// completion, the capacity computation and the launch of replacement items
/// form a single serialized step. Items themselves run on the line's
/// performer.
///
/// Cloning yields another handle to the same line.
pub struct ProductionLine<P: Progression> {
    shared: Arc<Shared<P>>,
}

impl<P: Progression> Clone for ProductionLine<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<P: Progression> {
    context: SerialQueue,
    performer: Performer,
    state: Mutex<LineState<P>>,
}

struct LineState<P: Progression> {
    core: LineCore<P, P::Output>,
    /// Submitters waiting on a specific item.
    waiters: HashMap<ItemId, Promise<P::Output>>,
    /// Callers waiting for the line to run dry.
    drains: Vec<Promise<Vec<Completed<P::Output>>>>,
}

impl<P: Progression> fmt::Debug for ProductionLine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductionLine")
            .field("label", &self.shared.context.label())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl<P: Progression> ProductionLine<P> {
    /// Create a line running at most `max_count` items at once.
    ///
    /// `max_count == 0` is rejected with `FlowError::InvalidCapacity`.
    pub fn new(max_count: usize, performer: Performer) -> Result<Self> {
        Self::with_label("production-line", max_count, performer)
    }

    pub fn with_label(label: impl Into<String>, max_count: usize, performer: Performer) -> Result<Self> {
        let core = LineCore::new(max_count)?;
        let label = label.into();
        info!(line = %label, max_count, "production line created");
        Ok(Self {
            shared: Arc::new(Shared {
                context: SerialQueue::new(label),
                performer,
                state: Mutex::new(LineState {
                    core,
                    waiters: HashMap::new(),
                    drains: Vec::new(),
                }),
            }),
        })
    }

    pub fn from_config(config: &LineConfig, performer: Performer) -> Result<Self> {
        let line = Self::new(config.max_concurrent, performer)?;
        if config.start_suspended {
            line.suspend();
        }
        Ok(line)
    }

    pub fn max_count(&self) -> usize {
        self.shared.lock().core.max_count()
    }

    /// Queue progressions; each starts immediately while capacity remains.
    ///
    /// Items added to a draining line are dropped with a warning.
    pub fn add<I>(&self, progressions: I)
    where
        I: IntoIterator<Item = P>,
    {
        let items: Vec<P> = progressions.into_iter().collect();
        self.schedule(move |shared| {
            let mut refused = Vec::new();
            let started = {
                let mut state = shared.lock();
                for item in items {
                    if let Err(rejected) = state.core.enqueue(item) {
                        warn!(
                            line = %shared.context.label(),
                            error = %rejected.error,
                            "rejected item"
                        );
                        refused.push(rejected.item);
                    }
                }
                state.core.activate_next()
            };
            // Progressions may touch the line when dropped.
            drop(refused);
            shared.launch(started);
            shared.settle_drains();
        });
    }

    /// Queue one progression and receive its result.
    pub fn submit(&self, progression: P) -> Deferred<P::Output> {
        let (promise, deferred) = Deferred::promise();
        self.schedule(move |shared| {
            let mut state = shared.lock();
            match state.core.enqueue(progression) {
                Ok(id) => {
                    state.waiters.insert(id, promise);
                    let started = state.core.activate_next();
                    drop(state);
                    shared.launch(started);
                }
                Err(rejected) => {
                    drop(state);
                    drop(rejected.item);
                    promise.fail(rejected.error);
                }
            }
        });
        deferred
    }

    /// Drop queued, not-yet-started work. Running items are unaffected;
    /// dropped `submit` callers receive `FlowError::Cancelled`.
    pub fn clear_pending(&self) {
        self.schedule(|shared| {
            let (items, cancelled) = {
                let mut state = shared.lock();
                let dropped = state.core.clear_pending();
                let mut items = Vec::with_capacity(dropped.len());
                let mut cancelled = Vec::new();
                for (id, item) in dropped {
                    items.push(item);
                    cancelled.extend(state.waiters.remove(&id));
                }
                (items, cancelled)
            };
            drop(items);
            for promise in cancelled {
                promise.fail(FlowError::Cancelled);
            }
            shared.settle_drains();
        });
    }

    /// Pause bookkeeping. Adds and completions queue up until `resume`;
    /// items already running keep running.
    pub fn suspend(&self) {
        debug!(line = %self.shared.context.label(), "suspending production line");
        self.shared.context.suspend();
    }

    pub fn resume(&self) {
        debug!(line = %self.shared.context.label(), "resuming production line");
        self.shared.context.resume();
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.context.is_suspended()
    }

    /// Remove and return results of finished `add`ed items, in completion
    /// order.
    pub fn take_completed(&self) -> Deferred<Vec<Completed<P::Output>>> {
        let (promise, deferred) = Deferred::promise();
        self.schedule(move |shared| {
            let taken = shared.lock().core.take_completed();
            promise.succeed(taken);
        });
        deferred
    }

    /// Close the line and wait for it to run dry.
    ///
    /// Later `add`/`submit` calls are refused with `FlowError::Closed`.
    /// Active and pending items still run to completion; call
    /// [`clear_pending`](Self::clear_pending) first to discard queued work.
    /// Resolves with every completed result not yet taken.
    pub fn drain(&self) -> Deferred<Vec<Completed<P::Output>>> {
        let (promise, deferred) = Deferred::promise();
        self.schedule(move |shared| {
            {
                let mut state = shared.lock();
                state.core.close();
                state.drains.push(promise);
            }
            info!(line = %shared.context.label(), "production line draining");
            shared.settle_drains();
        });
        deferred
    }

    /// Current collection sizes.
    pub fn snapshot(&self) -> LineSnapshot {
        self.shared.lock().core.snapshot()
    }

    fn schedule<F>(&self, job: F)
    where
        F: FnOnce(&Arc<Shared<P>>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.shared.context.run(Box::new(move || job(&shared)));
    }
}

impl<P: Progression> Shared<P> {
    fn lock(&self) -> MutexGuard<'_, LineState<P>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start items the core just moved to `active`.
    fn launch(self: &Arc<Self>, started: Vec<(ItemId, P)>) {
        for (id, item) in started {
            debug!(line = %self.context.label(), id, "starting item");
            let shared = Arc::clone(self);
            item.deferred(Performer::clone(&self.performer), None)
                .perform(move |result| {
                    let owner = Arc::clone(&shared);
                    shared
                        .context
                        .run(Box::new(move || owner.finish(id, result)));
                });
        }
    }

    /// Completion protocol: retire, record, refill. Runs on the context.
    fn finish(self: &Arc<Self>, id: ItemId, result: Result<P::Output>) {
        match &result {
            Ok(_) => debug!(line = %self.context.label(), id, "item finished"),
            Err(err) => debug!(line = %self.context.label(), id, error = %err, "item failed"),
        }

        let (waiter, result, started) = {
            let mut state = self.lock();
            match state.waiters.remove(&id) {
                Some(promise) => {
                    let started = state.core.complete_delivered(id);
                    (Some(promise), Some(result), started)
                }
                None => {
                    let started = state.core.complete(id, result);
                    (None, None, started)
                }
            }
        };

        if let (Some(promise), Some(result)) = (waiter, result) {
            promise.resolve(result);
        }
        self.launch(started);
        self.settle_drains();
    }

    /// Resolve drain callers once the closed line has no work left.
    fn settle_drains(&self) {
        let (drains, results) = {
            let mut state = self.lock();
            if state.drains.is_empty() || !state.core.is_closed() || !state.core.is_idle() {
                return;
            }
            let drains = std::mem::take(&mut state.drains);
            (drains, state.core.take_completed())
        };

        info!(line = %self.context.label(), results = results.len(), "production line drained");
        let mut results = Some(results);
        for promise in drains {
            promise.succeed(results.take().unwrap_or_default());
        }
    }
}
