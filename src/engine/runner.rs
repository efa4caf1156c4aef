// src/engine/runner.rs

//! The stepping driver shared by `Runner::run` and `Progression::deferred`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::deferred::{Continuation, Deferred};
use crate::errors::{FlowError, Result};
use crate::exec::{Performer, Service};
use crate::stage::{Progression, State};

use super::environment::Environment;
use super::progress::Progress;

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Drives progressions to completion through an [`Environment`].
///
/// Each step is submitted to the environment's service for the current
/// stage. When the job runs, the runner:
/// 1. ends the run with `FlowError::Cancelled` if the progress predicate
///    reports false,
/// 2. ends it with `FlowError::Stopped` if `should_stop` is true
///    (`before` and the step are skipped),
/// 3. calls `before`, then `adjust`,
/// 4. performs the (adjusted) stage's transition.
///
/// Checks happen on the executor, right before the transition would run, so
/// a cancellation issued while a step is queued or delayed is still honoured.
/// Steps of one run never overlap. The final result is delivered on the
/// completion service when one is set, otherwise on whatever thread finished
/// the last step.
pub struct Runner<P, E> {
    env: Arc<E>,
    progress: Option<Progress>,
    completion: Option<Performer>,
    _stage: PhantomData<fn(P)>,
}

impl<P, E> Clone for Runner<P, E> {
    fn clone(&self) -> Self {
        Self {
            env: Arc::clone(&self.env),
            progress: self.progress.clone(),
            completion: self.completion.clone(),
            _stage: PhantomData,
        }
    }
}

impl<P, E> fmt::Debug for Runner<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("progress", &self.progress.is_some())
            .field("completion", &self.completion.is_some())
            .finish_non_exhaustive()
    }
}

impl<P, E> Runner<P, E>
where
    P: Progression,
    E: Environment<P>,
{
    pub fn new(env: E) -> Self {
        Self::from_arc(Arc::new(env))
    }

    pub fn from_arc(env: Arc<E>) -> Self {
        Self {
            env,
            progress: None,
            completion: None,
            _stage: PhantomData,
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Deliver final results on `service` instead of the last step's executor.
    pub fn with_completion_service(mut self, service: Performer) -> Self {
        self.completion = Some(service);
        self
    }

    pub fn environment(&self) -> &Arc<E> {
        &self.env
    }

    /// The workflow's result. Nothing runs until the deferred is performed.
    pub fn run(&self, stage: P) -> Deferred<P::Output> {
        let drive = Arc::new(Drive {
            env: Arc::clone(&self.env),
            progress: self.progress.clone(),
            completion: self.completion.clone(),
            run_id: RUN_COUNTER.fetch_add(1, Ordering::Relaxed) + 1,
            _stage: PhantomData,
        });
        Deferred::future(move |cont| {
            debug!(run_id = drive.run_id, "run started");
            step(drive, stage, 0, cont);
        })
    }

    /// Start the workflow now and hand the result to `callback`.
    pub fn spawn<F>(&self, stage: P, callback: F)
    where
        F: FnOnce(Result<P::Output>) + Send + 'static,
    {
        self.run(stage).perform(callback);
    }
}

struct Drive<P, E> {
    env: Arc<E>,
    progress: Option<Progress>,
    completion: Option<Performer>,
    run_id: u64,
    _stage: PhantomData<fn(P)>,
}

impl<P, E> Drive<P, E>
where
    P: Progression,
    E: Environment<P>,
{
    fn finish(&self, cont: Continuation<P::Output>, result: Result<P::Output>, steps: usize) {
        match &result {
            Ok(_) => debug!(run_id = self.run_id, steps, "run finished"),
            Err(err) => debug!(run_id = self.run_id, steps, error = %err, "run failed"),
        }
        match &self.completion {
            Some(service) => service.run(Box::new(move || cont.resume(result))),
            None => cont.resume(result),
        }
    }
}

fn step<P, E>(drive: Arc<Drive<P, E>>, stage: P, steps: usize, cont: Continuation<P::Output>)
where
    P: Progression,
    E: Environment<P>,
{
    let service = drive.env.service(&stage);
    trace!(run_id = drive.run_id, step = steps + 1, "submitting step");

    service.run(Box::new(move || {
        if let Some(progress) = &drive.progress {
            if !progress.should_continue() {
                return drive.finish(cont, Err(FlowError::Cancelled), steps);
            }
        }

        if drive.env.should_stop(&stage) {
            return drive.finish(cont, Err(FlowError::Stopped), steps);
        }

        drive.env.before(&stage);
        let stage = drive.env.adjust(stage);

        stage.next().perform(move |result| match result {
            Ok(State::Running(next)) => step(drive, next, steps + 1, cont),
            Ok(State::Finished(output)) => drive.finish(cont, Ok(output), steps + 1),
            Err(err) => drive.finish(cont, Err(err), steps + 1),
        });
    }));
}
