// src/stage/mod.rs

//! Value-typed workflow state machines.
//!
//! A [`Progression`] is one phase of a multi-step async workflow. Each call
//! to [`update_or_defer_next`](Progression::update_or_defer_next) consumes the
//! current value and yields the next [`State`]: either another running phase
//! or the final `Output`. A finished workflow is never a `Self` value, so it
//! cannot be stepped again.
//!
//! - [`compose`] drives a child progression inside a parent's state space.
//! - [`serial`] runs a list of progressions strictly one after another.

pub mod compose;
pub mod serial;

use std::fmt;

use crate::deferred::{Deferred, guarded};
use crate::engine::{Progress, Runner, UniformEnvironment};
use crate::errors::Result;
use crate::exec::Performer;

pub use compose::compose;
pub use serial::{Serial, Serially, serially};

/// Where a workflow is after one transition.
pub enum State<P: Progression> {
    /// More transitions are needed.
    Running(P),
    /// Terminal: the workflow's result.
    Finished(P::Output),
}

impl<P: Progression> State<P> {
    pub fn is_finished(&self) -> bool {
        matches!(self, State::Finished(_))
    }

    pub fn into_output(self) -> Option<P::Output> {
        match self {
            State::Finished(output) => Some(output),
            State::Running(_) => None,
        }
    }
}

impl<P> fmt::Debug for State<P>
where
    P: Progression + fmt::Debug,
    P::Output: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Running(p) => f.debug_tuple("Running").field(p).finish(),
            State::Finished(o) => f.debug_tuple("Finished").field(o).finish(),
        }
    }
}

/// How a transition was carried out.
pub enum Update<P: Progression> {
    /// The transition completed synchronously.
    Now(State<P>),
    /// The transition needs async work; the deferred yields the next state.
    Later(Deferred<State<P>>),
}

impl<P: Progression> Update<P> {
    /// Synchronously move to `next`.
    pub fn advance(next: P) -> Self {
        Update::Now(State::Running(next))
    }

    /// Synchronously finish with `output`.
    pub fn finish(output: P::Output) -> Self {
        Update::Now(State::Finished(output))
    }

    pub fn later(next: Deferred<State<P>>) -> Self {
        Update::Later(next)
    }

    /// Async transition that always lands on another running phase.
    pub fn later_advance(next: Deferred<P>) -> Self {
        Update::Later(next.map(State::Running))
    }
}

impl<P: Progression> fmt::Debug for Update<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Now(state) => {
                let kind = if state.is_finished() { "Finished" } else { "Running" };
                f.debug_tuple("Now").field(&kind).finish()
            }
            Update::Later(d) => f.debug_tuple("Later").field(d).finish(),
        }
    }
}

/// A workflow phase that knows how to compute its successor.
pub trait Progression: Sized + Send + 'static {
    type Output: Send + 'static;

    /// Perform one transition. Returning `Err` fails the whole workflow.
    fn update_or_defer_next(self) -> Result<Update<Self>>;

    /// Uniform wrapper: the next state as a deferred.
    fn next(self) -> Deferred<State<Self>> {
        match guarded(move || self.update_or_defer_next()) {
            Ok(Update::Now(state)) => Deferred::value(state),
            Ok(Update::Later(next)) => next,
            Err(err) => Deferred::failed(err),
        }
    }

    /// Drive to completion, submitting every step through `performer`.
    ///
    /// `progress` is consulted before each step; once it reports false the
    /// run ends with `FlowError::Cancelled` and no further steps execute.
    fn deferred(self, performer: Performer, progress: Option<Progress>) -> Deferred<Self::Output> {
        let mut runner = Runner::new(UniformEnvironment::new(performer));
        if let Some(progress) = progress {
            runner = runner.with_progress(progress);
        }
        runner.run(self)
    }
}
