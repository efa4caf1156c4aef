// src/stage/serial.rs

//! Strict one-at-a-time sequencing of progressions.

use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use crate::deferred::Deferred;
use crate::engine::Progress;
use crate::errors::Result;
use crate::exec::Performer;

use super::{Progression, State, Update};

/// A progression over a list of stages, run strictly in order.
///
/// Terminal output is the stages' outputs in submission order. Stage `i + 1`
/// is not started until stage `i` has finished, and the first failure ends
/// the whole sequence.
///
/// Each child runs as its own driven workflow. A [`Progress`] set with
/// [`with_progress`](Self::with_progress) is checked before every child step;
/// without one, an outer driver's checks apply only between children.
pub enum Serial<S: Progression> {
    Start {
        stages: VecDeque<S>,
        performer: Performer,
        progress: Option<Progress>,
    },
    Running {
        remaining: VecDeque<S>,
        current: S,
        results: Vec<S::Output>,
        performer: Performer,
        progress: Option<Progress>,
    },
}

impl<S: Progression> Serial<S> {
    pub fn new<I>(stages: I, performer: Performer) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        Serial::Start {
            stages: stages.into_iter().collect(),
            performer,
            progress: None,
        }
    }

    /// Check `progress` before every step of every child.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        match &mut self {
            Serial::Start { progress: slot, .. } | Serial::Running { progress: slot, .. } => {
                *slot = Some(progress);
            }
        }
        self
    }

    /// Stages not yet started (excluding the one in flight).
    pub fn remaining(&self) -> usize {
        match self {
            Serial::Start { stages, .. } => stages.len(),
            Serial::Running { remaining, .. } => remaining.len(),
        }
    }
}

impl<S: Progression> fmt::Debug for Serial<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Serial::Start { stages, .. } => f
                .debug_struct("Start")
                .field("stages", &stages.len())
                .finish_non_exhaustive(),
            Serial::Running {
                remaining, results, ..
            } => f
                .debug_struct("Running")
                .field("remaining", &remaining.len())
                .field("finished", &results.len())
                .finish_non_exhaustive(),
        }
    }
}

impl<S: Progression> Progression for Serial<S> {
    type Output = Vec<S::Output>;

    fn update_or_defer_next(self) -> Result<Update<Self>> {
        match self {
            Serial::Start {
                mut stages,
                performer,
                progress,
            } => match stages.pop_front() {
                None => Ok(Update::finish(Vec::new())),
                Some(current) => {
                    let results = Vec::with_capacity(stages.len() + 1);
                    Ok(Update::advance(Serial::Running {
                        remaining: stages,
                        current,
                        results,
                        performer,
                        progress,
                    }))
                }
            },
            Serial::Running {
                mut remaining,
                current,
                mut results,
                performer,
                progress,
            } => {
                let child = current.deferred(Performer::clone(&performer), progress.clone());
                Ok(Update::later(child.map(move |output| {
                    results.push(output);
                    trace!(finished = results.len(), left = remaining.len(), "serial stage done");
                    match remaining.pop_front() {
                        None => State::Finished(results),
                        Some(current) => State::Running(Serial::Running {
                            remaining,
                            current,
                            results,
                            performer,
                            progress,
                        }),
                    }
                })))
            }
        }
    }
}

/// Lift a sequence of progressions into one deferred of ordered results.
pub fn serially<S, I>(stages: I, performer: Performer) -> Deferred<Vec<S::Output>>
where
    S: Progression,
    I: IntoIterator<Item = S>,
{
    Serial::new(stages, Performer::clone(&performer)).deferred(performer, None)
}

/// Method form of [`serially`] for any iterable of progressions.
pub trait Serially<S: Progression> {
    fn serially(self, performer: Performer) -> Deferred<Vec<S::Output>>;
}

impl<S, I> Serially<S> for I
where
    S: Progression,
    I: IntoIterator<Item = S>,
{
    fn serially(self, performer: Performer) -> Deferred<Vec<S::Output>> {
        serially(self, performer)
    }
}
