// src/deferred/mod.rs

//! Continuation-passing future/promise primitive.
//!
//! A [`Deferred<T>`] is either:
//! - a ready thunk, evaluated synchronously on the caller's stack when the
//!   deferred is performed, or
//! - a registration function that is handed a [`Continuation<T>`] and resolves
//!   it later, on whatever thread the registration chooses.
//!
//! Results are always delivered as `Result<T, FlowError>`; panics inside
//! thunks and transforms are caught and turned into [`FlowError::Panicked`].
//!
//! - [`promise`] provides the write end for deferreds resolved from outside.

pub mod promise;

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{FlowError, Result};

pub use promise::Promise;

type Thunk<T> = Box<dyn FnOnce() -> Result<T> + Send>;
type Registration<T> = Box<dyn FnOnce(Continuation<T>) + Send>;
type Callback<T> = Box<dyn FnOnce(Result<T>) + Send>;

/// Run `f`, turning a panic into a `FlowError::Panicked` result.
pub(crate) fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(FlowError::from_panic(payload)))
}

/// The receiving end of a pending [`Deferred`].
///
/// Consumed by [`resume`](Continuation::resume), so it can be resolved at most
/// once. Dropping it unresolved delivers [`FlowError::Abandoned`].
pub struct Continuation<T> {
    callback: Option<Callback<T>>,
}

impl<T> Continuation<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// Deliver the result.
    pub fn resume(mut self, result: Result<T>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }

    pub fn succeed(self, value: T) {
        self.resume(Ok(value));
    }

    pub fn fail(self, err: FlowError) {
        self.resume(Err(err));
    }
}

impl<T> Drop for Continuation<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            tracing::debug!("continuation dropped unresolved; delivering Abandoned");
            callback(Err(FlowError::Abandoned));
        }
    }
}

impl<T> fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("resolved", &self.callback.is_none())
            .finish()
    }
}

enum Inner<T> {
    Ready(Thunk<T>),
    Future(Registration<T>),
}

/// A `T` that may not be ready yet, with failure capture.
pub struct Deferred<T> {
    inner: Inner<T>,
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            Inner::Ready(_) => "Ready",
            Inner::Future(_) => "Future",
        };
        f.debug_tuple("Deferred").field(&kind).finish()
    }
}

impl<T: Send + 'static> Deferred<T> {
    /// An immediately successful deferred.
    pub fn value(value: T) -> Self {
        Self::try_now(move || Ok(value))
    }

    /// An immediately failed deferred.
    pub fn failed(err: FlowError) -> Self {
        Self::try_now(move || Err(err))
    }

    /// A ready deferred whose computation runs (and may fail) when performed.
    pub fn try_now<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self {
            inner: Inner::Ready(Box::new(thunk)),
        }
    }

    /// A deferred resolved later through the continuation handed to `register`.
    pub fn future<R>(register: R) -> Self
    where
        R: FnOnce(Continuation<T>) + Send + 'static,
    {
        Self {
            inner: Inner::Future(Box::new(register)),
        }
    }

    /// Create a linked promise / deferred pair.
    pub fn promise() -> (Promise<T>, Deferred<T>) {
        promise::pair()
    }

    /// Whether performing this deferred resolves synchronously.
    pub fn is_ready(&self) -> bool {
        matches!(self.inner, Inner::Ready(_))
    }

    /// Invoke `continuation` exactly once with the result.
    pub fn perform<C>(self, continuation: C)
    where
        C: FnOnce(Result<T>) + Send + 'static,
    {
        match self.inner {
            Inner::Ready(thunk) => continuation(guarded(thunk)),
            Inner::Future(register) => {
                let cont = Continuation::new(continuation);
                if let Err(payload) = catch_unwind(AssertUnwindSafe(move || register(cont))) {
                    // The continuation moved into `register` was dropped during
                    // unwinding and already received `Abandoned`.
                    tracing::warn!(
                        error = %FlowError::from_panic(payload),
                        "deferred registration panicked"
                    );
                }
            }
        }
    }

    /// Transform the success value.
    pub fn map<U, F>(self, transform: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.try_map(move |value| Ok(transform(value)))
    }

    /// Transform the success value with a computation that may fail.
    pub fn try_map<U, F>(self, transform: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        match self.inner {
            Inner::Ready(thunk) => Deferred::try_now(move || thunk().and_then(transform)),
            Inner::Future(register) => Deferred::future(move |cont: Continuation<U>| {
                register(Continuation::new(move |result: Result<T>| {
                    cont.resume(guarded(move || result.and_then(transform)));
                }));
            }),
        }
    }

    /// Resolve self, then let `transform` inspect the raw result and produce
    /// the next deferred.
    pub fn flat_map<U, F>(self, transform: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(Result<T>) -> Deferred<U> + Send + 'static,
    {
        self.try_flat_map(move |result| Ok(transform(result)))
    }

    /// Like [`flat_map`](Self::flat_map), but `transform` may fail outright.
    pub fn try_flat_map<U, F>(self, transform: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(Result<T>) -> Result<Deferred<U>> + Send + 'static,
    {
        Deferred::future(move |cont: Continuation<U>| {
            self.perform(move |result| {
                match guarded(move || transform(result)) {
                    Ok(next) => next.perform(move |r| cont.resume(r)),
                    Err(err) => cont.fail(err),
                }
            });
        })
    }

    /// Chain asynchronous work on success; failures skip `transform`.
    pub fn and_then<U, F>(self, transform: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        self.flat_map(move |result| match result {
            Ok(value) => transform(value),
            Err(err) => Deferred::failed(err),
        })
    }

    /// Resolve every deferred in order, collecting the values.
    ///
    /// Each element is performed only after the previous one resolved; the
    /// first failure wins and later elements are never performed.
    ///
    /// Elements that resolve synchronously are collected in a loop, so the
    /// stack depth does not grow with the number of elements.
    pub fn all<I>(items: I) -> Deferred<Vec<T>>
    where
        I: IntoIterator<Item = Deferred<T>>,
    {
        let queue: VecDeque<Deferred<T>> = items.into_iter().collect();
        Deferred::future(move |cont| {
            collect_all(Collecting {
                values: Vec::with_capacity(queue.len()),
                queue,
                cont,
            })
        })
    }

    /// Await the result from async code.
    pub async fn wait(self) -> Result<T> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.perform(move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(Err(FlowError::Abandoned))
    }
}

/// In-progress state of [`Deferred::all`].
struct Collecting<T> {
    queue: VecDeque<Deferred<T>>,
    values: Vec<T>,
    cont: Continuation<Vec<T>>,
}

/// Hand-off between the collecting loop and one element's continuation.
enum Handoff<T> {
    /// The loop is still inside `perform`.
    Performing,
    /// The element resolved before `perform` returned.
    Resolved(Result<T>),
    /// `perform` returned first; the continuation resumes the loop.
    Parked(Collecting<T>),
    Done,
}

fn lock_handoff<T>(handoff: &Mutex<Handoff<T>>) -> MutexGuard<'_, Handoff<T>> {
    handoff.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn collect_all<T: Send + 'static>(mut state: Collecting<T>) {
    loop {
        let Some(next) = state.queue.pop_front() else {
            return state.cont.succeed(state.values);
        };

        let handoff = Arc::new(Mutex::new(Handoff::Performing));
        let sink = Arc::clone(&handoff);
        next.perform(move |result| {
            let mut slot = lock_handoff(&sink);
            match std::mem::replace(&mut *slot, Handoff::Done) {
                Handoff::Performing => *slot = Handoff::Resolved(result),
                Handoff::Parked(parked) => {
                    drop(slot);
                    resume_all(parked, result);
                }
                other => *slot = other,
            }
        });

        let mut slot = lock_handoff(&handoff);
        match std::mem::replace(&mut *slot, Handoff::Done) {
            Handoff::Resolved(Ok(value)) => {
                drop(slot);
                state.values.push(value);
            }
            Handoff::Resolved(Err(err)) => {
                drop(slot);
                return state.cont.fail(err);
            }
            Handoff::Performing => {
                *slot = Handoff::Parked(state);
                return;
            }
            Handoff::Parked(_) | Handoff::Done => return,
        }
    }
}

fn resume_all<T: Send + 'static>(mut state: Collecting<T>, result: Result<T>) {
    match result {
        Ok(value) => {
            state.values.push(value);
            collect_all(state);
        }
        Err(err) => state.cont.fail(err),
    }
}
