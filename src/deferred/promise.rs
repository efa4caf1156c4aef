// src/deferred/promise.rs

//! Write end of a pending [`Deferred`].
//!
//! The promise and its deferred share one slot. Whichever side arrives second
//! (the `resolve` call or the `perform` call) delivers the result, outside the
//! slot lock.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::deferred::{Continuation, Deferred};
use crate::errors::{FlowError, Result};

enum Slot<T> {
    Empty,
    Waiting(Continuation<T>),
    Resolved(Result<T>),
    Delivered,
}

type Shared<T> = Arc<Mutex<Slot<T>>>;

fn lock<T>(shared: &Shared<T>) -> MutexGuard<'_, Slot<T>> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resolves the paired [`Deferred`] exactly once.
///
/// Dropping an unresolved promise resolves its deferred with
/// [`FlowError::Abandoned`].
pub struct Promise<T> {
    shared: Option<Shared<T>>,
}

pub(crate) fn pair<T: Send + 'static>() -> (Promise<T>, Deferred<T>) {
    let shared: Shared<T> = Arc::new(Mutex::new(Slot::Empty));
    let reader = Arc::clone(&shared);

    let deferred = Deferred::future(move |cont: Continuation<T>| {
        let mut slot = lock(&reader);
        match std::mem::replace(&mut *slot, Slot::Delivered) {
            Slot::Empty => *slot = Slot::Waiting(cont),
            Slot::Resolved(result) => {
                drop(slot);
                cont.resume(result);
            }
            // A deferred is performed at most once, so nothing is waiting yet.
            Slot::Waiting(_) | Slot::Delivered => {
                drop(slot);
                cont.fail(FlowError::Abandoned);
            }
        }
    });

    (
        Promise {
            shared: Some(shared),
        },
        deferred,
    )
}

impl<T> Promise<T> {
    pub fn resolve(mut self, result: Result<T>) {
        if let Some(shared) = self.shared.take() {
            deliver(&shared, result);
        }
    }

    pub fn succeed(self, value: T) {
        self.resolve(Ok(value));
    }

    pub fn fail(self, err: FlowError) {
        self.resolve(Err(err));
    }
}

fn deliver<T>(shared: &Shared<T>, result: Result<T>) {
    let mut slot = lock(shared);
    match std::mem::replace(&mut *slot, Slot::Delivered) {
        Slot::Empty => *slot = Slot::Resolved(result),
        Slot::Waiting(cont) => {
            drop(slot);
            cont.resume(result);
        }
        other => *slot = other,
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            deliver(&shared, Err(FlowError::Abandoned));
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.shared.is_none())
            .finish()
    }
}
