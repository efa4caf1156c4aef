// src/exec/service.rs

//! The `Service` abstraction: "run this procedure on some executor".

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

use crate::errors::FlowError;

/// A zero-argument procedure handed to a [`Service`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to a service; the "performer" used by drivers and lines.
pub type Performer = Arc<dyn Service>;

/// Trait abstracting where and when a job runs.
///
/// Implementations decide the executor (calling thread, serial queue, tokio
/// pool, a delay) but must run every accepted job at most once. A job that is
/// dropped unrun drops whatever continuations it captured, which resolves
/// them with [`FlowError::Abandoned`].
pub trait Service: Send + Sync {
    fn run(&self, job: Job);
}

impl<S: Service + ?Sized> Service for Arc<S> {
    fn run(&self, job: Job) {
        (**self).run(job)
    }
}

impl<S: Service + ?Sized> Service for Box<S> {
    fn run(&self, job: Job) {
        (**self).run(job)
    }
}

/// Run a job, containing any panic so one bad job cannot take down the
/// executor that runs it.
pub(crate) fn run_job(job: Job) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
        warn!(error = %FlowError::from_panic(payload), "service job panicked");
    }
}
