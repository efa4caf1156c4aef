// src/engine/environment.rs

//! Pluggable scheduling context with cooperative hooks.

use tokio_util::sync::CancellationToken;

use crate::exec::Performer;

/// Maps each stage about to run onto a service, and lets the caller observe
/// or veto steps.
///
/// Each step is submitted to `service`. Once the job runs there, the hooks
/// are called in order (`should_stop`, `before`, `adjust`) and the adjusted
/// stage performs its transition.
pub trait Environment<P>: Send + Sync + 'static {
    /// Executor for this particular stage.
    fn service(&self, stage: &P) -> Performer;

    /// Returning true ends the run with `FlowError::Stopped` without running
    /// the stage.
    fn should_stop(&self, _stage: &P) -> bool {
        false
    }

    /// Instrumentation hook, called after the stop check.
    fn before(&self, _stage: &P) {}

    /// Rewrite the stage about to run.
    fn adjust(&self, stage: P) -> P {
        stage
    }
}

/// Every stage on one performer, no hooks.
#[derive(Clone)]
pub struct UniformEnvironment {
    performer: Performer,
}

impl UniformEnvironment {
    pub fn new(performer: Performer) -> Self {
        Self { performer }
    }
}

impl std::fmt::Debug for UniformEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformEnvironment").finish_non_exhaustive()
    }
}

impl<P> Environment<P> for UniformEnvironment {
    fn service(&self, _stage: &P) -> Performer {
        Performer::clone(&self.performer)
    }
}

/// Wraps an environment so that cancelling `token` stops every run using it
/// at the next step boundary.
#[derive(Debug, Clone)]
pub struct TokenEnvironment<E> {
    inner: E,
    token: CancellationToken,
}

impl<E> TokenEnvironment<E> {
    pub fn new(inner: E, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<P, E: Environment<P>> Environment<P> for TokenEnvironment<E> {
    fn service(&self, stage: &P) -> Performer {
        self.inner.service(stage)
    }

    fn should_stop(&self, stage: &P) -> bool {
        self.token.is_cancelled() || self.inner.should_stop(stage)
    }

    fn before(&self, stage: &P) {
        self.inner.before(stage)
    }

    fn adjust(&self, stage: P) -> P {
        self.inner.adjust(stage)
    }
}
