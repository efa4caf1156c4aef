// src/exec/pool.rs

//! Tokio-backed services: a worker pool and a delayed variant.

use std::time::Duration;

use tokio::runtime::Handle;
use tracing::trace;

use crate::errors::{FlowError, Result};

use super::service::{Job, Performer, Service, run_job};

/// Which tokio facility a [`PoolService`] hands jobs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMode {
    /// `Handle::spawn`: for short, non-blocking steps.
    Async,
    /// `Handle::spawn_blocking`: for steps that block on IO or CPU.
    Blocking,
}

/// Runs jobs concurrently on a tokio runtime.
#[derive(Debug, Clone)]
pub struct PoolService {
    handle: Handle,
    mode: PoolMode,
}

impl PoolService {
    pub fn new(handle: Handle, mode: PoolMode) -> Self {
        Self { handle, mode }
    }

    /// Bind to the runtime the caller is running inside.
    pub fn current(mode: PoolMode) -> Result<Self> {
        let handle = current_handle()?;
        Ok(Self::new(handle, mode))
    }

    pub fn mode(&self) -> PoolMode {
        self.mode
    }
}

impl Service for PoolService {
    fn run(&self, job: Job) {
        match self.mode {
            PoolMode::Async => {
                self.handle.spawn(async move { run_job(job) });
            }
            PoolMode::Blocking => {
                self.handle.spawn_blocking(move || run_job(job));
            }
        }
    }
}

/// Hands each job to an inner service once `delay` has elapsed.
#[derive(Clone)]
pub struct DelayedService {
    inner: Performer,
    delay: Duration,
    handle: Handle,
}

impl std::fmt::Debug for DelayedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedService")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl DelayedService {
    pub fn new(inner: Performer, delay: Duration, handle: Handle) -> Self {
        Self {
            inner,
            delay,
            handle,
        }
    }

    pub fn current(inner: Performer, delay: Duration) -> Result<Self> {
        Ok(Self::new(inner, delay, current_handle()?))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Service for DelayedService {
    fn run(&self, job: Job) {
        let inner = Performer::clone(&self.inner);
        let delay = self.delay;
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(?delay, "delay elapsed; forwarding job");
            inner.run(job);
        });
    }
}

fn current_handle() -> Result<Handle> {
    Handle::try_current()
        .map_err(|e| FlowError::ConfigError(format!("no tokio runtime available: {e}")))
}
