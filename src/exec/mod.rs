// src/exec/mod.rs

//! Execution layer: where jobs run.
//!
//! Nothing in this crate spawns threads directly; drivers and lines hand jobs
//! to an injected [`Service`].
//!
//! - [`service`] defines the `Service` trait, `Job` and `Performer`.
//! - [`immediate`] runs jobs on the calling thread (tests, sync pipelines).
//! - [`serial`] is the one-at-a-time `SerialQueue` with suspend/resume.
//! - [`pool`] hands jobs to a tokio runtime, optionally after a delay.
//! - [`main_loop`] funnels jobs to a single designated consumer loop.

pub mod immediate;
pub mod main_loop;
pub mod pool;
pub mod serial;
pub mod service;

pub use immediate::ImmediateService;
pub use main_loop::{MainLoop, MainService, main_loop};
pub use pool::{DelayedService, PoolMode, PoolService};
pub use serial::SerialQueue;
pub use service::{Job, Performer, Service};
