// src/lib.rs

//! Minimal asynchronous execution runtime.
//!
//! - [`deferred`]: continuation-passing future/promise (`Deferred`, `Promise`).
//! - [`exec`]: the `Service` abstraction and its executors.
//! - [`stage`]: value-typed workflow state machines (`Progression`),
//!   composition and strict sequencing (`Serial`).
//! - [`engine`]: `Environment` hooks and the `Runner` that drives workflows.
//! - [`line`]: the bounded-concurrency `ProductionLine`.
//! - [`config`], [`logging`], [`errors`]: the ambient pieces.

pub mod config;
pub mod deferred;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod line;
pub mod logging;
pub mod stage;
pub mod types;

pub use deferred::{Continuation, Deferred, Promise};
pub use engine::{Environment, Progress, Runner, TokenEnvironment, UniformEnvironment};
pub use errors::{FlowError, Result};
pub use exec::{Performer, Service};
pub use line::ProductionLine;
pub use stage::{Progression, Serial, Serially, State, Update, compose, serially};
