// src/engine/mod.rs

//! Driving progressions.
//!
//! - [`environment`] holds the `Environment` trait (per-stage service
//!   selection plus stop/before/adjust hooks) and two stock environments.
//! - [`progress`] is the cooperative "keep going?" predicate.
//! - [`runner`] is the one stepping loop; `Progression::deferred` is a
//!   `Runner` over a `UniformEnvironment`.

pub mod environment;
pub mod progress;
pub mod runner;

pub use environment::{Environment, TokenEnvironment, UniformEnvironment};
pub use progress::Progress;
pub use runner::Runner;
