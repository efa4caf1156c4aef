// src/line/mod.rs

//! Bounded-concurrency scheduling.
//!
//! The pure bookkeeping lives in [`core`]; the serialized async shell that
//! launches items and delivers results is [`production_line`].

pub mod core;
pub mod production_line;

pub use self::core::{Completed, ItemId, ItemLocation, LineCore, LineSnapshot, Rejected};
pub use production_line::ProductionLine;
