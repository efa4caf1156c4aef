// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    /// The environment's `should_stop` hook asked the run to stop.
    #[error("stopped by environment")]
    Stopped,

    /// A progress predicate returned false, or queued work was cleared.
    #[error("cancelled")]
    Cancelled,

    /// A continuation was dropped without ever being resumed.
    #[error("continuation dropped without a result")]
    Abandoned,

    #[error("panicked during transition: {0}")]
    Panicked(String),

    #[error("invalid capacity: {0} (must be greater than zero)")]
    InvalidCapacity(usize),

    #[error("production line is closed")]
    Closed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlowError {
    /// Convenience for progressions that fail with a plain message.
    pub fn failure(msg: impl std::fmt::Display) -> Self {
        FlowError::Other(anyhow::anyhow!("{msg}"))
    }

    /// True for the two cooperative-cancellation variants.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FlowError::Stopped | FlowError::Cancelled)
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        FlowError::Panicked(msg)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowError>;
