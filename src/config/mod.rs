// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] holds the serde types (`RawFlowConfig`, sections, `FlowConfig`).
//! - [`validate`] turns a raw config into a checked `FlowConfig`.
//! - [`loader`] reads TOML from disk or from a string.

pub mod loader;
pub mod model;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use crate::errors::Result;
use crate::exec::{DelayedService, ImmediateService, Performer, PoolMode, PoolService, SerialQueue};
use crate::types::ServiceKind;

pub use loader::{from_toml_str, load_and_validate, load_from_path};
pub use model::{FlowConfig, LineConfig, LoggingConfig, RawFlowConfig, ServiceConfig};

impl ServiceConfig {
    /// Build the configured service.
    ///
    /// `pool`, `blocking` and any non-zero delay bind to the current tokio
    /// runtime and fail with `FlowError::ConfigError` outside one.
    pub fn build(&self) -> Result<Performer> {
        let base: Performer = match self.kind {
            ServiceKind::Immediate => Arc::new(ImmediateService),
            ServiceKind::Serial => Arc::new(SerialQueue::new("configured-serial")),
            ServiceKind::Pool => Arc::new(PoolService::current(PoolMode::Async)?),
            ServiceKind::Blocking => Arc::new(PoolService::current(PoolMode::Blocking)?),
        };

        match self.delay_ms {
            Some(ms) if ms > 0 => Ok(Arc::new(DelayedService::current(
                base,
                Duration::from_millis(ms),
            )?)),
            _ => Ok(base),
        }
    }
}

impl FlowConfig {
    pub fn build_service(&self) -> Result<Performer> {
        self.service.build()
    }

    /// Install the global subscriber at the configured `[logging].level`.
    pub fn init_logging(&self) -> Result<()> {
        crate::logging::init_logging(self.logging.level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FlowError;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = from_toml_str("").unwrap();
        assert_eq!(cfg.line.max_concurrent, 4);
        assert!(!cfg.line.start_suspended);
        assert_eq!(cfg.service.kind, ServiceKind::Pool);
        assert!(cfg.logging.level.is_none());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = from_toml_str("[line]\nmax_concurrent = 0\n").unwrap_err();
        assert!(matches!(err, FlowError::ConfigError(_)));
    }

    #[test]
    fn delayed_immediate_is_rejected() {
        let err = from_toml_str("[service]\nkind = \"immediate\"\ndelay_ms = 5\n").unwrap_err();
        assert!(matches!(err, FlowError::ConfigError(_)));
    }

    #[test]
    fn unknown_keys_are_a_toml_error() {
        let err = from_toml_str("[line]\nworkers = 3\n").unwrap_err();
        assert!(matches!(err, FlowError::TomlError(_)));
    }

    #[test]
    fn immediate_service_builds_without_runtime() {
        let cfg = from_toml_str("[service]\nkind = \"immediate\"\n").unwrap();
        assert!(cfg.build_service().is_ok());
    }

    #[test]
    fn pool_service_needs_runtime() {
        let cfg = from_toml_str("[service]\nkind = \"pool\"\n").unwrap();
        assert!(matches!(cfg.build_service(), Err(FlowError::ConfigError(_))));
    }
}
