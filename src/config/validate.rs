// src/config/validate.rs

use crate::config::model::{FlowConfig, RawFlowConfig};
use crate::errors::{FlowError, Result};
use crate::types::ServiceKind;

/// Longest per-job delay accepted from config (one hour).
const MAX_DELAY_MS: u64 = 60 * 60 * 1000;

impl TryFrom<RawFlowConfig> for FlowConfig {
    type Error = FlowError;

    fn try_from(raw: RawFlowConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(FlowConfig::new_unchecked(raw.line, raw.service, raw.logging))
    }
}

fn validate_raw_config(cfg: &RawFlowConfig) -> Result<()> {
    validate_line(cfg)?;
    validate_service(cfg)?;
    Ok(())
}

fn validate_line(cfg: &RawFlowConfig) -> Result<()> {
    if cfg.line.max_concurrent == 0 {
        return Err(FlowError::ConfigError(
            "[line].max_concurrent must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_service(cfg: &RawFlowConfig) -> Result<()> {
    let Some(delay) = cfg.service.delay_ms else {
        return Ok(());
    };

    if delay > MAX_DELAY_MS {
        return Err(FlowError::ConfigError(format!(
            "[service].delay_ms must be <= {MAX_DELAY_MS} (got {delay})"
        )));
    }

    // Delays are driven by the tokio timer, which an immediate service never
    // touches; the combination would silently require a runtime.
    if delay > 0 && cfg.service.kind == ServiceKind::Immediate {
        return Err(FlowError::ConfigError(
            "[service].delay_ms cannot be combined with kind = \"immediate\"".to_string(),
        ));
    }

    Ok(())
}
