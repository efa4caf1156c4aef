// src/config/model.rs

use serde::Deserialize;

use crate::types::{LogLevel, ServiceKind};

/// Runtime configuration as read from TOML, before validation.
///
/// ```toml
/// [line]
/// max_concurrent = 4
/// start_suspended = false
///
/// [service]
/// kind = "pool"
/// delay_ms = 0
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFlowConfig {
    #[serde(default)]
    pub line: LineConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[line]` section: production line sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineConfig {
    /// Maximum number of items running at once. Must be >= 1.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Create the line suspended; nothing starts until `resume`.
    #[serde(default)]
    pub start_suspended: bool,
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            start_suspended: false,
        }
    }
}

/// `[service]` section: which executor runs steps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default)]
    pub kind: ServiceKind,

    /// When > 0, every job is delayed by this many milliseconds.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// Validated configuration. Construct through `TryFrom<RawFlowConfig>` or the
/// loader functions.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub line: LineConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

impl FlowConfig {
    pub(crate) fn new_unchecked(
        line: LineConfig,
        service: ServiceConfig,
        logging: LoggingConfig,
    ) -> Self {
        Self {
            line,
            service,
            logging,
        }
    }
}
