// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{FlowConfig, RawFlowConfig};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated `RawFlowConfig`.
///
/// Use [`load_and_validate`] for the checked form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawFlowConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawFlowConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<FlowConfig> {
    let raw_config = load_from_path(&path)?;
    let config = FlowConfig::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate configuration held in memory.
pub fn from_toml_str(contents: &str) -> Result<FlowConfig> {
    let raw: RawFlowConfig = toml::from_str(contents)?;
    FlowConfig::try_from(raw)
}
