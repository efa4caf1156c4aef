use std::str::FromStr;
use serde::Deserialize;

/// Which executor a configured service maps onto.
///
/// - `Immediate`: run on the calling thread (tests, synchronous pipelines).
/// - `Serial`: one job at a time on a `SerialQueue`.
/// - `Pool`: tokio async tasks.
/// - `Blocking`: tokio's blocking pool, for steps that block on IO or CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Immediate,
    Serial,
    Pool,
    Blocking,
}

impl Default for ServiceKind {
    fn default() -> Self {
        ServiceKind::Pool
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(ServiceKind::Immediate),
            "serial" => Ok(ServiceKind::Serial),
            "pool" => Ok(ServiceKind::Pool),
            "blocking" => Ok(ServiceKind::Blocking),
            other => Err(format!(
                "invalid service kind: {other} (expected \"immediate\", \"serial\", \"pool\" or \"blocking\")"
            )),
        }
    }
}

/// Log verbosity accepted by [`crate::logging::init_logging`] and the
/// `[logging]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_kinds_case_insensitively() {
        assert_eq!(" Pool ".parse::<ServiceKind>(), Ok(ServiceKind::Pool));
        assert_eq!("BLOCKING".parse::<ServiceKind>(), Ok(ServiceKind::Blocking));
        assert!("threads".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn warning_is_an_alias_for_warn() {
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
    }
}
