//! CPU configuration loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::cpu_6502::Variant;
use crate::logging::{LogConfig, LogLevel, DEFAULT_RATE_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),
}

/// Settings for a CPU instance and the process-wide logger.
///
/// Every field is optional in JSON:
///
/// ```json
/// { "variant": "ricoh2a03", "log_level": "debug", "log_rate_limit": 200 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub variant: Variant,
    /// Global log level name, parsed with [`LogLevel::from_str`]
    pub log_level: Option<String>,
    /// Messages per second per log category
    pub log_rate_limit: usize,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Nmos,
            log_level: None,
            log_rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

impl CpuConfig {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: CpuConfig = serde_json::from_str(s)?;
        config.log_level()?;
        Ok(config)
    }

    /// The configured global level, if any.
    pub fn log_level(&self) -> Result<Option<LogLevel>, ConfigError> {
        self.log_level
            .as_deref()
            .map(|s| LogLevel::from_str(s).ok_or_else(|| ConfigError::InvalidLogLevel(s.to_string())))
            .transpose()
    }

    /// Push the logging settings into the global [`LogConfig`].
    pub fn apply_logging(&self) -> Result<(), ConfigError> {
        let config = LogConfig::global();
        if let Some(level) = self.log_level()? {
            config.set_global_level(level);
        }
        config.set_rate_limit(self.log_rate_limit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = CpuConfig::from_json("{}").unwrap();
        assert_eq!(config, CpuConfig::default());
        assert_eq!(config.log_level().unwrap(), None);
    }

    #[test]
    fn parses_all_fields() {
        let config = CpuConfig::from_json(
            r#"{ "variant": "ricoh2a03", "log_level": "Debug", "log_rate_limit": 10 }"#,
        )
        .unwrap();
        assert_eq!(config.variant, Variant::Ricoh2A03);
        assert_eq!(config.log_level().unwrap(), Some(LogLevel::Debug));
        assert_eq!(config.log_rate_limit, 10);
    }

    #[test]
    fn rejects_unknown_level() {
        let err = CpuConfig::from_json(r#"{ "log_level": "chatty" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(ref s) if s == "chatty"));
    }

    #[test]
    fn rejects_bad_json() {
        let err = CpuConfig::from_json(r#"{ "variant": "z80" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("invalid config JSON"));
    }
}
