//! Engine configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! max_depth = 64
//!
//! [trace]
//! indent_width = 4
//! emit_events = true
//! ```

use serde::{Deserialize, Serialize};

/// Root engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting of request resolutions.
    /// Exceeding it aborts the evaluation instead of exhausting the stack.
    pub max_depth: usize,

    /// Trace recorder configuration.
    pub trace: TraceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 128,
            trace: TraceConfig::default(),
        }
    }
}

/// Trace recorder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Spaces per indentation level.
    pub indent_width: usize,

    /// Mirror every trace line as a `tracing` event.
    pub emit_events: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            emit_events: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `max_depth` is zero
    /// - `trace.indent_width` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidValue(
                "max_depth must be > 0".to_string(),
            ));
        }

        if self.trace.indent_width == 0 {
            return Err(ConfigError::InvalidValue(
                "trace.indent_width must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 128);
        assert_eq!(config.trace.indent_width, 2);
        assert!(!config.trace.emit_events);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_depth_fails_validation() {
        let config = EngineConfig {
            max_depth: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("max_depth"));
    }

    #[test]
    fn test_zero_indent_fails_validation() {
        let mut config = EngineConfig::default();
        config.trace.indent_width = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("indent_width"));
    }

    #[test]
    fn test_from_toml_partial_document() {
        let config = EngineConfig::from_toml_str(
            r#"
max_depth = 16

[trace]
emit_events = true
"#,
        )
        .unwrap();
        assert_eq!(config.max_depth, 16);
        assert!(config.trace.emit_events);
        // Unset values keep their defaults.
        assert_eq!(config.trace.indent_width, 2);
    }

    #[test]
    fn test_from_toml_empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        let err = EngineConfig::from_toml_str("max_depth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_from_toml_rejects_malformed_text() {
        let err = EngineConfig::from_toml_str("max_depth = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = EngineConfig::from_toml_str("max_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
