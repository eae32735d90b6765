//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::DispatcherConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<DispatcherConfig, ConfigError> {
    let config: DispatcherConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DispatcherConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [connection]
            max_idle_per_host = 8
            idle_timeout_secs = 15

            [passthrough]
            headers = ["x-request-id", "traceparent"]
            prefixes = []

            [observability]
            log_level = "debug"
            metrics_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.max_idle_per_host, 8);
        assert_eq!(config.passthrough.headers.len(), 2);
        assert!(config.passthrough.prefixes.is_empty());
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = parse_config("[timeouts]\nconnect_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("timeouts.connect_secs"));
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let err = parse_config("[timeouts\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/event-dispatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
