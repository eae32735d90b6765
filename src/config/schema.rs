//! Configuration schema definitions.
//!
//! This module defines every tunable of the dispatcher. All types derive
//! Serde traits for deserialization from config files, and every section
//! falls back to its `Default` so minimal files stay valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Connection pool settings for the shared HTTP client.
    pub connection: ConnectionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Size limits applied to responses.
    pub limits: LimitsConfig,

    /// Which response headers travel to the next hop.
    pub passthrough: PassthroughConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum idle connections kept per target host.
    pub max_idle_per_host: usize,

    /// How long an idle pooled connection is kept, in seconds.
    pub idle_timeout_secs: u64,

    /// Honor proxy settings from the environment.
    pub use_system_proxy: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 100,
            idle_timeout_secs: 90,
            use_system_proxy: true,
        }
    }
}

/// Timeout configuration for a single exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Response size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum response body read from a target, in bytes.
    pub max_response_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_response_body_bytes: 4 * 1024 * 1024, // 4MB
        }
    }
}

/// Passthrough header policy.
///
/// Names and prefixes are compared against lowercased header names, so they
/// must be lowercase themselves.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PassthroughConfig {
    /// Header names forwarded verbatim.
    pub headers: Vec<String>,

    /// Header name prefixes forwarded verbatim.
    pub prefixes: Vec<String>,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            headers: vec!["x-request-id".to_string()],
            // ce- headers are deliberately absent: they belong to the event
            // itself and would be duplicated on replies.
            prefixes: vec!["knative-".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record exchange counters and latency histograms.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::default();
        assert_eq!(config.connection.max_idle_per_host, 100);
        assert_eq!(config.timeouts.request(), Duration::from_secs(30));
        assert_eq!(config.passthrough.headers, vec!["x-request-id"]);
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: DispatcherConfig = toml::from_str(
            r#"
            [timeouts]
            request_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.timeouts.request_secs, 3);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.limits.max_response_body_bytes, 4 * 1024 * 1024);
    }
}
