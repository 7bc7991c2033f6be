use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Evaluator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Per-attempt HTTP timeout
    pub request_timeout_ms: u64,
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Base delay for linear backoff
    pub retry_delay_ms: u64,
    /// Serialized response bodies above this many characters are truncated
    pub max_body_chars: usize,
    pub user_agent: String,
    pub accept: String,
    /// Inclusion probability for optional object properties
    pub optional_field_probability: f64,
    /// Recursion bound for schema generation; deeper levels yield null
    pub max_schema_depth: usize,
    pub log_level: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            max_retries: 2,
            retry_delay_ms: 1_000,
            max_body_chars: 10_000,
            user_agent: "REST-API-Evaluator/1.0".to_string(),
            accept: "application/json".to_string(),
            optional_field_probability: 0.7,
            max_schema_depth: 8,
            log_level: "info".to_string(),
        }
    }
}

impl EvaluatorConfig {
    /// Load a JSON config file; absent fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EvaluatorConfig =
            serde_json::from_str(r#"{"max_retries": 5, "log_level": "debug"}"#).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.max_body_chars, 10_000);
    }

    #[test]
    fn from_file_reads_json() {
        let path = std::env::temp_dir().join(format!("evaluator-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"retry_delay_ms": 250}"#).unwrap();
        let config = EvaluatorConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
    }

    #[test]
    fn oversized_durations_saturate() {
        let config = EvaluatorConfig::default()
            .with_retry_delay(Duration::MAX)
            .with_request_timeout(Duration::MAX);
        assert_eq!(config.retry_delay_ms, u64::MAX);
        assert_eq!(config.request_timeout_ms, u64::MAX);
    }
}
