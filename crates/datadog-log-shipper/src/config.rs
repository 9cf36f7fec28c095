// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ShipperError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_INTAKE_URL: &str = "https://http-intake.logs.datadoghq.com";
pub const DEFAULT_INTAKE_PORT: u16 = 443;
pub const DEFAULT_BUFFER_SIZE: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 10;

/// Value of the `source` tag on every shipped event.
pub const LOG_SOURCE: &str = "rust";

/// Configuration for the log shipper.
///
/// Immutable once the shipper is started; the scheduler and every writer share it
/// behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShipperConfig {
    /// Base URL of the log intake, with or without scheme (https is assumed).
    pub intake_url: String,
    /// Port of the log intake.
    pub intake_port: u16,
    /// Datadog API key, embedded in the intake path.
    pub api_key: String,
    /// Deployment environment (e.g., prod, staging)
    pub environment: String,
    pub service_name: String,
    pub service_version: String,
    /// Commit of the running build, attached as `commit_hash` when set.
    pub commit: Option<String>,
    /// Extra tags attached to every shipped event.
    pub global_tags: BTreeMap<String, Value>,
    /// Number of buffered records that triggers a flush. Must be at least 1.
    pub buffer_size: usize,
    /// Per-request timeout in seconds. Must be at least 1.
    pub timeout_secs: u64,
    /// Seconds between periodic flushes of records still below the threshold.
    pub flush_interval_secs: u64,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            intake_url: DEFAULT_INTAKE_URL.to_string(),
            intake_port: DEFAULT_INTAKE_PORT,
            api_key: String::new(),
            environment: String::new(),
            service_name: String::new(),
            service_version: String::new(),
            commit: None,
            global_tags: BTreeMap::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl ShipperConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ShipperError> {
        let defaults = Self::default();

        let intake_url = env::var("DD_LOGS_INTAKE_URL").unwrap_or(defaults.intake_url);
        let intake_port = parse_env("DD_LOGS_INTAKE_PORT")?.unwrap_or(defaults.intake_port);
        let api_key = env::var("DD_API_KEY").unwrap_or_default();
        let environment = env::var("DD_ENV").unwrap_or_default();
        let service_name = env::var("DD_SERVICE").unwrap_or_default();
        let service_version = env::var("DD_VERSION").unwrap_or_default();
        let commit = env::var("DD_GIT_COMMIT_SHA")
            .ok()
            .filter(|sha| !sha.trim().is_empty());
        let global_tags = env::var("DD_TAGS")
            .map(|tags| parse_tags(&tags))
            .unwrap_or_default();
        let buffer_size = parse_env("DD_LOGS_BUFFER_SIZE")?.unwrap_or(defaults.buffer_size);
        let timeout_secs = parse_env("DD_LOGS_TIMEOUT")?.unwrap_or(defaults.timeout_secs);
        let flush_interval_secs =
            parse_env("DD_LOGS_FLUSH_INTERVAL")?.unwrap_or(defaults.flush_interval_secs);
        let https_proxy = env::var("DD_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();
        let log_level = env::var("DD_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            intake_url,
            intake_port,
            api_key,
            environment,
            service_name,
            service_version,
            commit,
            global_tags,
            buffer_size,
            timeout_secs,
            flush_interval_secs,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ShipperError> {
        if self.intake_url.trim().is_empty() {
            return Err(ShipperError::InvalidConfig(
                "log intake URL cannot be empty".to_string(),
            ));
        }

        if self.intake_port == 0 {
            return Err(ShipperError::InvalidConfig(
                "log intake port must be greater than 0".to_string(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(ShipperError::InvalidConfig(
                "log buffer size must be at least 1".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ShipperError::InvalidConfig(
                "log timeout must be at least 1 second".to_string(),
            ));
        }

        if self.flush_interval_secs == 0 {
            return Err(ShipperError::InvalidConfig(
                "log flush interval must be at least 1 second".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ShipperError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// Full intake URL a record is posted to: `{scheme}://{host}:{port}/v1/input/{api_key}`.
    pub fn intake_endpoint(&self) -> String {
        format!("{}/v1/input/{}", self.intake_base(), self.api_key)
    }

    /// Intake URL without the API key, safe to print in diagnostics.
    pub fn intake_base(&self) -> String {
        let host = self.intake_url.trim().trim_end_matches('/');
        if host.contains("://") {
            format!("{}:{}", host, self.intake_port)
        } else {
            format!("https://{}:{}", host, self.intake_port)
        }
    }

    /// Tags merged into every event rendered by the shipper layer.
    pub fn standard_tags(&self) -> Map<String, Value> {
        let mut tags = Map::new();
        for (key, value) in &self.global_tags {
            tags.insert(key.clone(), value.clone());
        }

        let env = Value::String(self.environment.clone());
        let service = Value::String(self.service_name.clone());
        let version = Value::String(self.service_version.clone());
        tags.insert("dd.env".to_string(), env.clone());
        tags.insert("dd.service".to_string(), service.clone());
        tags.insert("dd.version".to_string(), version.clone());
        tags.insert("env".to_string(), env);
        tags.insert("service".to_string(), service);
        tags.insert("version".to_string(), version);
        tags.insert("source".to_string(), Value::String(LOG_SOURCE.to_string()));
        if let Some(commit) = &self.commit {
            tags.insert("commit_hash".to_string(), Value::String(commit.clone()));
        }
        tags
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, ShipperError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ShipperError::InvalidConfig(format!("{name} has an invalid value '{raw}'"))
        }),
        Err(_) => Ok(None),
    }
}

/// Parses `DD_TAGS` style tags: `key:value` pairs separated by commas or spaces.
/// A tag without a value maps to an empty string.
pub fn parse_tags(raw: &str) -> BTreeMap<String, Value> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tag| !tag.is_empty())
        .map(|tag| match tag.split_once(':') {
            Some((key, value)) => (key.to_string(), Value::String(value.to_string())),
            None => (tag.to_string(), Value::String(String::new())),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: [&str; 14] = [
        "DD_LOGS_INTAKE_URL",
        "DD_LOGS_INTAKE_PORT",
        "DD_API_KEY",
        "DD_ENV",
        "DD_SERVICE",
        "DD_VERSION",
        "DD_GIT_COMMIT_SHA",
        "DD_TAGS",
        "DD_LOGS_BUFFER_SIZE",
        "DD_LOGS_TIMEOUT",
        "DD_LOGS_FLUSH_INTERVAL",
        "DD_PROXY_HTTPS",
        "HTTPS_PROXY",
        "DD_LOG_LEVEL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ShipperConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_validate_zero_buffer_size() {
        let config = ShipperConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ShipperError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = ShipperConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_port_and_url() {
        let config = ShipperConfig {
            intake_port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ShipperConfig {
            intake_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = ShipperConfig {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_intake_endpoint_shape() {
        let config = ShipperConfig {
            api_key: "abc123".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.intake_endpoint(),
            "https://http-intake.logs.datadoghq.com:443/v1/input/abc123"
        );
    }

    #[test]
    fn test_intake_endpoint_without_scheme() {
        let config = ShipperConfig {
            intake_url: "intake.example.com/".to_string(),
            intake_port: 10516,
            api_key: "key".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.intake_endpoint(),
            "https://intake.example.com:10516/v1/input/key"
        );
        assert_eq!(config.intake_base(), "https://intake.example.com:10516");
    }

    #[test]
    fn test_standard_tags() {
        let mut global_tags = BTreeMap::new();
        global_tags.insert("team".to_string(), Value::from("logs"));
        global_tags.insert("env".to_string(), Value::from("overridden"));
        let config = ShipperConfig {
            environment: "prod".to_string(),
            service_name: "checkout".to_string(),
            service_version: "1.2.3".to_string(),
            commit: Some("deadbeef".to_string()),
            global_tags,
            ..Default::default()
        };

        let tags = config.standard_tags();
        assert_eq!(tags["dd.env"], "prod");
        assert_eq!(tags["dd.service"], "checkout");
        assert_eq!(tags["dd.version"], "1.2.3");
        assert_eq!(tags["env"], "prod");
        assert_eq!(tags["source"], "rust");
        assert_eq!(tags["commit_hash"], "deadbeef");
        assert_eq!(tags["team"], "logs");
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags("team:logs, region:us-east-1 canary");
        assert_eq!(tags.len(), 3);
        assert_eq!(tags["team"], "logs");
        assert_eq!(tags["region"], "us-east-1");
        assert_eq!(tags["canary"], "");
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ShipperConfig = serde_json::from_str(
            r#"{"api_key": "k", "buffer_size": 3, "global_tags": {"shard": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.buffer_size, 3);
        assert_eq!(config.global_tags["shard"], 7);
        assert_eq!(config.intake_port, DEFAULT_INTAKE_PORT);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("DD_API_KEY", "env-key");
        env::set_var("DD_LOGS_INTAKE_URL", "http://localhost");
        env::set_var("DD_LOGS_INTAKE_PORT", "8080");
        env::set_var("DD_SERVICE", "api");
        env::set_var("DD_TAGS", "team:logs");
        env::set_var("DD_LOGS_BUFFER_SIZE", "25");
        env::set_var("DD_LOGS_TIMEOUT", "3");
        env::set_var("DD_LOG_LEVEL", "DEBUG");

        let config = ShipperConfig::from_env().unwrap();
        assert_eq!(config.intake_endpoint(), "http://localhost:8080/v1/input/env-key");
        assert_eq!(config.service_name, "api");
        assert_eq!(config.global_tags["team"], "logs");
        assert_eq!(config.buffer_size, 25);
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.log_level, "debug");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_malformed_timeout() {
        clear_env();
        env::set_var("DD_LOGS_TIMEOUT", "5s");

        let err = ShipperConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("DD_LOGS_TIMEOUT"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_flush_interval() {
        clear_env();
        env::set_var("DD_LOGS_FLUSH_INTERVAL", "30");
        let config = ShipperConfig::from_env().unwrap();
        assert_eq!(config.flush_interval(), Duration::from_secs(30));

        env::set_var("DD_LOGS_FLUSH_INTERVAL", "abc");
        let err = ShipperConfig::from_env().unwrap_err();
        assert!(matches!(err, ShipperError::InvalidConfig(_)));
        assert!(err.to_string().contains("DD_LOGS_FLUSH_INTERVAL"));

        env::set_var("DD_LOGS_FLUSH_INTERVAL", "0");
        assert!(matches!(
            ShipperConfig::from_env(),
            Err(ShipperError::InvalidConfig(_))
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_buffer_size() {
        clear_env();
        env::set_var("DD_LOGS_BUFFER_SIZE", "0");

        assert!(ShipperConfig::from_env().is_err());
        clear_env();
    }
}
