use std::env;
use std::str::FromStr;
use std::time::Duration;
use anyhow::{Result, anyhow};
use reqwest::Url;

use crate::domain::policy::FailurePolicy;

pub const DEFAULT_PROMETHEUS_URL: &str = "http://prometheus:9090";
pub const DEFAULT_PUSHGATEWAY_URL: &str = "http://pushgateway:9091";
pub const DEFAULT_ALERTMANAGER_URL: &str = "http://alertmanager:9093";

const DEFAULT_REQUEST_TIMEOUT_SECS: &str = "10";
const DEFAULT_PUSH_INTERVAL_SECS: &str = "15";
const DEFAULT_POLL_INTERVAL_SECS: &str = "5";
const DEFAULT_FAILURE_POLICY: &str = "continue";
const DEFAULT_FAILURE_THRESHOLD: &str = "3";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Values supplied on the command line. `None` falls through to the
/// environment, then to the built-in default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub prometheus_url: Option<String>,
    pub pushgateway_url: Option<String>,
    pub alertmanager_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub push_interval_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub failure_policy: Option<String>,
    pub failure_threshold: Option<u32>,
    pub log_level: Option<String>,
    pub log_directory: Option<String>,
}

/// Immutable run configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Metrics-query endpoint. Accepted and validated, not queried by any operation.
    pub prometheus_url: Url,
    pub pushgateway_url: Url,
    pub alertmanager_url: Url,
    pub request_timeout: Duration,
    pub push_interval: Duration,
    pub poll_interval: Duration,
    pub failure_policy: FailurePolicy,
    pub log_level: String,
    pub log_directory: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prometheus_url: Url::parse(DEFAULT_PROMETHEUS_URL).expect("default prometheus url"),
            pushgateway_url: Url::parse(DEFAULT_PUSHGATEWAY_URL).expect("default pushgateway url"),
            alertmanager_url: Url::parse(DEFAULT_ALERTMANAGER_URL).expect("default alertmanager url"),
            request_timeout: Duration::from_secs(10),
            push_interval: Duration::from_secs(15),
            poll_interval: Duration::from_secs(5),
            failure_policy: FailurePolicy::NeverAbort,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_directory: None,
        }
    }
}

impl Config {
    /// Resolves every setting as CLI value, then environment variable, then default.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let mut errors = Vec::new();

        let prometheus_url = Self::resolve_url(
            overrides.prometheus_url.as_deref(),
            "PROMETHEUS_URL",
            DEFAULT_PROMETHEUS_URL,
            &mut errors,
        );
        let pushgateway_url = Self::resolve_url(
            overrides.pushgateway_url.as_deref(),
            "PUSHGATEWAY_URL",
            DEFAULT_PUSHGATEWAY_URL,
            &mut errors,
        );
        let alertmanager_url = Self::resolve_url(
            overrides.alertmanager_url.as_deref(),
            "ALERTMANAGER_URL",
            DEFAULT_ALERTMANAGER_URL,
            &mut errors,
        );

        let request_timeout = Self::resolve_secs(
            overrides.request_timeout_secs,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
            &mut errors,
        );
        let push_interval = Self::resolve_secs(
            overrides.push_interval_secs,
            "PUSH_INTERVAL_SECS",
            DEFAULT_PUSH_INTERVAL_SECS,
            &mut errors,
        );
        let poll_interval = Self::resolve_secs(
            overrides.poll_interval_secs,
            "POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
            &mut errors,
        );

        let policy_name = match &overrides.failure_policy {
            Some(name) if !name.is_empty() => name.clone(),
            _ => Self::validate_and_get_env_var("PUSH_FAILURE_POLICY", DEFAULT_FAILURE_POLICY, false)?,
        };
        let threshold = match overrides.failure_threshold {
            Some(threshold) => threshold,
            None => {
                let raw = Self::validate_and_get_env_var(
                    "PUSH_FAILURE_THRESHOLD",
                    DEFAULT_FAILURE_THRESHOLD,
                    false,
                )?;
                u32::from_str(&raw).unwrap_or_else(|_| {
                    errors.push(format!("Invalid PUSH_FAILURE_THRESHOLD: '{raw}'"));
                    0
                })
            }
        };
        let failure_policy = FailurePolicy::from_name(&policy_name, threshold).unwrap_or_else(|e| {
            errors.push(e);
            FailurePolicy::default()
        });

        let log_level = match &overrides.log_level {
            Some(level) if !level.is_empty() => level.clone(),
            _ => Self::validate_and_get_env_var("LOG_LEVEL", DEFAULT_LOG_LEVEL, false)?,
        };
        let log_directory = match &overrides.log_directory {
            Some(dir) if !dir.is_empty() => Some(dir.clone()),
            _ => env::var("LOG_DIR").ok().filter(|dir| !dir.is_empty()),
        };

        if !errors.is_empty() {
            return Err(anyhow!("Configuration validation failed:\n{}", errors.join("\n")));
        }

        let config = Self {
            prometheus_url: prometheus_url.ok_or_else(|| anyhow!("PROMETHEUS_URL unresolved"))?,
            pushgateway_url: pushgateway_url.ok_or_else(|| anyhow!("PUSHGATEWAY_URL unresolved"))?,
            alertmanager_url: alertmanager_url.ok_or_else(|| anyhow!("ALERTMANAGER_URL unresolved"))?,
            request_timeout,
            push_interval,
            poll_interval,
            failure_policy,
            log_level,
            log_directory,
        };
        config.validate()?;

        Ok(config)
    }

    fn resolve_url(
        cli_value: Option<&str>,
        env_key: &str,
        fallback: &str,
        errors: &mut Vec<String>,
    ) -> Option<Url> {
        let raw = match cli_value {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => match Self::validate_and_get_env_var(env_key, fallback, false) {
                Ok(value) => value,
                Err(e) => {
                    errors.push(e.to_string());
                    return None;
                }
            },
        };
        match Self::parse_base_url(&raw) {
            Ok(url) => Some(url),
            Err(e) => {
                errors.push(format!("Invalid {env_key}: {e}"));
                None
            }
        }
    }

    fn resolve_secs(
        cli_value: Option<u64>,
        env_key: &str,
        fallback: &str,
        errors: &mut Vec<String>,
    ) -> Duration {
        if let Some(secs) = cli_value {
            return Duration::from_secs(secs);
        }
        let raw = Self::validate_and_get_env_var(env_key, fallback, false)
            .unwrap_or_else(|_| fallback.to_string());
        match u64::from_str(raw.trim()) {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                errors.push(format!("Invalid {env_key}: '{raw}' is not a number of seconds"));
                Duration::ZERO
            }
        }
    }

    /// Accepts `http`/`https` URLs with a host, usable as a base for path segments.
    pub fn parse_base_url(raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim()).map_err(|e| anyhow!("'{}' is not a valid URL: {}", raw, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!("'{}' must use http or https", raw));
        }
        if url.host_str().is_none() || url.cannot_be_a_base() {
            return Err(anyhow!("'{}' has no host", raw));
        }
        Ok(url)
    }

    /// Validates environment variables and provides fallback values
    pub fn validate_and_get_env_var(key: &str, fallback: &str, required: bool) -> Result<String> {
        match env::var(key) {
            Ok(value) => {
                if value.is_empty() {
                    if required {
                        return Err(anyhow!("Environment variable {} is required but empty", key));
                    }
                    Ok(fallback.to_string())
                } else {
                    Ok(value)
                }
            }
            Err(_) => {
                if required {
                    return Err(anyhow!("Required environment variable {} is not set", key));
                }
                Ok(fallback.to_string())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.request_timeout.is_zero() {
            errors.push("Request timeout must be greater than 0".to_string());
        }

        if self.push_interval.is_zero() {
            errors.push("Push interval must be greater than 0".to_string());
        }

        if self.poll_interval.is_zero() {
            errors.push("Poll interval must be greater than 0".to_string());
        }

        if !errors.is_empty() {
            return Err(anyhow!("Configuration validation failed:\n{}", errors.join("\n")));
        }

        Ok(())
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "prometheus_url": self.prometheus_url.as_str(),
            "pushgateway_url": self.pushgateway_url.as_str(),
            "alertmanager_url": self.alertmanager_url.as_str(),
            "request_timeout_secs": self.request_timeout.as_secs(),
            "push_interval_secs": self.push_interval.as_secs(),
            "poll_interval_secs": self.poll_interval.as_secs(),
            "failure_policy": self.failure_policy.to_string(),
            "log_level": self.log_level,
            "log_directory": self.log_directory,
        })
    }
}
