// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::AgentError;
use metrics_core::config::Options;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

const ENV_PREFIX: &str = "PIPELINE_";
const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
const HANDLERS_VAR: &str = "HANDLERS";
const COLLECTORS_VAR: &str = "COLLECTORS";
const INTERVAL_VAR: &str = "INTERVAL_SECS";

pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HANDLERS: &str = "statsd";
const DEFAULT_COLLECTORS: &str = "database";
const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Configuration of the agent, read from `PIPELINE_*` environment variables
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// Handlers to build, in order
    pub handlers: Vec<String>,
    /// Collectors to build, in order
    pub collectors: Vec<String>,
    /// Time between two collections of the same collector
    pub interval: Duration,
    /// Options of each component, keyed by lowercase component name
    pub components: HashMap<String, Options>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            handlers: split_names(DEFAULT_HANDLERS),
            collectors: split_names(DEFAULT_COLLECTORS),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            components: HashMap::new(),
        }
    }
}

impl AgentConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_vars(env::vars())
    }

    /// Create configuration from `(name, value)` pairs shaped like environment variables.
    ///
    /// `PIPELINE_<COMPONENT>_<OPTION>=value` sets option `<option>` of component `<component>`,
    /// both lowercased: `PIPELINE_STATSD_HOST=10.0.0.1` sets `host` for `statsd`.
    pub fn from_vars<I>(vars: I) -> Result<Self, AgentError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();

        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                LOG_LEVEL_VAR => config.log_level = value.trim().to_lowercase(),
                HANDLERS_VAR => config.handlers = split_names(&value),
                COLLECTORS_VAR => config.collectors = split_names(&value),
                INTERVAL_VAR => {
                    let secs = value.trim().parse::<u64>().map_err(|_| {
                        AgentError::InvalidConfig(format!(
                            "{ENV_PREFIX}{INTERVAL_VAR} must be a number of seconds, got '{value}'"
                        ))
                    })?;
                    config.interval = Duration::from_secs(secs);
                }
                _ => match key.split_once('_') {
                    Some((component, option)) if !component.is_empty() && !option.is_empty() => {
                        config
                            .components
                            .entry(component.to_lowercase())
                            .or_default()
                            .insert(option.to_lowercase(), value);
                    }
                    _ => {}
                },
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.interval.is_zero() {
            return Err(AgentError::InvalidConfig(
                "collection interval must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(AgentError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Options of `component`, empty when none were set.
    pub fn options(&self, component: &str) -> Options {
        self.components.get(component).cloned().unwrap_or_default()
    }
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.handlers, vec!["statsd".to_string()]);
        assert_eq!(config.collectors, vec!["database".to_string()]);
        assert_eq!(config.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_from_vars() {
        let config = AgentConfig::from_vars(vars(&[
            ("PIPELINE_LOG_LEVEL", "DEBUG"),
            ("PIPELINE_HANDLERS", "statsd, "),
            ("PIPELINE_COLLECTORS", "database,Cgroup"),
            ("PIPELINE_INTERVAL_SECS", "30"),
            ("PIPELINE_STATSD_HOST", "10.0.0.1"),
            ("PIPELINE_DATABASE_URL", "http://localhost:9000"),
            ("PIPELINE_DATABASE_TIMEOUT_SECS", "3"),
            ("PATH", "/usr/bin"),
        ]))
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.handlers, vec!["statsd".to_string()]);
        assert_eq!(
            config.collectors,
            vec!["database".to_string(), "cgroup".to_string()]
        );
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(
            config.options("statsd").get("host").map(String::as_str),
            Some("10.0.0.1")
        );
        let database = config.options("database");
        assert_eq!(
            database.get("url").map(String::as_str),
            Some("http://localhost:9000")
        );
        assert_eq!(database.get("timeout_secs").map(String::as_str), Some("3"));
        assert!(config.options("cgroup").is_empty());
    }

    #[test]
    fn test_reserved_names_are_not_component_options() {
        let config = AgentConfig::from_vars(vars(&[("PIPELINE_LOG_LEVEL", "warn")])).unwrap();
        assert!(config.components.is_empty());
    }

    #[test]
    fn test_validate_invalid_interval() {
        assert!(AgentConfig::from_vars(vars(&[("PIPELINE_INTERVAL_SECS", "0")])).is_err());
        assert!(AgentConfig::from_vars(vars(&[("PIPELINE_INTERVAL_SECS", "soon")])).is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = AgentConfig {
            log_level: "invalid".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        for level in valid_levels {
            let config = AgentConfig {
                log_level: level.to_string(),
                ..Default::default()
            };
            assert!(
                config.validate().is_ok(),
                "Log level '{}' should be valid",
                level
            );
        }
    }
}
