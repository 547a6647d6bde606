//! Logger configuration
//!
//! Read once when the logger is constructed. Missing values fall back to
//! defaults; only [`LoggerConfig::load`] with a malformed file can fail.

use config::{Config as ConfigLoader, ConfigError, File};
use logshield_core::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::level::Level;

pub const DEFAULT_SERVICE_NAME: &str = "unknown-service";
pub const DEFAULT_ENV: &str = "development";
pub const DEFAULT_RELEASE_VERSION: &str = "unknown";

/// Environment variables consulted for each field, first match wins
const SERVICE_NAME_VARS: &[&str] = &["SERVICE_NAME"];
const ENV_VARS: &[&str] = &["APP_ENV", "NODE_ENV"];
const RELEASE_VERSION_VARS: &[&str] = &["RELEASE_VERSION", "GIT_SHA"];
const LOG_LEVEL_VARS: &[&str] = &["LOG_LEVEL"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub service_name: String,
    pub env: String,
    pub release_version: String,
    pub log_level: Level,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            env: DEFAULT_ENV.to_string(),
            release_version: DEFAULT_RELEASE_VERSION.to_string(),
            log_level: Level::Info,
        }
    }
}

/// File/env shape before level parsing
#[derive(Debug, Deserialize)]
struct RawLoggerConfig {
    service_name: String,
    env: String,
    release_version: String,
    log_level: String,
}

impl LoggerConfig {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: first_of(&lookup, SERVICE_NAME_VARS).unwrap_or(defaults.service_name),
            env: first_of(&lookup, ENV_VARS).unwrap_or(defaults.env),
            release_version: first_of(&lookup, RELEASE_VERSION_VARS)
                .unwrap_or(defaults.release_version),
            log_level: first_of(&lookup, LOG_LEVEL_VARS)
                .map(|level| Level::parse_or_default(&level))
                .unwrap_or(defaults.log_level),
        }
    }

    /// Layered load: defaults, then the optional config file, then the
    /// environment variables read by [`from_env`](Self::from_env).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = build_layers(path, &lookup).map_err(|e| CoreError::Config(e.to_string()))?;

        Ok(Self {
            service_name: raw.service_name,
            env: raw.env,
            release_version: raw.release_version,
            log_level: Level::parse_or_default(&raw.log_level),
        })
    }

    pub fn is_development(&self) -> bool {
        self.env == "development"
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    pub fn with_release_version(mut self, release_version: impl Into<String>) -> Self {
        self.release_version = release_version.into();
        self
    }

    pub fn with_log_level(mut self, log_level: Level) -> Self {
        self.log_level = log_level;
        self
    }
}

fn first_of(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
}

fn build_layers(
    path: Option<&Path>,
    lookup: &impl Fn(&str) -> Option<String>,
) -> std::result::Result<RawLoggerConfig, ConfigError> {
    let mut builder = ConfigLoader::builder()
        .set_default("service_name", DEFAULT_SERVICE_NAME)?
        .set_default("env", DEFAULT_ENV)?
        .set_default("release_version", DEFAULT_RELEASE_VERSION)?
        .set_default("log_level", Level::Info.as_str())?;

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .set_override_option("service_name", first_of(lookup, SERVICE_NAME_VARS))?
        .set_override_option("env", first_of(lookup, ENV_VARS))?
        .set_override_option("release_version", first_of(lookup, RELEASE_VERSION_VARS))?
        .set_override_option("log_level", first_of(lookup, LOG_LEVEL_VARS))?
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LoggerConfig::default());
        assert_eq!(config.service_name, "unknown-service");
        assert_eq!(config.env, "development");
        assert_eq!(config.release_version, "unknown");
        assert_eq!(config.log_level, Level::Info);
        assert!(config.is_development());
    }

    #[test]
    fn test_from_lookup_with_fallback_vars() {
        let config = LoggerConfig::from_lookup(lookup(&[
            ("SERVICE_NAME", "landing"),
            ("NODE_ENV", "production"),
            ("GIT_SHA", "abc123"),
            ("LOG_LEVEL", "debug"),
        ]));

        assert_eq!(config.service_name, "landing");
        assert_eq!(config.env, "production");
        assert_eq!(config.release_version, "abc123");
        assert_eq!(config.log_level, Level::Debug);
        assert!(config.is_production());
    }

    #[test]
    fn test_primary_var_wins_over_fallback() {
        let config = LoggerConfig::from_lookup(lookup(&[
            ("APP_ENV", "staging"),
            ("NODE_ENV", "production"),
            ("RELEASE_VERSION", "1.2.3"),
            ("GIT_SHA", "abc123"),
        ]));

        assert_eq!(config.env, "staging");
        assert_eq!(config.release_version, "1.2.3");
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let config = LoggerConfig::from_lookup(lookup(&[("LOG_LEVEL", "loud")]));
        assert_eq!(config.log_level, Level::Info);
    }

    #[test]
    fn test_load_without_file() {
        let config = LoggerConfig::load_with(None, lookup(&[("SERVICE_NAME", "svc")])).unwrap();
        assert_eq!(config.service_name, "svc");
        assert_eq!(config.env, "development");
    }

    #[test]
    fn test_load_file_then_env() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "service_name = \"from-file\"\nenv = \"production\"\nlog_level = \"warn\""
        )
        .unwrap();

        let config =
            LoggerConfig::load_with(Some(file.path()), lookup(&[("LOG_LEVEL", "error")])).unwrap();

        assert_eq!(config.service_name, "from-file");
        assert_eq!(config.env, "production");
        assert_eq!(config.release_version, "unknown");
        assert_eq!(config.log_level, Level::Error);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let result = LoggerConfig::load_with(Some(Path::new("/nonexistent/logshield.toml")), lookup(&[]));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
