//! `tracing` subscriber setup
//!
//! [`TracingSink`](crate::TracingSink) entries and the crate's own diagnostics
//! both go through the subscriber installed here. Output is written to stderr
//! so JSON-lines sinks can own stdout.

use logshield_core::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Subscriber output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for production (machine-readable)
    Json,
    /// Pretty format for development (human-readable)
    Pretty,
    /// Compact format for minimal output
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(CoreError::InvalidInput(format!("unknown log format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Default level directive
    pub level: String,
    /// Per-target directives (e.g., "logshield=debug,axum=warn")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        match self.filter {
            Some(ref filter) => {
                EnvFilter::try_new(filter).map_err(|e| CoreError::Config(e.to_string()))
            }
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.level))),
        }
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = config.env_filter()?;

    let installed = match config.format {
        LogFormat::Json => {
            let json_layer = tracing_fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(json_layer).try_init()
        }
        LogFormat::Pretty => {
            let pretty_layer = tracing_fmt::layer()
                .pretty()
                .with_thread_names(true)
                .with_writer(std::io::stderr)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(pretty_layer).try_init()
        }
        LogFormat::Compact => {
            let compact_layer = tracing_fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(compact_layer).try_init()
        }
    };

    installed.map_err(|e| CoreError::Config(e.to_string()))?;
    tracing::debug!(format = %config.format, "Logging system initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LogConfig::default().with_filter("logshield=notalevel");
        assert!(matches!(config.env_filter(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default().with_format(LogFormat::Compact);
        let _ = init_logging(config.clone());
        assert!(init_logging(config).is_err());
    }
}
