//! CLI execution context

use anyhow::{Context as _, Result};
use logshield_core::describe_secret_metrics;
use logshield_logger::{
    init_logging, install_process_hooks, sink_for_environment, LogConfig, Logger, LoggerConfig,
};
use std::sync::Arc;

use crate::Cli;

/// Execution context for CLI commands
pub struct Context {
    /// Configuration the logger was built from
    pub config: LoggerConfig,

    /// Shared logger, also owned by the panic hook
    pub logger: Arc<Logger>,
}

impl Context {
    /// Load configuration and wire the logger for the configured environment
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = LoggerConfig::load(cli.config.as_deref())
            .context("Failed to load logger configuration")?;

        init_logging(
            LogConfig::default()
                .with_format(cli.log_format)
                .with_level(config.log_level.severity().as_str()),
        )
        .context("Failed to initialize logging")?;
        describe_secret_metrics();

        let sink = sink_for_environment(&config.env, &cli.log_dir)
            .with_context(|| format!("Failed to open log sink in {}", cli.log_dir.display()))?;

        let logger = Arc::new(Logger::builder(config.clone()).sink(sink).build());
        install_process_hooks(logger.clone());

        tracing::debug!(
            service = %config.service_name,
            env = %config.env,
            level = %config.log_level,
            "Logger ready"
        );

        Ok(Self { config, logger })
    }
}
