//! Emit command

use anyhow::{Context as _, Result};
use clap::Args;
use logshield_logger::{Level, Value};
use std::process::ExitCode;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct EmitArgs {
    /// Level to log at (debug, info, warn, error, fatal)
    #[arg(short, long, default_value = "info")]
    pub level: Level,

    /// Log message
    #[arg(short, long)]
    pub message: String,

    /// Metadata as a JSON value
    #[arg(long)]
    pub meta: Option<String>,

    /// Attach an error with this message
    #[arg(long)]
    pub error: Option<String>,
}

/// Execute the emit command
pub async fn execute(ctx: &Context, args: EmitArgs) -> Result<ExitCode> {
    let meta: Value = match args.meta {
        Some(ref raw) => serde_json::from_str(raw).context("--meta is not valid JSON")?,
        None => Value::Null,
    };
    let error = args.error.map(std::io::Error::other);

    let logger = ctx.logger.clone();
    let traces = logger.traces().clone();

    let code = traces
        .scope(async move {
            let error = error.as_ref().map(|e| e as &dyn std::error::Error);
            match args.level {
                Level::Fatal => {
                    let fatal = logger.fatal_at(None, &args.message, meta, error);
                    ExitCode::from(fatal.exit_code as u8)
                }
                level => {
                    if !logger.log_at(level, None, &args.message, meta, error) {
                        tracing::debug!(%level, "Entry below configured threshold");
                    }
                    ExitCode::SUCCESS
                }
            }
        })
        .await;

    Ok(code)
}
