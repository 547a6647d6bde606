//! LogShield command-line interface
//!
//! Composition root for the logger: loads configuration, installs the
//! `tracing` subscriber and process hooks, then runs one subcommand.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use logshield_logger::LogFormat;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod context;

use commands::{check, emit, redact};
use context::Context;

#[derive(Debug, Parser)]
#[command(name = "logshield", version, about = "Redact secrets and PII, emit structured logs")]
pub struct Cli {
    /// Logger configuration file (toml, yaml or json)
    #[arg(short, long, global = true, env = "LOGSHIELD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Format of internal diagnostics on stderr
    #[arg(long, global = true, default_value = "compact")]
    pub log_format: LogFormat,

    /// Directory for rotated log files in production
    #[arg(long, global = true, env = "LOGSHIELD_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Redact secrets and PII from a JSON document
    Redact(redact::RedactArgs),

    /// Scan a single string and print its redacted form
    Check(check::CheckArgs),

    /// Log one entry through the full pipeline
    Emit(emit::EmitArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Redact(args) => redact::execute(&ctx, args),
        Commands::Check(args) => check::execute(&ctx, args),
        Commands::Emit(args) => emit::execute(&ctx, args).await,
    }
}
