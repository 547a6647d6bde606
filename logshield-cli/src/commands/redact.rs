//! Redact command

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use logshield_core::{PrivacySanitizer, SecretFinding, SecretScanner};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::context::Context;

/// Exit status when `--strict` finds secrets
pub const SECRETS_FOUND_EXIT: u8 = 2;

#[derive(Debug, Args)]
pub struct RedactArgs {
    /// JSON file to read (stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Exit with status 2 when any secret is found
    #[arg(long)]
    pub strict: bool,

    /// Print each finding to stderr
    #[arg(long)]
    pub report: bool,
}

/// Execute the redact command
pub fn execute(ctx: &Context, args: RedactArgs) -> Result<ExitCode> {
    let raw = match args.input {
        Some(ref path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let document: Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;

    let scan = SecretScanner::scan_object(&document);
    let sanitized = PrivacySanitizer::sanitize(&scan.redacted);

    println!("{}", serde_json::to_string_pretty(&sanitized)?);

    if args.report {
        print_report(&scan.findings);
    }

    tracing::debug!(
        service = %ctx.config.service_name,
        findings = scan.findings.len(),
        "Redaction finished"
    );

    if args.strict && scan.has_secrets {
        Ok(ExitCode::from(SECRETS_FOUND_EXIT))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(findings: &[SecretFinding]) {
    if findings.is_empty() {
        eprintln!("{}", "No secrets found".green());
        return;
    }

    eprintln!("{}", format!("{} secret(s) found", findings.len()).yellow().bold());
    for finding in findings {
        let path = if finding.path.is_empty() {
            "<root>"
        } else {
            finding.path.as_str()
        };
        eprintln!(
            "  {} {} ({})",
            path.cyan(),
            finding.kind,
            finding.severity.as_str()
        );
    }
}
