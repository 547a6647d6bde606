//! Check command

use anyhow::Result;
use clap::Args;
use logshield_core::{PrivacySanitizer, SecretKind, SecretScanner};
use std::process::ExitCode;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Text to scan
    pub text: String,
}

/// Execute the check command
pub fn execute(_ctx: &Context, args: CheckArgs) -> Result<ExitCode> {
    let scan = SecretScanner::scan_string(&args.text);
    let sanitized = PrivacySanitizer::sanitize_str(&scan.redacted_text);

    println!("{}", sanitized);
    println!("has_secrets: {}", scan.has_secrets);
    if !scan.kinds.is_empty() {
        println!("kinds: {}", join_kinds(&scan.kinds));
    }

    Ok(ExitCode::SUCCESS)
}

fn join_kinds(kinds: &[SecretKind]) -> String {
    kinds
        .iter()
        .map(SecretKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_kinds() {
        assert_eq!(
            join_kinds(&[SecretKind::ApiKey, SecretKind::Jwt]),
            "api_key, jwt"
        );
        assert_eq!(join_kinds(&[]), "");
    }
}
