//! # Verify Subcommand
//!
//! Submits a receipt to the configured verifier and prints the per-term
//! results followed by the overall verdict. Exits with status 2 when the
//! receipt did not verify.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use mcred_client::IssuerClient;
use mcred_core::verification::OVERALL_KEY;
use mcred_core::{VerificationReport, VerificationResult};
use mcred_verify::JourneyVerifier;

use crate::config::CliConfig;

/// Arguments for the `mcred verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Receipt file (term or journey).
    #[arg(long)]
    pub receipt: PathBuf,
}

pub async fn run_verify(args: &VerifyArgs, config: &CliConfig) -> Result<u8> {
    let receipt = crate::read_document(&args.receipt)?.into_journey();
    let client = IssuerClient::new(config.issuer_api()?)?;
    let verifier = JourneyVerifier::new(Arc::new(client.verifier().clone()));

    let report = verifier.verify(&receipt).await?;
    print!("{}", render(&report));

    let verified = report.get(OVERALL_KEY).is_some_and(|r| r.verified);
    Ok(if verified { 0 } else { 2 })
}

fn render(report: &VerificationReport) -> String {
    let mut out = String::new();
    for (scope, result) in report.iter().filter(|(k, _)| k.as_str() != OVERALL_KEY) {
        out.push_str(&format!("Term {scope}: {}\n", line(result)));
        if let Some(tx) = &result.blockchain_tx_hash {
            let block = result
                .blockchain_block
                .map(|b| format!(" (block {b})"))
                .unwrap_or_default();
            out.push_str(&format!("  Anchored in {tx}{block}\n"));
        }
    }
    if let Some(overall) = report.get(OVERALL_KEY) {
        let verdict = if overall.verified { "VERIFIED" } else { "NOT VERIFIED" };
        out.push_str(&format!("{verdict}: {}\n", line(overall)));
    }
    out
}

fn line(result: &VerificationResult) -> String {
    if let Some(error) = &result.error {
        return format!("{} ({error})", result.status);
    }
    let chain = if result.blockchain_verified {
        "root on chain"
    } else {
        "root not on chain"
    };
    let detail = result
        .details
        .clone()
        .unwrap_or_else(|| {
            format!(
                "{} verified, {} failed",
                result.courses_verified, result.courses_failed
            )
        });
    format!("{}, {detail}, {chain}", result.status)
}
