//! # Publish Subcommand
//!
//! Anchors a term's root commitment on the ledger registry. The root and
//! student count come from the issuer backend; signing is delegated to
//! the node that holds the publisher account (`MCRED_PUBLISHER_ADDRESS`).
//!
//! Ctrl-C while confirming abandons the local wait. The transaction
//! itself may still be included, so it is written to the state file
//! (`publish.state_file`, `MCRED_STATE_FILE`) and reconciled by the next
//! run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use mcred_anchor::{EvmLedgerClient, RpcSigningIdentity};
use mcred_client::IssuerClient;
use mcred_core::{SigningIdentity, TermId};
use mcred_state::{
    AbortHandle, AttemptSnapshot, ProgressSink, PublicationOutcome, PublicationPhase,
    PublicationWorkflow, PublishRequest,
};

use crate::config::CliConfig;
use crate::state::{load_registry, save_registry};
use crate::units::format_ether;

/// Arguments for the `mcred publish` subcommand.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Term whose root to publish.
    #[arg(long)]
    pub term: String,

    /// Seconds to wait for inclusion before giving up the local wait.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Prints each phase as the workflow reaches it.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&self, snapshot: &AttemptSnapshot) {
        println!("  {}", progress_line(snapshot));
    }
}

fn progress_line(snapshot: &AttemptSnapshot) -> String {
    match (snapshot.phase, &snapshot.estimate, &snapshot.tx_hash) {
        (PublicationPhase::Simulating, Some(estimate), _) => format!(
            "{}: estimated gas {} at {} wei, up to {} ETH",
            snapshot.phase,
            estimate.gas_limit,
            estimate.gas_price,
            format_ether(estimate.max_cost)
        ),
        (PublicationPhase::Confirming, _, Some(hash)) => {
            format!("{}: waiting for {hash}", snapshot.phase)
        }
        (phase, _, _) => phase.to_string(),
    }
}

pub async fn run_publish(args: &PublishArgs, config: &CliConfig) -> Result<u8> {
    let term_id = TermId::new(args.term.as_str())
        .with_context(|| format!("invalid term {:?}", args.term))?;

    let ledger_config = config.ledger()?;
    let signer = match ledger_config.publisher {
        Some(address) => Some(
            RpcSigningIdentity::new(
                &ledger_config.rpc_url,
                address,
                Duration::from_secs(ledger_config.timeout_secs),
            )
            .context("failed to set up the publisher signer")?,
        ),
        None => None,
    };
    let ledger = EvmLedgerClient::new(ledger_config).context("failed to set up the ledger client")?;
    let issuer = IssuerClient::new(config.issuer_api()?)?;

    let mut workflow_config = config.workflow;
    if let Some(secs) = args.timeout_secs {
        workflow_config.confirmation_timeout = Duration::from_secs(secs);
    }
    let state_file = config.state_file();
    let registry = load_registry(&state_file)?;
    let workflow = PublicationWorkflow::new(
        Arc::new(issuer.term_roots().clone()),
        Arc::new(ledger),
        Arc::new(issuer.records().clone()),
        registry.clone(),
        workflow_config,
    );

    let abort = AbortHandle::new();
    let on_interrupt = abort.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; abandoning the confirmation wait");
            on_interrupt.abort();
        }
    });

    println!("Publishing root for term {term_id}");
    let outcome = workflow
        .publish(
            PublishRequest::new(term_id),
            signer.as_ref().map(|s| s as &dyn SigningIdentity),
            &ConsoleProgress,
            Some(&abort),
        )
        .await;
    interrupt.abort();
    save_registry(&state_file, &registry)?;

    let outcome = outcome?;
    print!("{}", render_outcome(&outcome));
    Ok(if outcome.succeeded() { 0 } else { 1 })
}

fn render_outcome(outcome: &PublicationOutcome) -> String {
    let attempt = &outcome.attempt;
    let mut out = String::new();
    if outcome.succeeded() {
        out.push_str(&format!("OK: root for term {} published\n", attempt.term_id));
    } else {
        let reason = attempt
            .error
            .as_ref()
            .map(|e| format!("{}: {}", e.kind, e.message))
            .unwrap_or_else(|| "unknown failure".to_string());
        out.push_str(&format!("FAILED: {reason}\n"));
    }
    if let Some(root) = &attempt.verkle_root {
        out.push_str(&format!("  Root: {root}\n"));
    }
    if let Some(hash) = &attempt.tx_hash {
        out.push_str(&format!("  Transaction: {hash}\n"));
    }
    if let Some(block) = attempt.block_number {
        out.push_str(&format!("  Block: {block}\n"));
    }
    if let Some(gas) = attempt.gas_used {
        out.push_str(&format!("  Gas used: {gas}\n"));
    }
    if attempt.error.as_ref().is_some_and(|e| e.kind.outcome_unknown()) {
        out.push_str("  The transaction may still be included; publish again to reconcile it.\n");
    }
    for warning in &outcome.warnings {
        out.push_str(&format!("  warning: {warning}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcred_core::{
        AttemptId, GasEstimate, IdempotencyToken, RootCommitment, TxHash, U256,
    };
    use mcred_state::{AttemptFailure, FailureKind, PublicationAttempt};

    fn attempt() -> PublicationAttempt {
        PublicationAttempt::new(
            AttemptId::new(),
            TermId::new("2024-FALL").unwrap(),
            IdempotencyToken::new(),
        )
    }

    fn advance(attempt: &mut PublicationAttempt, phases: &[PublicationPhase]) {
        for phase in phases {
            attempt.try_transition(*phase).unwrap();
        }
    }

    #[test]
    fn estimate_line_shows_ether() {
        let mut a = attempt();
        advance(&mut a, &[PublicationPhase::Estimating, PublicationPhase::Simulating]);
        a.estimate = GasEstimate::new(U256::from(60_000u64), U256::from(20_000_000_000u64));
        let line = progress_line(&a.snapshot());
        assert!(line.contains("estimated gas 60000"));
        assert!(line.ends_with("up to 0.0012 ETH"));
    }

    #[test]
    fn success_summary() {
        let mut a = attempt();
        advance(
            &mut a,
            &[
                PublicationPhase::Estimating,
                PublicationPhase::Simulating,
                PublicationPhase::AwaitingSignature,
                PublicationPhase::Broadcasting,
                PublicationPhase::Confirming,
                PublicationPhase::Succeeded,
            ],
        );
        a.verkle_root = Some(RootCommitment::from_bytes([0x11; 32]));
        a.tx_hash = Some(TxHash::parse(&format!("0x{}", "ab".repeat(32))).unwrap());
        a.block_number = Some(16);
        a.gas_used = Some(U256::from(48_203u64));
        let outcome = PublicationOutcome {
            attempt: a,
            warnings: vec!["issuer record update failed".to_string()],
        };
        let out = render_outcome(&outcome);
        assert!(out.starts_with("OK: root for term 2024-FALL published\n"));
        assert!(out.contains("  Block: 16\n"));
        assert!(out.contains("  Gas used: 48203\n"));
        assert!(out.contains("  warning: issuer record update failed\n"));
    }

    #[test]
    fn timeout_summary_mentions_reconciliation() {
        let mut a = attempt();
        advance(
            &mut a,
            &[
                PublicationPhase::Estimating,
                PublicationPhase::Simulating,
                PublicationPhase::AwaitingSignature,
                PublicationPhase::Broadcasting,
                PublicationPhase::Confirming,
            ],
        );
        a.fail(AttemptFailure::new(
            PublicationPhase::Confirming,
            FailureKind::Timeout,
            "not included within 120s",
        ))
        .unwrap();
        let outcome = PublicationOutcome {
            attempt: a,
            warnings: Vec::new(),
        };
        let out = render_outcome(&outcome);
        assert!(out.starts_with("FAILED: "));
        assert!(out.contains("not included within 120s"));
        assert!(out.contains("publish again to reconcile"));
    }
}
