//! # Publication Workflow
//!
//! Drives one [`PublicationAttempt`] from `Idle` to a terminal phase:
//!
//! 1. **Estimating**: fetch the term's root from the issuer backend and
//!    preview the cost. A bad root fails here. A failed estimate is only a
//!    warning.
//! 2. **Simulating**: dry-run the publish call. A revert fails the attempt
//!    before any signature is requested.
//! 3. **AwaitingSignature**: the operator authorizes or declines.
//! 4. **Broadcasting**: submit the signed transaction. The hash is recorded
//!    as soon as the network accepts it.
//! 5. **Confirming**: poll for inclusion within a bounded wait. On success
//!    the issuer record is updated, and a failed update is only a warning.
//!
//! When an attempt ends without knowing whether its transaction landed,
//! the next publish for that term first looks the transaction up. A landed
//! transaction completes the new attempt as `Idle → Confirming → Succeeded`
//! without broadcasting again.

use std::sync::Arc;

use mcred_core::{
    Address, IdempotencyToken, IssuerRecords, LedgerClient, LedgerError, PublicationRecord,
    PublishCall, SignerError, SigningIdentity, TermId, TermRootSource, TxHash, TxReceipt,
    TxStatus, U256,
};

use crate::abort::AbortHandle;
use crate::attempt::{AttemptFailure, FailureKind, PublicationAttempt};
use crate::config::WorkflowConfig;
use crate::error::PublishRejected;
use crate::phase::PublicationPhase;
use crate::progress::ProgressSink;
use crate::registry::{PublicationRegistry, UnresolvedTransaction};

/// A request to publish one term's root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub term_id: TermId,
    /// Reusing a token that was already broadcast is rejected.
    pub token: IdempotencyToken,
}

impl PublishRequest {
    /// A request with a fresh token.
    pub fn new(term_id: TermId) -> Self {
        Self {
            term_id,
            token: IdempotencyToken::new(),
        }
    }
}

/// A finished attempt and any secondary warnings.
#[derive(Debug, Clone)]
pub struct PublicationOutcome {
    pub attempt: PublicationAttempt,
    /// Advisory failures that did not change the classification, such as
    /// a failed gas estimate or issuer record update.
    pub warnings: Vec<String>,
}

impl PublicationOutcome {
    pub fn succeeded(&self) -> bool {
        self.attempt.phase() == PublicationPhase::Succeeded
    }
}

enum Wait {
    Included(TxReceipt),
    TimedOut,
    Abandoned,
}

/// The publication state machine driver.
pub struct PublicationWorkflow {
    roots: Arc<dyn TermRootSource>,
    ledger: Arc<dyn LedgerClient>,
    records: Arc<dyn IssuerRecords>,
    registry: PublicationRegistry,
    config: WorkflowConfig,
}

impl PublicationWorkflow {
    pub fn new(
        roots: Arc<dyn TermRootSource>,
        ledger: Arc<dyn LedgerClient>,
        records: Arc<dyn IssuerRecords>,
        registry: PublicationRegistry,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            roots,
            ledger,
            records,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &PublicationRegistry {
        &self.registry
    }

    /// Publish a term's root.
    ///
    /// Returns `Err` only when the request is refused at `Idle`. Every
    /// started attempt comes back as an outcome, successful or not.
    pub async fn publish(
        &self,
        request: PublishRequest,
        signer: Option<&dyn SigningIdentity>,
        progress: &dyn ProgressSink,
        abort: Option<&AbortHandle>,
    ) -> Result<PublicationOutcome, PublishRejected> {
        let (signer, publisher) = signer
            .and_then(|s| s.address().map(|a| (s, a)))
            .ok_or(PublishRejected::NoSigningIdentity)?;

        let attempt_id = mcred_core::AttemptId::new();
        let _flight = self
            .registry
            .claim(&request.term_id, attempt_id, request.token)?;
        let mut attempt = PublicationAttempt::new(attempt_id, request.term_id, request.token);
        let mut warnings = Vec::new();

        if let Some(prior) = self.registry.unresolved(&attempt.term_id) {
            if self
                .reconcile(&mut attempt, &prior, progress, &mut warnings)
                .await?
            {
                return Ok(PublicationOutcome { attempt, warnings });
            }
        }

        metrics::counter!("mcred_publication_attempts_started_total").increment(1);
        let result = self
            .drive(&mut attempt, signer, publisher, progress, abort, &mut warnings)
            .await;
        self.finish(&mut attempt, result, progress);

        Ok(PublicationOutcome { attempt, warnings })
    }

    /// Resolve a remembered transaction. Returns `true` if it completed
    /// the attempt, `false` if a fresh publication should proceed.
    async fn reconcile(
        &self,
        attempt: &mut PublicationAttempt,
        prior: &UnresolvedTransaction,
        progress: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) -> Result<bool, PublishRejected> {
        let unresolved = || PublishRejected::UnresolvedPriorTransaction {
            term_id: attempt.term_id.clone(),
            tx_hash: prior.tx_hash,
        };

        let receipt = match self.ledger.transaction_receipt(&prior.tx_hash).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => return Err(unresolved()),
            Err(e) => {
                tracing::warn!(
                    term_id = %attempt.term_id,
                    tx_hash = %prior.tx_hash,
                    error = %e,
                    "could not look up earlier transaction"
                );
                return Err(unresolved());
            }
        };

        self.registry.resolve(&attempt.term_id);
        if receipt.status == TxStatus::Reverted {
            warnings.push(format!(
                "earlier transaction {} reverted in block {}; publishing again",
                prior.tx_hash, receipt.block_number
            ));
            return Ok(false);
        }

        tracing::info!(
            term_id = %attempt.term_id,
            tx_hash = %prior.tx_hash,
            block = receipt.block_number,
            "earlier transaction landed; completing without a new broadcast"
        );
        attempt.verkle_root = prior.verkle_root;
        attempt.total_students = prior.total_students;
        attempt.tx_hash = Some(prior.tx_hash);

        let result = match self.advance(attempt, PublicationPhase::Confirming, progress) {
            Ok(()) => {
                self.settle(attempt, &receipt, prior.publisher, progress, warnings)
                    .await
            }
            Err(failure) => Err(failure),
        };
        self.finish(attempt, result, progress);
        Ok(true)
    }

    async fn drive(
        &self,
        attempt: &mut PublicationAttempt,
        signer: &dyn SigningIdentity,
        publisher: Address,
        progress: &dyn ProgressSink,
        abort: Option<&AbortHandle>,
        warnings: &mut Vec<String>,
    ) -> Result<(), AttemptFailure> {
        use PublicationPhase::*;

        self.advance(attempt, Estimating, progress)?;
        let roots = self
            .roots
            .term_roots(&attempt.term_id)
            .await
            .map_err(|e| AttemptFailure::new(Estimating, FailureKind::Backend, e.to_string()))?;
        let root = roots
            .commitment()
            .map_err(|e| AttemptFailure::new(Estimating, FailureKind::InvalidRoot, e.to_string()))?;
        let total_students = U256::from(roots.total_students);
        attempt.verkle_root = Some(root);
        attempt.total_students = Some(total_students);

        let call = PublishCall {
            root,
            term_id: attempt.term_id.clone(),
            total_students,
        };
        match self.ledger.estimate_publication(&call, publisher).await {
            Ok(estimate) => attempt.estimate = Some(estimate),
            Err(e) => {
                tracing::warn!(term_id = %attempt.term_id, error = %e, "gas estimation failed");
                warnings.push(format!("gas estimation failed: {e}"));
            }
        }

        self.advance(attempt, Simulating, progress)?;
        self.ledger
            .simulate_publication(&call, publisher)
            .await
            .map_err(|e| match e {
                LedgerError::Reverted { reason } => {
                    AttemptFailure::new(Simulating, FailureKind::SimulationReverted, reason)
                }
                other => AttemptFailure::new(Simulating, FailureKind::Ledger, other.to_string()),
            })?;

        self.advance(attempt, AwaitingSignature, progress)?;
        let request = self
            .ledger
            .signature_request(&call, publisher, attempt.estimate.as_ref());
        let signed = signer.authorize(&request).await.map_err(|e| {
            let kind = match e {
                SignerError::Declined => FailureKind::UserDeclined,
                _ => FailureKind::Signer,
            };
            AttemptFailure::new(AwaitingSignature, kind, e.to_string())
        })?;

        self.advance(attempt, Broadcasting, progress)?;
        if !self.registry.record_broadcast(attempt.token) {
            return Err(AttemptFailure::new(
                Broadcasting,
                FailureKind::DuplicateBroadcast,
                format!("{} was already broadcast", attempt.token),
            ));
        }

        let unresolved = |tx_hash: TxHash| UnresolvedTransaction {
            tx_hash,
            publisher,
            verkle_root: Some(root),
            total_students: Some(total_students),
        };

        let tx_hash = match self.ledger.broadcast(&signed).await {
            Ok(accepted) => {
                if accepted != signed.hash() {
                    tracing::warn!(
                        local = %signed.hash(),
                        network = %accepted,
                        "network reported a different transaction hash"
                    );
                }
                accepted
            }
            Err(e) if broadcast_outcome_unknown(&e) => {
                attempt.tx_hash = Some(signed.hash());
                self.registry
                    .remember_unresolved(&attempt.term_id, unresolved(signed.hash()));
                return Err(AttemptFailure::new(
                    Broadcasting,
                    FailureKind::Broadcast,
                    format!("{e}; transaction {} may still confirm", signed.hash()),
                ));
            }
            Err(e) => {
                return Err(AttemptFailure::new(
                    Broadcasting,
                    FailureKind::BroadcastRejected,
                    e.to_string(),
                ))
            }
        };
        attempt.tx_hash = Some(tx_hash);

        self.advance(attempt, Confirming, progress)?;
        match self.wait_for_receipt(&tx_hash, abort).await {
            Wait::Included(receipt) => {
                self.settle(attempt, &receipt, publisher, progress, warnings)
                    .await
            }
            Wait::TimedOut => {
                self.registry
                    .remember_unresolved(&attempt.term_id, unresolved(tx_hash));
                Err(AttemptFailure::new(
                    Confirming,
                    FailureKind::Timeout,
                    format!(
                        "no receipt for {tx_hash} after {}s; the transaction may still confirm",
                        self.config.confirmation_timeout.as_secs()
                    ),
                ))
            }
            Wait::Abandoned => {
                self.registry
                    .remember_unresolved(&attempt.term_id, unresolved(tx_hash));
                Err(AttemptFailure::new(
                    Confirming,
                    FailureKind::Abandoned,
                    format!("stopped waiting for {tx_hash}; the transaction may still confirm"),
                ))
            }
        }
    }

    /// Classify an included transaction and, on success, update the issuer
    /// record.
    async fn settle(
        &self,
        attempt: &mut PublicationAttempt,
        receipt: &TxReceipt,
        publisher: Address,
        progress: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) -> Result<(), AttemptFailure> {
        attempt.block_number = Some(receipt.block_number);
        attempt.gas_used = Some(receipt.gas_used);

        if receipt.status == TxStatus::Reverted {
            return Err(AttemptFailure::new(
                PublicationPhase::Confirming,
                FailureKind::Reverted,
                format!(
                    "transaction {} reverted in block {}",
                    receipt.tx_hash, receipt.block_number
                ),
            ));
        }

        self.advance(attempt, PublicationPhase::Succeeded, progress)?;

        let record = PublicationRecord {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            publisher_address: publisher,
        };
        if let Err(e) = self
            .records
            .record_publication(&attempt.term_id, &record)
            .await
        {
            tracing::warn!(
                term_id = %attempt.term_id,
                tx_hash = %receipt.tx_hash,
                error = %e,
                "published on-chain but the issuer record was not updated"
            );
            warnings.push(format!(
                "published on-chain, but the issuer record was not updated: {e}"
            ));
        }
        Ok(())
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash, abort: Option<&AbortHandle>) -> Wait {
        let deadline = tokio::time::sleep(self.config.confirmation_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = abandoned(abort) => return Wait::Abandoned,
                _ = &mut deadline => return Wait::TimedOut,
                polled = self.ledger.transaction_receipt(tx_hash) => match polled {
                    Ok(Some(receipt)) => return Wait::Included(receipt),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "receipt poll failed"),
                },
            }

            tokio::select! {
                biased;
                _ = abandoned(abort) => return Wait::Abandoned,
                _ = &mut deadline => return Wait::TimedOut,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    fn advance(
        &self,
        attempt: &mut PublicationAttempt,
        to: PublicationPhase,
        progress: &dyn ProgressSink,
    ) -> Result<(), AttemptFailure> {
        attempt.try_transition(to)?;
        tracing::info!(
            term_id = %attempt.term_id,
            attempt_id = %attempt.attempt_id,
            phase = %to,
            "publication phase"
        );
        progress.report(&attempt.snapshot());
        Ok(())
    }

    fn finish(
        &self,
        attempt: &mut PublicationAttempt,
        result: Result<(), AttemptFailure>,
        progress: &dyn ProgressSink,
    ) {
        match result {
            Ok(()) => {
                metrics::counter!("mcred_publication_attempts_succeeded_total").increment(1);
            }
            Err(failure) => {
                let kind = failure.kind;
                tracing::warn!(
                    term_id = %attempt.term_id,
                    attempt_id = %attempt.attempt_id,
                    error = %failure,
                    "publication failed"
                );
                if let Err(e) = attempt.fail(failure) {
                    tracing::error!(
                        attempt_id = %attempt.attempt_id,
                        error = %e,
                        "could not record failure"
                    );
                }
                metrics::counter!(
                    "mcred_publication_attempts_failed_total",
                    "kind" => kind.as_str()
                )
                .increment(1);
                progress.report(&attempt.snapshot());
            }
        }
    }
}

/// Whether a failed broadcast may still have reached the mempool: the
/// endpoint was unreachable, its answer did not parse, or it reports the
/// transaction as already known.
fn broadcast_outcome_unknown(error: &LedgerError) -> bool {
    match error {
        LedgerError::Unavailable(_) | LedgerError::Malformed(_) => true,
        LedgerError::Rpc { message, .. } => {
            let message = message.to_ascii_lowercase();
            message.contains("already known") || message.contains("known transaction")
        }
        LedgerError::Reverted { .. } => false,
    }
}

async fn abandoned(abort: Option<&AbortHandle>) {
    match abort {
        Some(handle) => handle.aborted().await,
        None => std::future::pending().await,
    }
}
