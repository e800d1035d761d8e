//! End-to-end behavior of the publication workflow against the in-memory
//! ledger and signer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcred_anchor::{MockCalls, MockLedger, MockSigner, ALREADY_PUBLISHED};
use mcred_core::{
    Address, BackendError, IdempotencyToken, IssuerRecords, LedgerError, PublicationRecord,
    RootCommitment, TermId, TermRootSource, TermRoots, TxHash, TxStatus, B256, U256,
};
use mcred_state::{
    AbortHandle, FailureKind, NoProgress, PublicationOutcome, PublicationPhase,
    PublicationRegistry, PublicationWorkflow, PublishRejected, PublishRequest, RecordedProgress,
    UnresolvedTransaction, WorkflowConfig,
};
use parking_lot::Mutex;
use proptest::prelude::*;

const ROOT_HEX: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

fn term() -> TermId {
    TermId::new("2024-FALL").unwrap()
}

fn operator() -> Address {
    Address::repeat_byte(0x42)
}

struct FakeRoots(Result<TermRoots, BackendError>);

impl FakeRoots {
    fn valid() -> Self {
        Self(Ok(TermRoots {
            verkle_root: ROOT_HEX.to_string(),
            total_students: 40,
        }))
    }
}

#[async_trait]
impl TermRootSource for FakeRoots {
    async fn term_roots(&self, _term_id: &TermId) -> Result<TermRoots, BackendError> {
        self.0.clone()
    }
}

#[derive(Default)]
struct FakeRecords {
    fail: bool,
    written: Mutex<Vec<(TermId, PublicationRecord)>>,
}

impl FakeRecords {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn written(&self) -> Vec<(TermId, PublicationRecord)> {
        self.written.lock().clone()
    }
}

#[async_trait]
impl IssuerRecords for FakeRecords {
    async fn record_publication(
        &self,
        term_id: &TermId,
        record: &PublicationRecord,
    ) -> Result<(), BackendError> {
        if self.fail {
            return Err(BackendError::Status {
                endpoint: format!("/terms/{term_id}/blockchain"),
                status: 500,
                body: "database unavailable".to_string(),
            });
        }
        self.written.lock().push((term_id.clone(), record.clone()));
        Ok(())
    }
}

struct Harness {
    ledger: Arc<MockLedger>,
    records: Arc<FakeRecords>,
    workflow: PublicationWorkflow,
}

fn harness_with(ledger: MockLedger, roots: FakeRoots, records: FakeRecords) -> Harness {
    let ledger = Arc::new(ledger);
    let records = Arc::new(records);
    let workflow = PublicationWorkflow::new(
        Arc::new(roots),
        ledger.clone(),
        records.clone(),
        PublicationRegistry::new(),
        WorkflowConfig::default(),
    );
    Harness {
        ledger,
        records,
        workflow,
    }
}

fn harness(ledger: MockLedger) -> Harness {
    harness_with(ledger, FakeRoots::valid(), FakeRecords::default())
}

impl Harness {
    async fn publish(&self, signer: &MockSigner) -> PublicationOutcome {
        self.workflow
            .publish(PublishRequest::new(term()), Some(signer), &NoProgress, None)
            .await
            .unwrap()
    }
}

fn failure_kind(outcome: &PublicationOutcome) -> FailureKind {
    outcome.attempt.error.as_ref().unwrap().kind
}

#[tokio::test(start_paused = true)]
async fn happy_path_publishes_and_records() {
    let h = harness(MockLedger::new().with_confirm_after(Some(2)));
    let signer = MockSigner::new(operator());
    let progress = RecordedProgress::new();

    let outcome = h
        .workflow
        .publish(PublishRequest::new(term()), Some(&signer), &progress, None)
        .await
        .unwrap();

    assert!(outcome.succeeded(), "{:?}", outcome.attempt.error);
    assert!(outcome.warnings.is_empty());
    use PublicationPhase::*;
    assert_eq!(
        outcome.attempt.phase_history(),
        vec![
            Idle,
            Estimating,
            Simulating,
            AwaitingSignature,
            Broadcasting,
            Confirming,
            Succeeded
        ]
    );
    let reported: Vec<_> = progress.snapshots().iter().map(|s| s.phase).collect();
    assert_eq!(
        reported,
        vec![
            Estimating,
            Simulating,
            AwaitingSignature,
            Broadcasting,
            Confirming,
            Succeeded
        ]
    );

    let root = RootCommitment::parse(ROOT_HEX).unwrap();
    assert_eq!(outcome.attempt.verkle_root, Some(root));
    assert_eq!(outcome.attempt.total_students, Some(U256::from(40u64)));
    assert!(outcome.attempt.estimate.is_some());
    assert!(outcome.attempt.block_number.is_some());
    assert!(h.ledger.is_published(&root));

    let written = h.records.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].0, term());
    assert_eq!(Some(written[0].1.tx_hash), outcome.attempt.tx_hash);
    assert_eq!(written[0].1.publisher_address, operator());

    let requests = signer.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].gas_limit.is_some());
    assert!(!h.workflow.registry().is_in_flight(&term()));
}

#[tokio::test]
async fn no_signing_identity_is_rejected_at_idle() {
    let h = harness(MockLedger::new());

    let err = h
        .workflow
        .publish(PublishRequest::new(term()), None, &NoProgress, None)
        .await
        .unwrap_err();
    assert_eq!(err, PublishRejected::NoSigningIdentity);

    let disconnected = MockSigner::disconnected();
    let err = h
        .workflow
        .publish(
            PublishRequest::new(term()),
            Some(&disconnected),
            &NoProgress,
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err, PublishRejected::NoSigningIdentity);
    assert_eq!(h.ledger.calls(), MockCalls::default());
}

#[tokio::test(start_paused = true)]
async fn second_publish_for_term_in_flight_is_rejected() {
    let h = harness(MockLedger::new().with_confirm_after(Some(3)));
    let signer = MockSigner::new(operator());

    let first = h.publish(&signer);
    let second = async {
        h.workflow
            .publish(PublishRequest::new(term()), Some(&signer), &NoProgress, None)
            .await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.succeeded());
    assert!(matches!(
        second,
        Err(PublishRejected::AlreadyInFlight { ref term_id, .. }) if *term_id == term()
    ));
    assert_eq!(h.ledger.calls().broadcasts, 1);
}

#[tokio::test]
async fn simulation_revert_fails_before_signature() {
    let h = harness(MockLedger::new().with_simulation_revert("unauthorized publisher"));
    let signer = MockSigner::new(operator());

    let outcome = h.publish(&signer).await;

    assert_eq!(outcome.attempt.phase(), PublicationPhase::Failed);
    let error = outcome.attempt.error.as_ref().unwrap();
    assert_eq!(error.kind, FailureKind::SimulationReverted);
    assert_eq!(error.phase, PublicationPhase::Simulating);
    assert!(error.message.contains("unauthorized publisher"));
    assert!(signer.requests().is_empty());
    assert_eq!(h.ledger.calls().broadcasts, 0);
    assert!(h.records.written().is_empty());
}

#[tokio::test]
async fn already_published_root_reverts_in_simulation() {
    let h = harness(MockLedger::new());
    let signer = MockSigner::new(operator());

    assert!(h.publish(&signer).await.succeeded());
    let again = h.publish(&signer).await;

    let error = again.attempt.error.as_ref().unwrap();
    assert_eq!(error.kind, FailureKind::SimulationReverted);
    assert_eq!(error.message, ALREADY_PUBLISHED);
    assert_eq!(signer.requests().len(), 1);
}

#[tokio::test]
async fn declined_signature_is_user_declined() {
    let h = harness(MockLedger::new());
    let signer = MockSigner::declining(operator());

    let outcome = h.publish(&signer).await;

    assert_eq!(failure_kind(&outcome), FailureKind::UserDeclined);
    assert_eq!(
        outcome.attempt.error.as_ref().unwrap().phase,
        PublicationPhase::AwaitingSignature
    );
    assert_eq!(h.ledger.calls().broadcasts, 0);
    assert!(outcome.attempt.tx_hash.is_none());
}

#[tokio::test]
async fn malformed_root_fails_in_estimating() {
    let roots = FakeRoots(Ok(TermRoots {
        verkle_root: "0x1234".to_string(),
        total_students: 40,
    }));
    let h = harness_with(MockLedger::new(), roots, FakeRecords::default());
    let signer = MockSigner::new(operator());

    let outcome = h.publish(&signer).await;

    assert_eq!(failure_kind(&outcome), FailureKind::InvalidRoot);
    assert_eq!(
        outcome.attempt.phase_history(),
        vec![
            PublicationPhase::Idle,
            PublicationPhase::Estimating,
            PublicationPhase::Failed
        ]
    );
    assert_eq!(h.ledger.calls().estimates, 0);
    assert_eq!(h.ledger.calls().simulations, 0);
}

#[tokio::test]
async fn backend_failure_fails_in_estimating() {
    let roots = FakeRoots(Err(BackendError::Transport {
        endpoint: "/terms/2024-FALL/roots".to_string(),
        message: "connection refused".to_string(),
    }));
    let h = harness_with(MockLedger::new(), roots, FakeRecords::default());

    let outcome = h.publish(&MockSigner::new(operator())).await;
    assert_eq!(failure_kind(&outcome), FailureKind::Backend);
}

#[tokio::test]
async fn failed_estimate_is_only_a_warning() {
    let h = harness(
        MockLedger::new().with_estimate_error(LedgerError::Unavailable("rate limited".to_string())),
    );
    let signer = MockSigner::new(operator());

    let outcome = h.publish(&signer).await;

    assert!(outcome.succeeded());
    assert!(outcome.attempt.estimate.is_none());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("gas estimation failed"));
    assert!(signer.requests()[0].gas_limit.is_none());
}

#[tokio::test]
async fn reverted_transaction_fails_in_confirming() {
    let h = harness(MockLedger::new().with_receipt_status(TxStatus::Reverted));

    let outcome = h.publish(&MockSigner::new(operator())).await;

    assert_eq!(failure_kind(&outcome), FailureKind::Reverted);
    assert!(outcome.attempt.block_number.is_some());
    assert!(h.records.written().is_empty());
    assert!(h.workflow.registry().unresolved(&term()).is_none());
}

#[tokio::test]
async fn rejected_broadcast_is_not_remembered() {
    let h = harness(MockLedger::new().with_broadcast_error(LedgerError::Rpc {
        code: -32000,
        message: "nonce too low".to_string(),
    }));

    let outcome = h.publish(&MockSigner::new(operator())).await;

    assert_eq!(failure_kind(&outcome), FailureKind::BroadcastRejected);
    assert!(h.workflow.registry().unresolved(&term()).is_none());
}

#[tokio::test]
async fn unparsable_broadcast_answer_is_remembered() {
    let h = harness(
        MockLedger::new()
            .with_broadcast_error(LedgerError::Malformed("invalid JSON response".to_string())),
    );
    let signer = MockSigner::new(operator());

    let outcome = h.publish(&signer).await;

    assert_eq!(failure_kind(&outcome), FailureKind::Broadcast);
    assert!(failure_kind(&outcome).outcome_unknown());
    let local_hash = outcome.attempt.tx_hash.unwrap();
    assert_eq!(
        h.workflow.registry().unresolved(&term()).map(|u| u.tx_hash),
        Some(local_hash)
    );

    let err = h
        .workflow
        .publish(PublishRequest::new(term()), Some(&signer), &NoProgress, None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PublishRejected::UnresolvedPriorTransaction {
            term_id: term(),
            tx_hash: local_hash
        }
    );
    assert_eq!(h.ledger.calls().broadcasts, 1);
}

#[tokio::test]
async fn seeded_registry_blocks_publish_until_reconciled() {
    let pending = TxHash(B256::repeat_byte(0xab));
    let registry = PublicationRegistry::with_unresolved([(
        term(),
        UnresolvedTransaction {
            tx_hash: pending,
            publisher: operator(),
            verkle_root: None,
            total_students: None,
        },
    )]);
    let ledger = Arc::new(MockLedger::new());
    let workflow = PublicationWorkflow::new(
        Arc::new(FakeRoots::valid()),
        ledger.clone(),
        Arc::new(FakeRecords::default()),
        registry,
        WorkflowConfig::default(),
    );
    let signer = MockSigner::new(operator());

    let err = workflow
        .publish(PublishRequest::new(term()), Some(&signer), &NoProgress, None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PublishRejected::UnresolvedPriorTransaction {
            term_id: term(),
            tx_hash: pending
        }
    );
    assert_eq!(ledger.calls().broadcasts, 0);
}

#[tokio::test]
async fn already_known_rejection_is_remembered() {
    let h = harness(MockLedger::new().with_broadcast_error(LedgerError::Rpc {
        code: -32000,
        message: "already known".to_string(),
    }));

    let outcome = h.publish(&MockSigner::new(operator())).await;

    assert_eq!(failure_kind(&outcome), FailureKind::Broadcast);
    assert!(h.workflow.registry().unresolved(&term()).is_some());
}

#[tokio::test]
async fn failed_issuer_record_is_only_a_warning() {
    let h = harness_with(
        MockLedger::new(),
        FakeRoots::valid(),
        FakeRecords::failing(),
    );

    let outcome = h.publish(&MockSigner::new(operator())).await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("issuer record was not updated"));
}

#[tokio::test(start_paused = true)]
async fn timeout_is_reconciled_without_rebroadcast() {
    let h = harness(MockLedger::new().with_confirm_after(None));
    let signer = MockSigner::new(operator());

    let timed_out = h.publish(&signer).await;
    assert_eq!(failure_kind(&timed_out), FailureKind::Timeout);
    assert!(failure_kind(&timed_out).outcome_unknown());
    let tx_hash = timed_out.attempt.tx_hash.unwrap();
    assert_eq!(
        h.workflow.registry().unresolved(&term()).map(|u| u.tx_hash),
        Some(tx_hash)
    );

    // Still pending: the next publish refuses to broadcast again.
    let err = h
        .workflow
        .publish(PublishRequest::new(term()), Some(&signer), &NoProgress, None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PublishRejected::UnresolvedPriorTransaction {
            term_id: term(),
            tx_hash
        }
    );

    h.ledger.settle_now(tx_hash, TxStatus::Success);
    let reconciled = h.publish(&signer).await;

    assert!(reconciled.succeeded());
    assert_eq!(
        reconciled.attempt.phase_history(),
        vec![
            PublicationPhase::Idle,
            PublicationPhase::Confirming,
            PublicationPhase::Succeeded
        ]
    );
    assert_eq!(reconciled.attempt.tx_hash, Some(tx_hash));
    assert_eq!(h.ledger.calls().broadcasts, 1);
    assert_eq!(signer.requests().len(), 1);
    assert_eq!(h.records.written().len(), 1);
    assert!(h.workflow.registry().unresolved(&term()).is_none());
}

#[tokio::test(start_paused = true)]
async fn reverted_earlier_transaction_allows_fresh_publication() {
    let h = harness(MockLedger::new().with_confirm_after(None));
    let signer = MockSigner::new(operator());

    let first = h.publish(&signer).await;
    let tx_hash = first.attempt.tx_hash.unwrap();
    h.ledger.settle_now(tx_hash, TxStatus::Reverted);

    let second = h.publish(&signer).await;

    assert!(second.warnings.iter().any(|w| w.contains("reverted")));
    assert_eq!(h.ledger.calls().broadcasts, 2);
    assert_ne!(second.attempt.tx_hash, Some(tx_hash));
}

#[tokio::test(start_paused = true)]
async fn abandoned_wait_keeps_transaction_for_reconciliation() {
    let h = harness(MockLedger::new().with_confirm_after(None));
    let signer = MockSigner::new(operator());
    let abort = AbortHandle::new();

    let publish = h.workflow.publish(
        PublishRequest::new(term()),
        Some(&signer),
        &NoProgress,
        Some(&abort),
    );
    let operator_gives_up = async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        abort.abort();
    };
    let (outcome, ()) = tokio::join!(publish, operator_gives_up);
    let outcome = outcome.unwrap();

    assert_eq!(failure_kind(&outcome), FailureKind::Abandoned);
    assert_eq!(
        outcome.attempt.error.as_ref().unwrap().phase,
        PublicationPhase::Confirming
    );
    assert!(h.workflow.registry().unresolved(&term()).is_some());
    assert!(!h.workflow.registry().is_in_flight(&term()));
}

#[tokio::test]
async fn lost_acknowledgement_is_reconciled_by_local_hash() {
    let h = harness(MockLedger::new().with_lost_acknowledgement());
    let signer = MockSigner::new(operator());

    let first = h.publish(&signer).await;
    assert_eq!(failure_kind(&first), FailureKind::Broadcast);
    let local_hash = first.attempt.tx_hash.unwrap();
    assert_eq!(h.ledger.transactions(), vec![local_hash]);

    let second = h.publish(&signer).await;
    assert!(second.succeeded());
    assert_eq!(second.attempt.tx_hash, Some(local_hash));
    assert_eq!(h.ledger.calls().broadcasts, 1);
}

#[tokio::test]
async fn broadcast_token_cannot_be_reused() {
    let h = harness(MockLedger::new());
    let signer = MockSigner::new(operator());
    let token = IdempotencyToken::new();

    let request = PublishRequest {
        term_id: term(),
        token,
    };
    let outcome = h
        .workflow
        .publish(request.clone(), Some(&signer), &NoProgress, None)
        .await
        .unwrap();
    assert!(outcome.succeeded());

    let err = h
        .workflow
        .publish(request, Some(&signer), &NoProgress, None)
        .await
        .unwrap_err();
    assert_eq!(err, PublishRejected::DuplicateToken(token));
}

proptest! {
    #[test]
    fn accepted_transitions_only_move_forward(
        steps in prop::collection::vec(prop::sample::select(PublicationPhase::ALL.to_vec()), 0..24)
    ) {
        let mut attempt = mcred_state::PublicationAttempt::new(
            mcred_core::AttemptId::new(),
            term(),
            IdempotencyToken::new(),
        );
        for to in steps {
            let before = attempt.phase();
            match attempt.try_transition(to) {
                Ok(()) => {
                    prop_assert!(!before.is_terminal());
                    prop_assert!(before.ordinal() < to.ordinal());
                }
                Err(e) => {
                    prop_assert_eq!(attempt.phase(), before);
                    prop_assert_eq!(e.from, before);
                }
            }
        }
        let history = attempt.phase_history();
        for pair in history.windows(2) {
            prop_assert!(pair[0].ordinal() < pair[1].ordinal());
        }
    }
}
