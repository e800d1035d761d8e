//! # Publication Attempt
//!
//! In-memory record of one publication workflow instance. It is created
//! when an issuer initiates publication and handed back to the caller when
//! the attempt ends. It is never persisted mid-flight.
//!
//! Phase changes go through [`PublicationAttempt::try_transition()`], which
//! rejects any edge the phase machine does not allow and appends every
//! accepted change to the transition log.

use chrono::{DateTime, Utc};
use mcred_core::{AttemptId, GasEstimate, IdempotencyToken, RootCommitment, TermId, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::phase::PublicationPhase;

/// Record of a single phase change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: PublicationPhase,
    pub to: PublicationPhase,
    pub at: DateTime<Utc>,
}

/// Attempted phase change is not allowed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid publication transition: {from} -> {to}")]
pub struct AttemptError {
    pub from: PublicationPhase,
    pub to: PublicationPhase,
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The issuer backend could not supply the term's root.
    Backend,
    /// The backend's root is not a 32-byte hex commitment.
    InvalidRoot,
    /// The dry-run reverted. Nothing was signed.
    SimulationReverted,
    /// The ledger could not be queried.
    Ledger,
    /// The operator refused to sign.
    UserDeclined,
    /// The signing identity failed for another reason.
    Signer,
    /// The attempt's idempotency token was already broadcast.
    DuplicateBroadcast,
    /// The broadcast did not complete. The network may or may not have
    /// received the transaction.
    Broadcast,
    /// The network refused the transaction.
    BroadcastRejected,
    /// The included transaction reverted.
    Reverted,
    /// Confirmation did not arrive within the bounded wait.
    Timeout,
    /// The operator abandoned the confirmation wait.
    Abandoned,
    /// The workflow attempted a transition the phase machine forbids.
    InvalidTransition,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::InvalidRoot => "invalid_root",
            Self::SimulationReverted => "simulation_reverted",
            Self::Ledger => "ledger",
            Self::UserDeclined => "user_declined",
            Self::Signer => "signer",
            Self::DuplicateBroadcast => "duplicate_broadcast",
            Self::Broadcast => "broadcast",
            Self::BroadcastRejected => "broadcast_rejected",
            Self::Reverted => "reverted",
            Self::Timeout => "timeout",
            Self::Abandoned => "abandoned",
            Self::InvalidTransition => "invalid_transition",
        }
    }

    /// Whether the transaction may still land on the ledger after this
    /// failure. Such a failure ends only the local wait.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, Self::Timeout | Self::Abandoned | Self::Broadcast)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure attached to an attempt: the phase it happened in, the kind, and
/// the collaborator's message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} during {phase}: {message}")]
pub struct AttemptFailure {
    pub phase: PublicationPhase,
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(phase: PublicationPhase, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            phase,
            kind,
            message: message.into(),
        }
    }
}

impl From<AttemptError> for AttemptFailure {
    fn from(e: AttemptError) -> Self {
        Self::new(e.from, FailureKind::InvalidTransition, e.to_string())
    }
}

/// One publication workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationAttempt {
    pub attempt_id: AttemptId,
    pub token: IdempotencyToken,
    pub term_id: TermId,
    pub verkle_root: Option<RootCommitment>,
    pub total_students: Option<U256>,
    phase: PublicationPhase,
    pub estimate: Option<GasEstimate>,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    pub error: Option<AttemptFailure>,
    transitions: Vec<PhaseTransition>,
}

impl PublicationAttempt {
    /// A fresh attempt in `Idle`.
    pub fn new(attempt_id: AttemptId, term_id: TermId, token: IdempotencyToken) -> Self {
        Self {
            attempt_id,
            token,
            term_id,
            verkle_root: None,
            total_students: None,
            phase: PublicationPhase::Idle,
            estimate: None,
            tx_hash: None,
            block_number: None,
            gas_used: None,
            error: None,
            transitions: Vec::new(),
        }
    }

    pub fn phase(&self) -> PublicationPhase {
        self.phase
    }

    /// Every accepted phase change, oldest first.
    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    /// The phases this attempt has been in, starting with `Idle`.
    pub fn phase_history(&self) -> Vec<PublicationPhase> {
        std::iter::once(PublicationPhase::Idle)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Move to `to` if the phase machine allows it.
    pub fn try_transition(&mut self, to: PublicationPhase) -> Result<(), AttemptError> {
        if !self.phase.can_transition_to(to) {
            return Err(AttemptError {
                from: self.phase,
                to,
            });
        }
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            at: Utc::now(),
        });
        self.phase = to;
        Ok(())
    }

    /// Move to `Failed` and attach the failure. An attempt that is already
    /// terminal, or still `Idle`, keeps its phase.
    pub fn fail(&mut self, failure: AttemptFailure) -> Result<(), AttemptError> {
        self.try_transition(PublicationPhase::Failed)?;
        self.error = Some(failure);
        Ok(())
    }

    /// Point-in-time view for progress observers.
    pub fn snapshot(&self) -> AttemptSnapshot {
        AttemptSnapshot {
            attempt_id: self.attempt_id,
            term_id: self.term_id.clone(),
            phase: self.phase,
            estimate: self.estimate,
            tx_hash: self.tx_hash,
            block_number: self.block_number,
            error: self.error.clone(),
        }
    }
}

/// What a progress observer sees at each transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSnapshot {
    pub attempt_id: AttemptId,
    pub term_id: TermId,
    pub phase: PublicationPhase,
    pub estimate: Option<GasEstimate>,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
    pub error: Option<AttemptFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt() -> PublicationAttempt {
        PublicationAttempt::new(
            AttemptId::new(),
            TermId::new("T1").unwrap(),
            IdempotencyToken::new(),
        )
    }

    #[test]
    fn transitions_are_logged() {
        let mut a = attempt();
        a.try_transition(PublicationPhase::Estimating).unwrap();
        a.try_transition(PublicationPhase::Simulating).unwrap();
        assert_eq!(a.transitions().len(), 2);
        assert_eq!(a.transitions()[1].from, PublicationPhase::Estimating);
        assert_eq!(
            a.phase_history(),
            vec![
                PublicationPhase::Idle,
                PublicationPhase::Estimating,
                PublicationPhase::Simulating
            ]
        );
    }

    #[test]
    fn skipping_phases_is_rejected() {
        let mut a = attempt();
        let err = a.try_transition(PublicationPhase::Broadcasting).unwrap_err();
        assert_eq!(err.from, PublicationPhase::Idle);
        assert_eq!(a.phase(), PublicationPhase::Idle);
        assert!(a.transitions().is_empty());
    }

    #[test]
    fn fail_attaches_error() {
        let mut a = attempt();
        a.try_transition(PublicationPhase::Estimating).unwrap();
        a.fail(AttemptFailure::new(
            PublicationPhase::Estimating,
            FailureKind::InvalidRoot,
            "bad hex",
        ))
        .unwrap();
        assert_eq!(a.phase(), PublicationPhase::Failed);
        assert_eq!(a.error.as_ref().unwrap().kind, FailureKind::InvalidRoot);
        assert!(a.fail(AttemptFailure::new(
            PublicationPhase::Failed,
            FailureKind::Timeout,
            "again"
        ))
        .is_err());
    }

    #[test]
    fn failure_display_names_phase_and_kind() {
        let f = AttemptFailure::new(
            PublicationPhase::Confirming,
            FailureKind::Timeout,
            "no receipt after 120s",
        );
        assert_eq!(f.to_string(), "timeout during CONFIRMING: no receipt after 120s");
        assert!(f.kind.outcome_unknown());
        assert!(!FailureKind::Reverted.outcome_unknown());
    }
}
