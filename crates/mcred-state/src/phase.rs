//! # Publication Phases
//!
//! ```text
//! Idle → Estimating → Simulating → AwaitingSignature → Broadcasting → Confirming → Succeeded
//!   │         │            │               │                 │             │
//!   │         └────────────┴───────────────┴─────────────────┴─────────────┴──→ Failed
//!   └──────────────────────────────────────────────────────────→ Confirming   (reconciliation)
//! ```
//!
//! Every allowed edge moves strictly forward in [`PublicationPhase::ordinal()`],
//! so no attempt can revisit a phase.

use serde::{Deserialize, Serialize};

/// Phase of a publication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationPhase {
    Idle,
    Estimating,
    Simulating,
    AwaitingSignature,
    Broadcasting,
    Confirming,
    Succeeded,
    Failed,
}

impl PublicationPhase {
    /// All phases in order.
    pub const ALL: [PublicationPhase; 8] = [
        Self::Idle,
        Self::Estimating,
        Self::Simulating,
        Self::AwaitingSignature,
        Self::Broadcasting,
        Self::Confirming,
        Self::Succeeded,
        Self::Failed,
    ];

    /// Returns the canonical phase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Estimating => "ESTIMATING",
            Self::Simulating => "SIMULATING",
            Self::AwaitingSignature => "AWAITING_SIGNATURE",
            Self::Broadcasting => "BROADCASTING",
            Self::Confirming => "CONFIRMING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }

    /// Position in the phase order. `Succeeded` and `Failed` share the last
    /// slot.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Estimating => 1,
            Self::Simulating => 2,
            Self::AwaitingSignature => 3,
            Self::Broadcasting => 4,
            Self::Confirming => 5,
            Self::Succeeded | Self::Failed => 6,
        }
    }

    /// Whether this phase is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether a transition from `self` to `to` is allowed.
    pub fn can_transition_to(&self, to: PublicationPhase) -> bool {
        use PublicationPhase::*;
        matches!(
            (*self, to),
            (Idle, Estimating)
                | (Estimating, Simulating)
                | (Simulating, AwaitingSignature)
                | (AwaitingSignature, Broadcasting)
                | (Broadcasting, Confirming)
                | (Confirming, Succeeded)
                | (Idle, Confirming)
        ) || (to == Failed && !self.is_terminal() && *self != Idle)
    }
}

impl std::fmt::Display for PublicationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
