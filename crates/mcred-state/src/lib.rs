//! # mcred-state — Publication State Machine
//!
//! Anchors a term's root commitment on the ledger through a multi-step,
//! partially irreversible workflow:
//!
//! ```text
//! Idle → Estimating → Simulating → AwaitingSignature → Broadcasting → Confirming → {Succeeded | Failed}
//! ```
//!
//! - **Phases** (`phase.rs`): the phase enum and its allowed edges. Every
//!   edge moves forward, so no phase is revisited within an attempt.
//! - **Attempt** (`attempt.rs`): the in-memory attempt record with its
//!   transition log and failure classification.
//! - **Registry** (`registry.rs`): single flight per term, single-use
//!   idempotency tokens, and memory of transactions whose outcome is
//!   unknown.
//! - **Workflow** (`workflow.rs`): the async driver. It suspends at every
//!   network-bound step and reports progress after every transition.
//!
//! ## Ambiguous outcomes
//!
//! A timed-out or abandoned confirmation wait fails the *attempt*, not the
//! transaction. The transaction hash is kept, and the next publish for the
//! term reconciles it before anything is broadcast again.
//!
//! ## Numeric semantics
//!
//! Gas and cost are `U256` in the smallest unit throughout. Nothing in this
//! crate converts to a decimal denomination.

pub mod abort;
pub mod attempt;
pub mod config;
pub mod error;
pub mod phase;
pub mod progress;
pub mod registry;
pub mod workflow;

pub use abort::AbortHandle;
pub use attempt::{
    AttemptError, AttemptFailure, AttemptSnapshot, FailureKind, PhaseTransition,
    PublicationAttempt,
};
pub use config::WorkflowConfig;
pub use error::PublishRejected;
pub use phase::PublicationPhase;
pub use progress::{NoProgress, ProgressSink, RecordedProgress};
pub use registry::{FlightGuard, PublicationRegistry, UnresolvedTransaction, TOKEN_MEMORY};
pub use workflow::{PublicationOutcome, PublicationWorkflow, PublishRequest};
