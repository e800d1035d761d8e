//! # mcred-core — Foundational Types for Academic Micro-Credentials
//!
//! This crate is the leaf of the workspace. It defines the receipt data
//! model, the root commitment type, verification result shapes, the ledger
//! value types, and the collaborator interfaces that the disclosure,
//! verification, and publication crates consume. It depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `TermId`, `StudentId`, `CourseId`
//!    are validated at construction and at deserialization. No bare strings.
//!
//! 2. **Proof material is opaque.** [`Proof`] holds the exact bytes the issuer
//!    produced. Nothing in the stack re-encodes it.
//!
//! 3. **`RootCommitment` is 32 bytes or nothing.** Hex parsing accepts an
//!    optional `0x` prefix followed by exactly 64 hex characters.
//!
//! 4. **Boundary parsing into tagged variants.** Uploaded documents become a
//!    [`ProofDocument`] at the edge; downstream code never probes fields.
//!
//! 5. **Ledger quantities are `U256`.** Gas and cost never pass through a
//!    floating-point or decimal representation inside the library.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mcred-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod commitment;
pub mod digest;
pub mod document;
pub mod error;
pub mod identity;
pub mod interfaces;
pub mod ledger;
pub mod receipt;
pub mod verification;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use commitment::RootCommitment;
pub use digest::{sha256_digest, ContentDigest};
pub use document::{DocumentError, ProofDocument};
pub use error::CoreError;
pub use identity::{AttemptId, CourseId, IdempotencyToken, StudentId, TermId};
pub use interfaces::{
    BackendError, IssuerRecords, LedgerClient, LedgerError, ReceiptVerifier, SignerError,
    SigningIdentity, TermRootSource,
};
pub use ledger::{
    GasEstimate, PublicationRecord, PublishCall, RootLookup, SignatureRequest, SignedTransaction,
    TermRoots, TxHash, TxReceipt, TxStatus,
};
pub use receipt::{Course, JourneyReceipt, Proof, ReceiptType, TermReceipt};
pub use verification::{VerificationReport, VerificationResult, VerifierResponse, VerifierStatus};

/// Ledger primitives re-exported so that downstream crates agree on one
/// definition of `U256`, `Address`, and `B256`.
pub use alloy_primitives::{Address, B256, U256};
