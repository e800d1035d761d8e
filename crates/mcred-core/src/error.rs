//! # Error Types
//!
//! Errors raised while constructing or validating core types. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Collaborator failures (ledger, signer, backend) live in
//! [`crate::interfaces`] next to the traits that produce them.

use thiserror::Error;

/// Top-level error type for core type construction and validation.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An identifier failed validation.
    #[error("invalid {kind}: {reason}")]
    InvalidIdentifier {
        /// Identifier namespace (e.g., "term id").
        kind: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A root commitment was not a 32-byte hex string.
    #[error("invalid root commitment {input:?}: {reason}")]
    InvalidRoot {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A receipt violates a structural invariant.
    #[error("malformed receipt: {0}")]
    MalformedReceipt(String),

    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// JCS encoding failed.
    #[error("JCS encoding failed: {0}")]
    Jcs(String),
}
