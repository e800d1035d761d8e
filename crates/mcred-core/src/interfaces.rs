//! # Collaborator Interfaces
//!
//! Contracts for the external systems the credential pipeline consumes.
//! Nothing in this module performs I/O; implementations live in
//! `mcred-client` (issuer backend and verifier over HTTP) and
//! `mcred-anchor` (ledger registry over JSON-RPC).
//!
//! | Trait | Collaborator | Direction |
//! |-------|--------------|-----------|
//! | [`ReceiptVerifier`] | Verifier API `POST /verify` | consumed |
//! | [`TermRootSource`] | Term Root API `GET /terms/{id}/roots` | consumed |
//! | [`IssuerRecords`] | `PUT /terms/{id}/blockchain` | produced |
//! | [`LedgerClient`] | Registry contract | consumed (read + write) |
//! | [`SigningIdentity`] | Operator's ledger account | consumed |

use alloy_primitives::Address;
use async_trait::async_trait;
use thiserror::Error;

use crate::commitment::RootCommitment;
use crate::identity::TermId;
use crate::ledger::{
    GasEstimate, PublicationRecord, PublishCall, RootLookup, SignatureRequest, SignedTransaction,
    TermRoots, TxHash, TxReceipt,
};
use crate::receipt::JourneyReceipt;
use crate::verification::VerifierResponse;

/// Failure talking to the issuer backend or the verifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request did not complete (connection, timeout).
    #[error("{endpoint}: transport failure: {message}")]
    Transport { endpoint: String, message: String },

    /// The service answered with a non-success status.
    #[error("{endpoint}: returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("{endpoint}: malformed response: {message}")]
    Malformed { endpoint: String, message: String },
}

/// Failure reported by the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger endpoint could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The contract call reverted deterministically.
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    /// The endpoint answered with a JSON-RPC error.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The endpoint answered with something that is not a valid result.
    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

/// Failure of the signing identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The operator refused to authorize the transaction.
    #[error("user declined the signature request")]
    Declined,

    /// The identity is no longer connected.
    #[error("signing identity disconnected")]
    Disconnected,

    /// Signing failed for another reason.
    #[error("signing failed: {0}")]
    Failed(String),
}

/// The external verifier.
#[async_trait]
pub trait ReceiptVerifier: Send + Sync {
    /// Submit a receipt for verification.
    async fn verify(&self, receipt: &JourneyReceipt) -> Result<VerifierResponse, BackendError>;
}

/// Source of a term's root commitment.
#[async_trait]
pub trait TermRootSource: Send + Sync {
    /// Fetch the root and cohort size the backend holds for a term.
    async fn term_roots(&self, term_id: &TermId) -> Result<TermRoots, BackendError>;
}

/// Issuer-side record of a term's publication.
#[async_trait]
pub trait IssuerRecords: Send + Sync {
    /// Record where a term's root was published.
    async fn record_publication(
        &self,
        term_id: &TermId,
        record: &PublicationRecord,
    ) -> Result<(), BackendError>;
}

/// The ledger hosting the root registry contract.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Build the transaction for a publish call.
    fn signature_request(
        &self,
        call: &PublishCall,
        from: Address,
        estimate: Option<&GasEstimate>,
    ) -> SignatureRequest;

    /// Estimate gas limit and price for a publish call.
    async fn estimate_publication(
        &self,
        call: &PublishCall,
        from: Address,
    ) -> Result<GasEstimate, LedgerError>;

    /// Dry-run a publish call against current ledger state.
    async fn simulate_publication(&self, call: &PublishCall, from: Address)
        -> Result<(), LedgerError>;

    /// Submit a signed transaction. Returns the hash the network accepted.
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError>;

    /// Receipt of an included transaction, or `None` while it is pending
    /// or unknown.
    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, LedgerError>;

    /// Read the registry's metadata for a root.
    async fn lookup_root(&self, root: &RootCommitment) -> Result<RootLookup, LedgerError>;
}

/// The operator's ledger account.
#[async_trait]
pub trait SigningIdentity: Send + Sync {
    /// The connected address, or `None` if no identity is connected.
    fn address(&self) -> Option<Address>;

    /// Ask the operator to authorize a transaction.
    async fn authorize(&self, request: &SignatureRequest) -> Result<SignedTransaction, SignerError>;
}
