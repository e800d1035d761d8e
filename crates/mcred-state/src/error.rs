use mcred_core::{AttemptId, IdempotencyToken, TermId, TxHash};
use thiserror::Error;

/// A publish request refused at the `Idle` boundary. No attempt is
/// started and the ledger is not touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishRejected {
    /// No signing identity is connected.
    #[error("no signing identity connected: connect a wallet to publish")]
    NoSigningIdentity,

    /// Another attempt for the term is still in progress.
    #[error("term {term_id} already has a publication in progress ({attempt_id})")]
    AlreadyInFlight {
        term_id: TermId,
        attempt_id: AttemptId,
    },

    /// The request's idempotency token was already broadcast.
    #[error("{0} was already used for a broadcast")]
    DuplicateToken(IdempotencyToken),

    /// A previous transaction for the term has no known outcome yet.
    #[error("term {term_id}: outcome of earlier transaction {tx_hash} is still unknown")]
    UnresolvedPriorTransaction { term_id: TermId, tx_hash: TxHash },
}
