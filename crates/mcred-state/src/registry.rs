//! # Publication Registry
//!
//! Process-wide bookkeeping shared by every publish call:
//!
//! - **Single flight.** At most one attempt per term may be in a
//!   non-terminal phase. [`PublicationRegistry::claim()`] hands out a
//!   [`FlightGuard`] that releases the term when dropped.
//! - **Idempotency tokens.** A token may be recorded as broadcast once.
//!   The most recent [`TOKEN_MEMORY`] tokens are remembered.
//! - **Unresolved transactions.** When an attempt ends without knowing
//!   whether its transaction landed, the transaction is remembered for the
//!   term so the next publish can reconcile it before broadcasting again.
//!   [`PublicationRegistry::unresolved_all()`] and
//!   [`PublicationRegistry::with_unresolved()`] let a caller carry them
//!   across processes.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use mcred_core::{Address, AttemptId, IdempotencyToken, RootCommitment, TermId, TxHash, U256};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PublishRejected;

/// Number of broadcast tokens remembered before the oldest is forgotten.
pub const TOKEN_MEMORY: usize = 4096;

/// A broadcast transaction whose outcome is not yet known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedTransaction {
    pub tx_hash: TxHash,
    pub publisher: Address,
    pub verkle_root: Option<RootCommitment>,
    pub total_students: Option<U256>,
}

#[derive(Debug, Default)]
struct Inner {
    in_flight: HashMap<TermId, AttemptId>,
    broadcast_tokens: TokenMemory,
    unresolved: HashMap<TermId, UnresolvedTransaction>,
}

/// Insertion-ordered set of tokens capped at [`TOKEN_MEMORY`].
#[derive(Debug, Default)]
struct TokenMemory {
    seen: HashSet<IdempotencyToken>,
    order: VecDeque<IdempotencyToken>,
}

impl TokenMemory {
    fn contains(&self, token: &IdempotencyToken) -> bool {
        self.seen.contains(token)
    }

    fn insert(&mut self, token: IdempotencyToken) -> bool {
        if !self.seen.insert(token) {
            return false;
        }
        self.order.push_back(token);
        while self.order.len() > TOKEN_MEMORY {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

/// Shared publication bookkeeping. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct PublicationRegistry {
    inner: Arc<Mutex<Inner>>,
}

/// Exclusive claim on a term. Dropping it releases the term.
#[derive(Debug)]
pub struct FlightGuard {
    registry: PublicationRegistry,
    term_id: TermId,
    attempt_id: AttemptId,
}

impl FlightGuard {
    pub fn term_id(&self) -> &TermId {
        &self.term_id
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut inner = self.registry.inner.lock();
        if inner.in_flight.get(&self.term_id) == Some(&self.attempt_id) {
            inner.in_flight.remove(&self.term_id);
        }
    }
}

impl PublicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with transactions left unresolved by an earlier
    /// process.
    pub fn with_unresolved(
        entries: impl IntoIterator<Item = (TermId, UnresolvedTransaction)>,
    ) -> Self {
        let registry = Self::new();
        registry.inner.lock().unresolved.extend(entries);
        registry
    }

    /// Claim a term for an attempt.
    ///
    /// Rejects the claim if another attempt holds the term, or if `token`
    /// has already been broadcast.
    pub fn claim(
        &self,
        term_id: &TermId,
        attempt_id: AttemptId,
        token: IdempotencyToken,
    ) -> Result<FlightGuard, PublishRejected> {
        let mut inner = self.inner.lock();
        if let Some(holder) = inner.in_flight.get(term_id) {
            return Err(PublishRejected::AlreadyInFlight {
                term_id: term_id.clone(),
                attempt_id: *holder,
            });
        }
        if inner.broadcast_tokens.contains(&token) {
            return Err(PublishRejected::DuplicateToken(token));
        }
        inner.in_flight.insert(term_id.clone(), attempt_id);
        Ok(FlightGuard {
            registry: self.clone(),
            term_id: term_id.clone(),
            attempt_id,
        })
    }

    /// Whether an attempt currently holds the term.
    pub fn is_in_flight(&self, term_id: &TermId) -> bool {
        self.inner.lock().in_flight.contains_key(term_id)
    }

    /// Record that `token` is about to be broadcast. Returns `false` if it
    /// already was.
    pub fn record_broadcast(&self, token: IdempotencyToken) -> bool {
        self.inner.lock().broadcast_tokens.insert(token)
    }

    /// Remember a transaction whose outcome is unknown.
    pub fn remember_unresolved(&self, term_id: &TermId, tx: UnresolvedTransaction) {
        self.inner.lock().unresolved.insert(term_id.clone(), tx);
    }

    /// The unresolved transaction for a term, if any.
    pub fn unresolved(&self, term_id: &TermId) -> Option<UnresolvedTransaction> {
        self.inner.lock().unresolved.get(term_id).cloned()
    }

    /// Every unresolved transaction, keyed by term.
    pub fn unresolved_all(&self) -> BTreeMap<TermId, UnresolvedTransaction> {
        self.inner
            .lock()
            .unresolved
            .iter()
            .map(|(term_id, tx)| (term_id.clone(), tx.clone()))
            .collect()
    }

    /// Forget the unresolved transaction for a term.
    pub fn resolve(&self, term_id: &TermId) {
        self.inner.lock().unresolved.remove(term_id);
    }
}
