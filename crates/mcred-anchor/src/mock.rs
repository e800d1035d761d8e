//! In-memory ledger and signer for development and tests.
//!
//! [`MockLedger`] behaves like the registry contract: it rejects a root that
//! is already published, includes broadcast transactions after a
//! configurable number of receipt polls, and answers `getRoot` from what it
//! has included. Failures at each step can be injected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use mcred_core::{
    GasEstimate, LedgerClient, LedgerError, PublishCall, RootCommitment, RootLookup,
    SignatureRequest, SignedTransaction, SignerError, SigningIdentity, TxHash, TxReceipt, TxStatus,
};
use parking_lot::Mutex;

use crate::abi;

/// Revert reason for a root that is already in the registry.
pub const ALREADY_PUBLISHED: &str = "root already published";

const MOCK_GAS_LIMIT: u64 = 60_000;
const MOCK_GAS_PRICE: u64 = 20_000_000_000;
const MOCK_GAS_USED: u64 = 48_211;
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Number of calls the mock has served, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub estimates: u64,
    pub simulations: u64,
    pub broadcasts: u64,
    pub receipt_polls: u64,
    pub lookups: u64,
}

#[derive(Debug)]
struct PendingTx {
    call: Option<PublishCall>,
    publisher: Option<Address>,
    polls: u32,
    receipt: Option<TxReceipt>,
}

#[derive(Debug, Default)]
struct LedgerState {
    published: HashMap<RootCommitment, RootLookup>,
    transactions: HashMap<TxHash, PendingTx>,
    senders: HashMap<RootCommitment, Address>,
    next_block: u64,
    calls: MockCalls,
}

/// In-memory registry ledger.
#[derive(Debug)]
pub struct MockLedger {
    registry: Address,
    chain_id: u64,
    simulation_revert: Option<String>,
    estimate_error: Option<LedgerError>,
    broadcast_error: Option<LedgerError>,
    lose_acknowledgement: bool,
    confirm_after: Option<u32>,
    receipt_status: TxStatus,
    state: Mutex<LedgerState>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// A ledger that includes every transaction on the first receipt poll.
    pub fn new() -> Self {
        Self {
            registry: Address::repeat_byte(0x5e),
            chain_id: 31_337,
            simulation_revert: None,
            estimate_error: None,
            broadcast_error: None,
            lose_acknowledgement: false,
            confirm_after: Some(0),
            receipt_status: TxStatus::Success,
            state: Mutex::new(LedgerState {
                next_block: 1,
                ..LedgerState::default()
            }),
        }
    }

    /// Every simulation reverts with `reason`.
    pub fn with_simulation_revert(mut self, reason: impl Into<String>) -> Self {
        self.simulation_revert = Some(reason.into());
        self
    }

    pub fn with_estimate_error(mut self, error: LedgerError) -> Self {
        self.estimate_error = Some(error);
        self
    }

    /// Broadcasts are refused with `error` and never reach the mempool.
    pub fn with_broadcast_error(mut self, error: LedgerError) -> Self {
        self.broadcast_error = Some(error);
        self
    }

    /// Broadcasts are accepted but the acknowledgement is lost.
    pub fn with_lost_acknowledgement(mut self) -> Self {
        self.lose_acknowledgement = true;
        self
    }

    /// Number of pending receipt polls before inclusion. `None` never
    /// includes.
    pub fn with_confirm_after(mut self, polls: Option<u32>) -> Self {
        self.confirm_after = polls;
        self
    }

    /// Status of included transactions.
    pub fn with_receipt_status(mut self, status: TxStatus) -> Self {
        self.receipt_status = status;
        self
    }

    pub fn registry_address(&self) -> Address {
        self.registry
    }

    pub fn calls(&self) -> MockCalls {
        self.state.lock().calls
    }

    /// Whether `root` is in the registry.
    pub fn is_published(&self, root: &RootCommitment) -> bool {
        self.state.lock().published.contains_key(root)
    }

    /// Hashes of every transaction the mock has accepted.
    pub fn transactions(&self) -> Vec<TxHash> {
        self.state.lock().transactions.keys().copied().collect()
    }

    /// Include `hash` now with `status`, whether or not it was broadcast
    /// through this mock.
    pub fn settle_now(&self, hash: TxHash, status: TxStatus) {
        let mut state = self.state.lock();
        let state = &mut *state;
        let block = state.next_block;
        state.next_block += 1;
        let tx = state.transactions.entry(hash).or_insert_with(|| PendingTx {
            call: None,
            publisher: None,
            polls: 0,
            receipt: None,
        });
        include(&mut state.published, hash, tx, block, status);
    }
}

fn include(
    published: &mut HashMap<RootCommitment, RootLookup>,
    hash: TxHash,
    tx: &mut PendingTx,
    block: u64,
    status: TxStatus,
) {
    tx.receipt = Some(TxReceipt {
        tx_hash: hash,
        block_number: block,
        gas_used: U256::from(MOCK_GAS_USED),
        status,
    });
    if status != TxStatus::Success {
        return;
    }
    if let Some(call) = &tx.call {
        published.entry(call.root).or_insert_with(|| RootLookup {
            published: true,
            term_id: Some(call.term_id.to_string()),
            total_students: call.total_students,
            published_at: Some(GENESIS_TIMESTAMP + block * 12),
            publisher: tx.publisher,
        });
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn signature_request(
        &self,
        call: &PublishCall,
        from: Address,
        estimate: Option<&GasEstimate>,
    ) -> SignatureRequest {
        self.state.lock().senders.insert(call.root, from);
        SignatureRequest {
            from,
            to: self.registry,
            data: abi::encode_publish_root(call),
            chain_id: self.chain_id,
            gas_limit: estimate.map(|e| e.gas_limit),
            gas_price: estimate.map(|e| e.gas_price),
        }
    }

    async fn estimate_publication(
        &self,
        _call: &PublishCall,
        _from: Address,
    ) -> Result<GasEstimate, LedgerError> {
        self.state.lock().calls.estimates += 1;
        if let Some(err) = &self.estimate_error {
            return Err(err.clone());
        }
        GasEstimate::new(U256::from(MOCK_GAS_LIMIT), U256::from(MOCK_GAS_PRICE))
            .ok_or_else(|| LedgerError::Malformed("mock gas cost overflows".to_string()))
    }

    async fn simulate_publication(
        &self,
        call: &PublishCall,
        _from: Address,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        state.calls.simulations += 1;
        if let Some(reason) = &self.simulation_revert {
            return Err(LedgerError::Reverted {
                reason: reason.clone(),
            });
        }
        if state.published.contains_key(&call.root) {
            return Err(LedgerError::Reverted {
                reason: ALREADY_PUBLISHED.to_string(),
            });
        }
        Ok(())
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock();
        state.calls.broadcasts += 1;
        if let Some(err) = &self.broadcast_error {
            return Err(err.clone());
        }

        let hash = tx.hash();
        let call = abi::decode_publish_root(tx.raw()).ok();
        let publisher = call
            .as_ref()
            .and_then(|c| state.senders.get(&c.root).copied());
        state.transactions.entry(hash).or_insert(PendingTx {
            call,
            publisher,
            polls: 0,
            receipt: None,
        });

        if self.lose_acknowledgement {
            return Err(LedgerError::Unavailable(
                "connection reset before acknowledgement".to_string(),
            ));
        }
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, LedgerError> {
        let mut state = self.state.lock();
        let state = &mut *state;
        state.calls.receipt_polls += 1;

        let Some(tx) = state.transactions.get_mut(hash) else {
            return Ok(None);
        };
        if tx.receipt.is_none() {
            match self.confirm_after {
                Some(after) if tx.polls >= after => {
                    let block = state.next_block;
                    state.next_block += 1;
                    include(&mut state.published, *hash, tx, block, self.receipt_status);
                }
                _ => tx.polls += 1,
            }
        }
        Ok(tx.receipt.clone())
    }

    async fn lookup_root(&self, root: &RootCommitment) -> Result<RootLookup, LedgerError> {
        let mut state = self.state.lock();
        state.calls.lookups += 1;
        Ok(state.published.get(root).cloned().unwrap_or(RootLookup {
            published: false,
            term_id: None,
            total_students: U256::ZERO,
            published_at: None,
            publisher: None,
        }))
    }
}

/// In-memory signing identity.
///
/// Signed envelopes are the request calldata followed by an 8-byte counter,
/// so every authorization yields a distinct hash.
#[derive(Debug)]
pub struct MockSigner {
    address: Option<Address>,
    decline: bool,
    counter: AtomicU64,
    requests: Mutex<Vec<SignatureRequest>>,
}

impl MockSigner {
    /// A connected identity that approves every request.
    pub fn new(address: Address) -> Self {
        Self {
            address: Some(address),
            decline: false,
            counter: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// An identity with no connected account.
    pub fn disconnected() -> Self {
        Self {
            address: None,
            ..Self::new(Address::ZERO)
        }
    }

    /// A connected identity whose operator declines every request.
    pub fn declining(address: Address) -> Self {
        Self {
            decline: true,
            ..Self::new(address)
        }
    }

    /// Every request this identity was asked to authorize.
    pub fn requests(&self) -> Vec<SignatureRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SigningIdentity for MockSigner {
    fn address(&self) -> Option<Address> {
        self.address
    }

    async fn authorize(
        &self,
        request: &SignatureRequest,
    ) -> Result<SignedTransaction, SignerError> {
        self.requests.lock().push(request.clone());
        if self.address.is_none() {
            return Err(SignerError::Disconnected);
        }
        if self.decline {
            return Err(SignerError::Declined);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut raw = request.data.to_vec();
        raw.extend_from_slice(&n.to_be_bytes());
        Ok(SignedTransaction::from_raw(Bytes::from(raw)))
    }
}
