//! # Ledger Value Types
//!
//! Values that cross the boundary between the publication workflow and its
//! collaborators: the issuer backend's term roots, gas estimates, the
//! transaction the signing identity is asked to authorize, and what the
//! ledger reports back.
//!
//! All gas and cost quantities are `U256` in the native token's smallest
//! unit. Conversion to a decimal denomination is a presentation concern.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::commitment::RootCommitment;
use crate::error::CoreError;
use crate::identity::TermId;

/// Response of `GET /terms/{id}/roots`.
///
/// The root is kept as the raw string the backend sent; it is validated by
/// [`TermRoots::commitment()`] when the publication workflow needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRoots {
    pub verkle_root: String,
    pub total_students: u64,
}

impl TermRoots {
    /// Parse the backend's root into a commitment.
    pub fn commitment(&self) -> Result<RootCommitment, CoreError> {
        RootCommitment::parse(&self.verkle_root)
    }
}

/// Arguments of the registry's publish entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishCall {
    pub root: RootCommitment,
    pub term_id: TermId,
    pub total_students: U256,
}

/// Advisory cost preview for a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub gas_limit: U256,
    pub gas_price: U256,
    /// `gas_limit × gas_price`.
    pub max_cost: U256,
}

impl GasEstimate {
    /// Build an estimate; `None` if the product overflows 256 bits.
    pub fn new(gas_limit: U256, gas_price: U256) -> Option<Self> {
        let max_cost = gas_limit.checked_mul(gas_price)?;
        Some(Self {
            gas_limit,
            gas_price,
            max_cost,
        })
    }
}

/// A transaction the signing identity is asked to authorize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

/// Hash of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(pub B256);

impl TxHash {
    /// Parse a `0x`-prefixed 32-byte hash.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let root = RootCommitment::parse(input).map_err(|_| CoreError::InvalidIdentifier {
            kind: "transaction hash",
            reason: format!("{input:?} is not a 32-byte hex value"),
        })?;
        Ok(Self(root.as_b256()))
    }

    /// Lowercase hex with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", alloy_primitives::hex::encode(self.0))
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for TxHash {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TxHash> for String {
    fn from(hash: TxHash) -> Self {
        hash.to_hex()
    }
}

/// A signed, broadcast-ready transaction.
///
/// The hash is computed locally from the raw bytes, so it is known even if
/// the network's acknowledgement of the broadcast is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    raw: Bytes,
    hash: TxHash,
}

impl SignedTransaction {
    /// Wrap raw signed bytes, deriving the transaction hash.
    pub fn from_raw(raw: Bytes) -> Self {
        let hash = TxHash(keccak256(&raw));
        Self { raw, hash }
    }

    /// The raw signed envelope.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// The transaction hash.
    pub fn hash(&self) -> TxHash {
        self.hash
    }
}

/// Execution status of an included transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    Reverted,
}

/// Receipt of a transaction that has been included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: U256,
    pub status: TxStatus,
}

/// What the registry reports for a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootLookup {
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_id: Option<String>,
    pub total_students: U256,
    /// Ledger timestamp (seconds) at which the root was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Address>,
}

/// Body of `PUT /terms/{id}/blockchain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub publisher_address: Address,
}
