//! # Root Commitment
//!
//! A term's root commitment: the 32-byte digest summarizing every course
//! in the term. Receipts carry it as hex; the ledger carries it as
//! `bytes32`.
//!
//! ## Accepted Format
//!
//! An optional `0x` (or `0X`) prefix followed by exactly 64 hex digits.
//! Anything else is rejected before it can reach the network.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A 32-byte root commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootCommitment(B256);

impl RootCommitment {
    /// Parse a root commitment from hex.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);

        if digits.len() != 64 {
            return Err(CoreError::InvalidRoot {
                input: input.to_string(),
                reason: format!("expected 64 hex characters, got {}", digits.len()),
            });
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidRoot {
                input: input.to_string(),
                reason: "contains non-hex characters".to_string(),
            });
        }

        let mut bytes = [0u8; 32];
        alloy_primitives::hex::decode_to_slice(digits, &mut bytes).map_err(|e| {
            CoreError::InvalidRoot {
                input: input.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self(B256::from(bytes)))
    }

    /// Wrap raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::from(bytes))
    }

    /// The commitment as a `bytes32` word.
    pub fn as_b256(&self) -> B256 {
        self.0
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    /// Lowercase hex with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", alloy_primitives::hex::encode(self.0))
    }
}

impl std::fmt::Display for RootCommitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for RootCommitment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RootCommitment {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RootCommitment> for String {
    fn from(root: RootCommitment) -> Self {
        root.to_hex()
    }
}
