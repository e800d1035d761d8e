//! # EVM Registry Client
//!
//! [`LedgerClient`] over Ethereum JSON-RPC against the root registry
//! contract.
//!
//! | Operation | RPC method |
//! |-----------|------------|
//! | estimate | `eth_estimateGas`, `eth_gasPrice` |
//! | simulate | `eth_call` at `latest` |
//! | broadcast | `eth_sendRawTransaction` |
//! | receipt | `eth_getTransactionReceipt` |
//! | lookup | `eth_call` of `getRoot` |
//!
//! This client never signs. Signatures come from a
//! [`SigningIdentity`](mcred_core::SigningIdentity).

use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use mcred_core::{
    GasEstimate, LedgerClient, LedgerError, PublishCall, RootCommitment, RootLookup,
    SignatureRequest, SignedTransaction, TxHash, TxReceipt, TxStatus,
};
use serde_json::{json, Value};

use crate::abi;
use crate::config::EvmLedgerConfig;
use crate::rpc::{self, RpcTransport};

/// Registry client for EVM-compatible chains.
#[derive(Debug)]
pub struct EvmLedgerClient {
    rpc: RpcTransport,
    config: EvmLedgerConfig,
}

impl EvmLedgerClient {
    pub fn new(config: EvmLedgerConfig) -> Result<Self, LedgerError> {
        let rpc = RpcTransport::new(&config.rpc_url, Duration::from_secs(config.timeout_secs))?;
        Ok(Self { rpc, config })
    }

    pub fn config(&self) -> &EvmLedgerConfig {
        &self.config
    }

    fn call_object(&self, from: Option<Address>, data: &[u8]) -> Value {
        let mut tx = json!({
            "to": self.config.registry_address.to_string(),
            "data": rpc::encode_data(data),
        });
        if let Some(from) = from {
            tx["from"] = json!(from.to_string());
        }
        tx
    }
}

#[async_trait]
impl LedgerClient for EvmLedgerClient {
    fn signature_request(
        &self,
        call: &PublishCall,
        from: Address,
        estimate: Option<&GasEstimate>,
    ) -> SignatureRequest {
        SignatureRequest {
            from,
            to: self.config.registry_address,
            data: abi::encode_publish_root(call),
            chain_id: self.config.chain_id,
            gas_limit: estimate.map(|e| e.gas_limit),
            gas_price: estimate.map(|e| e.gas_price),
        }
    }

    async fn estimate_publication(
        &self,
        call: &PublishCall,
        from: Address,
    ) -> Result<GasEstimate, LedgerError> {
        let tx = self.call_object(Some(from), &abi::encode_publish_root(call));
        let gas_limit = rpc::parse_quantity(&self.rpc.call("eth_estimateGas", json!([tx])).await?)?;
        let gas_price = rpc::parse_quantity(&self.rpc.call("eth_gasPrice", json!([])).await?)?;
        GasEstimate::new(gas_limit, gas_price).ok_or_else(|| {
            LedgerError::Malformed(format!(
                "gas cost overflows: limit {gas_limit} at price {gas_price}"
            ))
        })
    }

    async fn simulate_publication(
        &self,
        call: &PublishCall,
        from: Address,
    ) -> Result<(), LedgerError> {
        let tx = self.call_object(Some(from), &abi::encode_publish_root(call));
        self.rpc.call("eth_call", json!([tx, "latest"])).await?;
        Ok(())
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError> {
        let result = self
            .rpc
            .call("eth_sendRawTransaction", json!([rpc::encode_data(tx.raw())]))
            .await?;
        let hash = result.as_str().ok_or_else(|| {
            LedgerError::Malformed("eth_sendRawTransaction returned non-string result".to_string())
        })?;
        TxHash::parse(hash).map_err(|e| LedgerError::Malformed(e.to_string()))
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, LedgerError> {
        let receipt = self
            .rpc
            .call("eth_getTransactionReceipt", json!([hash.to_hex()]))
            .await?;

        // Null receipt, or one without a block, means still pending.
        if receipt.is_null() {
            return Ok(None);
        }
        let block = match receipt.get("blockNumber") {
            Some(b) if !b.is_null() => rpc::parse_u64_quantity(b)?,
            _ => return Ok(None),
        };

        let status = match receipt.get("status").and_then(Value::as_str) {
            Some("0x1") => TxStatus::Success,
            Some(_) => TxStatus::Reverted,
            None => {
                return Err(LedgerError::Malformed(
                    "receipt has no status field".to_string(),
                ))
            }
        };
        let gas_used = match receipt.get("gasUsed") {
            Some(g) => rpc::parse_quantity(g)?,
            None => U256::ZERO,
        };

        Ok(Some(TxReceipt {
            tx_hash: *hash,
            block_number: block,
            gas_used,
            status,
        }))
    }

    async fn lookup_root(&self, root: &RootCommitment) -> Result<RootLookup, LedgerError> {
        let tx = self.call_object(None, &abi::encode_get_root(root));
        let result = self.rpc.call("eth_call", json!([tx, "latest"])).await?;
        let data = result
            .as_str()
            .ok_or_else(|| {
                LedgerError::Malformed("eth_call returned non-string result".to_string())
            })?;
        abi::decode_get_root(&rpc::decode_data(data)?)
            .map_err(|e| LedgerError::Malformed(format!("getRoot: {e}")))
    }
}
