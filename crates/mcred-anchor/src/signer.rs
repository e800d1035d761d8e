//! Signing identity backed by an account the RPC node manages.
//!
//! The node holds the key and signs through `eth_signTransaction`; the
//! returned envelope is broadcast separately by the workflow so its hash
//! is known before the network acknowledges it.

use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use mcred_core::{LedgerError, SignatureRequest, SignedTransaction, SignerError, SigningIdentity};
use serde_json::{json, Value};

use crate::rpc::{self, RpcTransport};

/// EIP-1193 "user rejected request".
const USER_REJECTED: i64 = 4001;

/// Node-managed operator account.
#[derive(Debug)]
pub struct RpcSigningIdentity {
    rpc: RpcTransport,
    address: Address,
}

impl RpcSigningIdentity {
    pub fn new(rpc_url: &str, address: Address, timeout: Duration) -> Result<Self, LedgerError> {
        Ok(Self {
            rpc: RpcTransport::new(rpc_url, timeout)?,
            address,
        })
    }

    async fn sign(&self, request: &SignatureRequest) -> Result<SignedTransaction, LedgerError> {
        let nonce = self
            .rpc
            .call(
                "eth_getTransactionCount",
                json!([request.from.to_string(), "pending"]),
            )
            .await?;

        let mut tx = json!({
            "from": request.from.to_string(),
            "to": request.to.to_string(),
            "data": rpc::encode_data(&request.data),
            "nonce": nonce,
            "chainId": rpc::quantity(alloy_primitives::U256::from(request.chain_id)),
        });
        if let Some(gas) = request.gas_limit {
            tx["gas"] = json!(rpc::quantity(gas));
        }
        if let Some(price) = request.gas_price {
            tx["gasPrice"] = json!(rpc::quantity(price));
        }

        let result = self.rpc.call("eth_signTransaction", json!([tx])).await?;
        // Nodes return either the raw envelope or `{ raw, tx }`.
        let raw = match &result {
            Value::String(s) => s.as_str(),
            other => other.get("raw").and_then(Value::as_str).ok_or_else(|| {
                LedgerError::Malformed("eth_signTransaction returned no raw envelope".to_string())
            })?,
        };
        Ok(SignedTransaction::from_raw(Bytes::from(rpc::decode_data(raw)?)))
    }
}

#[async_trait]
impl SigningIdentity for RpcSigningIdentity {
    fn address(&self) -> Option<Address> {
        Some(self.address)
    }

    async fn authorize(
        &self,
        request: &SignatureRequest,
    ) -> Result<SignedTransaction, SignerError> {
        if request.from != self.address {
            return Err(SignerError::Failed(format!(
                "request is for {} but this identity is {}",
                request.from, self.address
            )));
        }
        self.sign(request).await.map_err(|e| match e {
            LedgerError::Rpc { code, .. } if code == USER_REJECTED => SignerError::Declined,
            LedgerError::Unavailable(_) => SignerError::Disconnected,
            other => SignerError::Failed(other.to_string()),
        })
    }
}
