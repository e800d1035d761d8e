//! JSON-RPC transport shared by the ledger client and the signing identity.
//!
//! Transport failures and non-success HTTP statuses map to
//! [`LedgerError::Unavailable`]. A JSON-RPC error object maps to
//! [`LedgerError::Reverted`] when it carries a revert, and to
//! [`LedgerError::Rpc`] otherwise.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{hex, U256};
use mcred_core::LedgerError;
use serde_json::Value;

use crate::abi;

#[derive(Debug)]
pub(crate) struct RpcTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub(crate) fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a request and return its `result`.
    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        tracing::debug!(method, id, "rpc call");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Unavailable(format!("{method}: request timed out"))
                } else {
                    LedgerError::Unavailable(format!("{method}: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            return Err(LedgerError::Unavailable(format!(
                "{method}: HTTP {}",
                resp.status()
            )));
        }

        let mut json: Value = resp
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(format!("{method}: invalid JSON response: {e}")))?;

        if let Some(error) = json.get("error") {
            return Err(classify_error(error));
        }

        match json.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(LedgerError::Malformed(format!(
                "{method}: response missing 'result' field"
            ))),
        }
    }
}

fn classify_error(error: &Value) -> LedgerError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown RPC error")
        .to_string();

    let revert_data = error
        .get("data")
        .and_then(|d| d.as_str().or_else(|| d.get("data").and_then(Value::as_str)));
    if let Some(reason) = revert_data
        .and_then(|d| decode_data(d).ok())
        .and_then(|bytes| abi::decode_revert_reason(&bytes))
    {
        return LedgerError::Reverted { reason };
    }

    if let Some(rest) = message.strip_prefix("execution reverted") {
        let reason = rest.trim_start_matches(':').trim();
        return LedgerError::Reverted {
            reason: if reason.is_empty() {
                "execution reverted without a reason".to_string()
            } else {
                reason.to_string()
            },
        };
    }

    LedgerError::Rpc { code, message }
}

/// Decode `0x`-prefixed hex data.
pub(crate) fn decode_data(s: &str) -> Result<Vec<u8>, LedgerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| LedgerError::Malformed(format!("invalid hex data {s:?}: {e}")))
}

/// `0x`-prefixed hex encoding.
pub(crate) fn encode_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a hex quantity such as `"0x5208"`.
pub(crate) fn parse_quantity(value: &Value) -> Result<U256, LedgerError> {
    let s = value
        .as_str()
        .ok_or_else(|| LedgerError::Malformed(format!("expected hex quantity, got {value}")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Malformed(format!("invalid quantity {s:?}: {e}")))
}

pub(crate) fn parse_u64_quantity(value: &Value) -> Result<u64, LedgerError> {
    let q = parse_quantity(value)?;
    u64::try_from(q).map_err(|_| LedgerError::Malformed(format!("quantity {q} exceeds u64")))
}

pub(crate) fn quantity(value: U256) -> String {
    format!("0x{value:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quantities_parse() {
        assert_eq!(parse_quantity(&json!("0x5208")).unwrap(), U256::from(21_000u64));
        assert_eq!(parse_quantity(&json!("0x0")).unwrap(), U256::ZERO);
        assert_eq!(parse_u64_quantity(&json!("0x10")).unwrap(), 16);
        assert!(parse_quantity(&json!(12)).is_err());
        assert!(parse_quantity(&json!("0xzz")).is_err());
    }

    #[test]
    fn quantity_formats_without_padding() {
        assert_eq!(quantity(U256::from(21_000u64)), "0x5208");
        assert_eq!(quantity(U256::ZERO), "0x0");
    }

    #[test]
    fn revert_message_is_classified() {
        let err = classify_error(&json!({
            "code": 3,
            "message": "execution reverted: root already published"
        }));
        assert_eq!(
            err,
            LedgerError::Reverted {
                reason: "root already published".to_string()
            }
        );
    }

    #[test]
    fn revert_data_is_decoded() {
        let data = encode_data(&abi::encode_revert_reason("unauthorized publisher"));
        let err = classify_error(&json!({
            "code": 3,
            "message": "execution reverted",
            "data": data
        }));
        assert_eq!(
            err,
            LedgerError::Reverted {
                reason: "unauthorized publisher".to_string()
            }
        );
    }

    #[test]
    fn other_errors_keep_code() {
        let err = classify_error(&json!({"code": -32000, "message": "nonce too low"}));
        assert_eq!(
            err,
            LedgerError::Rpc {
                code: -32000,
                message: "nonce too low".to_string()
            }
        );
    }
}
