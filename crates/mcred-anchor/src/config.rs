use alloy_primitives::Address;
use thiserror::Error;

/// Ledger configuration problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Configuration for the EVM registry client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmLedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Address of the root registry contract.
    pub registry_address: Address,
    /// EVM chain ID (e.g., 1 for Ethereum mainnet, 11155111 for Sepolia).
    pub chain_id: u64,
    /// Operator account managed by the RPC provider, if any.
    pub publisher: Option<Address>,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl EvmLedgerConfig {
    pub fn new(rpc_url: impl Into<String>, registry_address: Address, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            registry_address,
            chain_id,
            publisher: None,
            timeout_secs: 30,
        }
    }

    pub fn with_publisher(mut self, publisher: Address) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Load from the environment.
    ///
    /// | Variable | Required |
    /// |----------|----------|
    /// | `MCRED_RPC_URL` | yes |
    /// | `MCRED_REGISTRY_ADDRESS` | yes |
    /// | `MCRED_CHAIN_ID` | yes |
    /// | `MCRED_PUBLISHER_ADDRESS` | no |
    /// | `MCRED_RPC_TIMEOUT_SECS` | no (30) |
    pub fn from_env() -> Result<Self, LedgerConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, LedgerConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(LedgerConfigError::Missing(name))
        };

        let rpc_url = required("MCRED_RPC_URL")?;
        let registry_address =
            parse_address("MCRED_REGISTRY_ADDRESS", &required("MCRED_REGISTRY_ADDRESS")?)?;
        let chain_id = required("MCRED_CHAIN_ID")?
            .trim()
            .parse::<u64>()
            .map_err(|e| LedgerConfigError::Invalid {
                name: "MCRED_CHAIN_ID",
                reason: e.to_string(),
            })?;

        let publisher = match lookup("MCRED_PUBLISHER_ADDRESS").filter(|v| !v.trim().is_empty()) {
            Some(v) => Some(parse_address("MCRED_PUBLISHER_ADDRESS", &v)?),
            None => None,
        };

        let timeout_secs = match lookup("MCRED_RPC_TIMEOUT_SECS") {
            Some(v) => v.trim().parse::<u64>().map_err(|e| LedgerConfigError::Invalid {
                name: "MCRED_RPC_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => 30,
        };

        Ok(Self {
            rpc_url,
            registry_address,
            chain_id,
            publisher,
            timeout_secs,
        })
    }
}

/// Parse a `0x`-prefixed 20-byte address.
pub fn parse_address(name: &'static str, value: &str) -> Result<Address, LedgerConfigError> {
    let value = value.trim();
    if !is_valid_eth_address(value) {
        return Err(LedgerConfigError::Invalid {
            name,
            reason: format!("{value:?} is not a 0x-prefixed 20-byte address"),
        });
    }
    value.parse::<Address>().map_err(|e| LedgerConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn is_valid_eth_address(addr: &str) -> bool {
    addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit())
}
