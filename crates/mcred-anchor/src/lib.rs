//! # mcred-anchor — Ledger Anchoring
//!
//! Implementations of the ledger-side collaborators of the publication
//! workflow:
//!
//! - [`EvmLedgerClient`]: the root registry contract over Ethereum JSON-RPC.
//! - [`RpcSigningIdentity`]: an operator account the RPC node manages.
//! - [`MockLedger`] and [`MockSigner`]: in-memory stand-ins for tests and
//!   local development.
//!
//! The ABI codec for `publishRoot` and `getRoot` lives in [`abi`].

pub mod abi;
pub mod client;
pub mod config;
pub mod mock;
mod rpc;
pub mod signer;

pub use client::EvmLedgerClient;
pub use config::{EvmLedgerConfig, LedgerConfigError};
pub use mock::{MockCalls, MockLedger, MockSigner, ALREADY_PUBLISHED};
pub use signer::RpcSigningIdentity;
