//! # mcred-cli — Operator CLI for Academic Micro-Credentials
//!
//! Provides the `mcred` command-line interface over the credential
//! libraries.
//!
//! ## Subcommands
//!
//! - `mcred inspect`: Parse a receipt and summarize it.
//! - `mcred disclose`: Export a selective-disclosure receipt.
//! - `mcred verify`: Submit a receipt to the verifier and print the report.
//! - `mcred publish`: Anchor a term's root on the ledger.
//! - `mcred lookup`: Read a root's registry entry.
//!
//! ```bash
//! mcred inspect receipt.json
//! mcred disclose --receipt receipt.json --term 2024-FALL --course 2025-SPRING:CS201
//! mcred publish --term 2024-FALL --timeout-secs 300
//! ```

pub mod config;
pub mod disclose;
pub mod inspect;
pub mod lookup;
pub mod publish;
pub mod state;
pub mod units;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use mcred_core::ProofDocument;

/// Read and parse a receipt file.
pub fn read_document(path: &Path) -> Result<ProofDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ProofDocument::parse(&text)
        .with_context(|| format!("{} is not a valid receipt", path.display()))
}
