//! # Lookup Subcommand
//!
//! Reads a root commitment's registry entry from the ledger.

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Args;
use mcred_anchor::EvmLedgerClient;
use mcred_core::{LedgerClient, RootCommitment, RootLookup};

use crate::config::CliConfig;

/// Arguments for the `mcred lookup` subcommand.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Root commitment as 64 hex characters, optionally `0x`-prefixed.
    #[arg(long)]
    pub root: String,
}

pub async fn run_lookup(args: &LookupArgs, config: &CliConfig) -> Result<u8> {
    let root = RootCommitment::parse(&args.root)
        .with_context(|| format!("invalid root {:?}", args.root))?;
    let ledger =
        EvmLedgerClient::new(config.ledger()?).context("failed to set up the ledger client")?;
    let lookup = ledger
        .lookup_root(&root)
        .await
        .with_context(|| format!("failed to look up {root}"))?;
    print!("{}", render(&root, &lookup));
    Ok(if lookup.published { 0 } else { 1 })
}

fn render(root: &RootCommitment, lookup: &RootLookup) -> String {
    if !lookup.published {
        return format!("Root {root} is not published\n");
    }
    let mut out = format!("Root {root} is published\n");
    if let Some(term) = &lookup.term_id {
        out.push_str(&format!("  Term: {term}\n"));
    }
    out.push_str(&format!("  Students: {}\n", lookup.total_students));
    if let Some(secs) = lookup.published_at {
        let when = i64::try_from(secs)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| secs.to_string());
        out.push_str(&format!("  Published: {when}\n"));
    }
    if let Some(publisher) = lookup.publisher {
        out.push_str(&format!("  Publisher: {publisher}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcred_core::{Address, U256};

    #[test]
    fn published_entry() {
        let root = RootCommitment::from_bytes([0x11; 32]);
        let lookup = RootLookup {
            published: true,
            term_id: Some("2024-FALL".to_string()),
            total_students: U256::from(40u64),
            published_at: Some(1_700_000_000),
            publisher: Some(Address::repeat_byte(0x42)),
        };
        let out = render(&root, &lookup);
        assert!(out.contains("  Term: 2024-FALL\n"));
        assert!(out.contains("  Students: 40\n"));
        assert!(out.contains("  Published: 2023-11-14T22:13:20+00:00\n"));
        assert!(out.contains("Publisher: 0x4242"));
    }

    #[test]
    fn unpublished_entry() {
        let root = RootCommitment::from_bytes([0x22; 32]);
        let lookup = RootLookup {
            published: false,
            term_id: None,
            total_students: U256::ZERO,
            published_at: None,
            publisher: None,
        };
        assert!(render(&root, &lookup).ends_with("is not published\n"));
    }
}
