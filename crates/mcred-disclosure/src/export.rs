//! # Receipt Export
//!
//! Turns the operator's current selection into a shareable document:
//! pretty-printed UTF-8 JSON with a suggested file name and the content
//! digest a recipient can cite.

use mcred_core::{ContentDigest, JourneyReceipt};

use crate::error::DisclosureError;
use crate::filter::filter_receipt;
use crate::session::SelectionSession;

/// A rendered selective-disclosure receipt.
#[derive(Debug, Clone)]
pub struct ExportedReceipt {
    /// Suggested file name: `selective_receipt_<student>_<unix-seconds>.json`.
    /// Characters other than ASCII alphanumerics, `-` and `_` in the
    /// student id become `_`.
    pub file_name: String,
    /// The document text.
    pub contents: String,
    /// SHA-256 over the canonical form of `receipt`.
    pub digest: ContentDigest,
    pub receipt: JourneyReceipt,
}

/// Snapshot the session, filter, and render.
///
/// Rejects a session with no selected terms.
pub fn export_receipt(
    full: &JourneyReceipt,
    session: &SelectionSession,
) -> Result<ExportedReceipt, DisclosureError> {
    let selection = session.snapshot();
    if selection.is_empty() {
        return Err(DisclosureError::EmptySelection);
    }

    let receipt = filter_receipt(full, &selection)?;
    let contents = serde_json::to_string_pretty(&receipt)?;
    let digest = receipt.content_digest()?;
    let file_name = format!(
        "selective_receipt_{}_{}.json",
        file_name_component(receipt.student_id.as_str()),
        receipt.generation_timestamp.timestamp()
    );

    tracing::info!(
        file_name = %file_name,
        digest = %digest,
        terms = receipt.term_receipts.len(),
        "exported selective-disclosure receipt"
    );

    Ok(ExportedReceipt {
        file_name,
        contents,
        digest,
        receipt,
    })
}

fn file_name_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
