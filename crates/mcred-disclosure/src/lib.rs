//! # mcred-disclosure — Selective Disclosure
//!
//! Derives a reduced [`JourneyReceipt`](mcred_core::JourneyReceipt) that
//! reveals a chosen subset of terms and courses while remaining verifiable
//! against each term's original root commitment.
//!
//! - [`filter`]: the pure filter. No I/O, no clock unless asked.
//! - [`session`]: the operator's selection, held as an explicit value and
//!   snapshotted into an immutable [`Selection`] before filtering.
//! - [`export`]: snapshot, filter, validate, and render as UTF-8 JSON.
//!
//! ## Guarantees
//!
//! - Proof material of every retained course is byte-identical to the
//!   source receipt.
//! - Root commitments are carried over unchanged. They are never recomputed.
//! - Filtering a filtered receipt with the same selection changes nothing
//!   but the generation timestamp.

pub mod error;
pub mod export;
pub mod filter;
pub mod session;

pub use error::DisclosureError;
pub use export::{export_receipt, ExportedReceipt};
pub use filter::{filter_receipt, filter_receipt_at};
pub use session::{Selection, SelectionSession};
