//! # mcred-verify — Verification Result Aggregation
//!
//! [`aggregate()`] reconciles the external verifier's response with the
//! receipt that was actually submitted. It is a pure function.
//!
//! [`JourneyVerifier`] is the caller: it submits a receipt through a
//! [`ReceiptVerifier`](mcred_core::ReceiptVerifier), allows one outstanding
//! request at a time, and always hands back a complete replacement report.
//!
//! ## The `overall` entry
//!
//! - `verified` is true only for a `success` status.
//! - `ipa_verified` compares the verifier's own two counters.
//! - `details` states the verified count against the submitted receipt's
//!   locally counted courses, so a verifier that quietly narrowed the scope
//!   shows up as a mismatch.

pub mod aggregate;
pub mod verifier;

pub use aggregate::{aggregate, aggregate_failure};
pub use verifier::{JourneyVerifier, VerifyBusy};
