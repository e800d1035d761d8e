//! # Verification Results
//!
//! Shapes exchanged with the external verifier and produced by the
//! aggregator. A [`VerificationReport`] maps a scope key (`"overall"` or a
//! term identifier) to a [`VerificationResult`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::TermId;

/// Key of the synthesized aggregate entry in a [`VerificationReport`].
pub const OVERALL_KEY: &str = "overall";

/// Status reported by the external verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierStatus {
    Success,
    PartialFailure,
    Error,
    /// Forward-compatible catch-all for statuses introduced later.
    #[serde(other)]
    Unknown,
}

impl VerifierStatus {
    /// The wire string of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialFailure => "partial_failure",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for VerifierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying one scope (the whole journey or one term).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub courses_verified: usize,
    #[serde(default)]
    pub courses_failed: usize,
    #[serde(default)]
    pub blockchain_verified: bool,
    /// Only set on the `overall` entry: every course the verifier counted
    /// passed its inclusion proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipa_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    /// A failed result carrying only an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            status: VerifierStatus::Error.as_str().to_string(),
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Response body of `POST /verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierResponse {
    pub status: VerifierStatus,
    pub verified_courses: usize,
    pub total_courses: usize,
    #[serde(default)]
    pub term_results: BTreeMap<TermId, VerificationResult>,
}

/// Reconciled verification outcome keyed by scope.
pub type VerificationReport = BTreeMap<String, VerificationResult>;
