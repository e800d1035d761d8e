//! # Receipt Data Model
//!
//! Canonical shape of academic receipts. A [`TermReceipt`] reveals courses
//! from one term together with one inclusion proof per revealed course,
//! all against the term's unchanged [`RootCommitment`]. A
//! [`JourneyReceipt`] bundles term receipts for one student.
//!
//! ## Invariants
//!
//! - Every revealed course has exactly one proof keyed by its identifier,
//!   and there are no proofs for courses that are not revealed.
//! - `terms_included` lists exactly the keys of `term_receipts`.
//!
//! Receipts are read-only artifacts. They are produced by the issuing
//! backend or derived by the disclosure filter, and [`validate()`]
//! (`JourneyReceipt::validate`) is the gate both paths pass through.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::canonical::CanonicalBytes;
use crate::commitment::RootCommitment;
use crate::digest::{sha256_digest, ContentDigest};
use crate::error::CoreError;
use crate::identity::{CourseId, StudentId, TermId};

/// One completed course as it appears in a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: CourseId,
    pub course_name: String,
    pub grade: String,
    /// Kept as a JSON number so that `3` and `3.0` survive unchanged.
    pub credits: serde_json::Number,
}

/// Inclusion proof for one course, held as the exact JSON the issuer
/// produced.
///
/// Equality compares the raw text, so two proofs are equal only if they
/// are byte-identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proof(Box<RawValue>);

impl Proof {
    /// Wrap proof material given as JSON text.
    pub fn from_json(json: impl Into<String>) -> Result<Self, CoreError> {
        RawValue::from_string(json.into())
            .map(Self)
            .map_err(|e| CoreError::MalformedReceipt(format!("proof is not valid JSON: {e}")))
    }

    /// The raw JSON text of the proof.
    pub fn as_json(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for Proof {
    fn eq(&self, other: &Self) -> bool {
        self.as_json() == other.as_json()
    }
}

impl Eq for Proof {}

/// Proof material and revealed courses for a single term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermReceipt {
    pub term_id: TermId,
    pub student_id: StudentId,
    pub verkle_root: RootCommitment,
    pub revealed_courses: Vec<Course>,
    pub course_proofs: BTreeMap<CourseId, Proof>,
    /// Revealed-course count. Optional on documents from the issuer; the
    /// disclosure filter always writes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_courses: Option<usize>,
    pub proof_type: String,
    #[serde(default)]
    pub selective_disclosure: bool,
    #[serde(default)]
    pub verification_path: serde_json::Value,
    pub generated_at: DateTime<Utc>,
}

impl TermReceipt {
    /// Check the revealed-course/proof correspondence.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen = BTreeSet::new();
        for course in &self.revealed_courses {
            if !seen.insert(&course.course_id) {
                return Err(CoreError::MalformedReceipt(format!(
                    "term {}: course {} revealed twice",
                    self.term_id, course.course_id
                )));
            }
            if !self.course_proofs.contains_key(&course.course_id) {
                return Err(CoreError::MalformedReceipt(format!(
                    "term {}: no proof for revealed course {}",
                    self.term_id, course.course_id
                )));
            }
        }

        if let Some(orphan) = self.course_proofs.keys().find(|id| !seen.contains(id)) {
            return Err(CoreError::MalformedReceipt(format!(
                "term {}: proof for course {orphan} which is not revealed",
                self.term_id
            )));
        }

        if let Some(declared) = self.total_courses {
            if declared != self.revealed_courses.len() {
                return Err(CoreError::MalformedReceipt(format!(
                    "term {}: total_courses is {declared} but {} courses are revealed",
                    self.term_id,
                    self.revealed_courses.len()
                )));
            }
        }

        Ok(())
    }

    /// Identifiers of the revealed courses, in receipt order.
    pub fn course_ids(&self) -> impl Iterator<Item = &CourseId> {
        self.revealed_courses.iter().map(|c| &c.course_id)
    }

    /// Number of revealed courses.
    pub fn course_count(&self) -> usize {
        self.revealed_courses.len()
    }
}

/// Flags describing how a journey receipt was scoped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptType {
    #[serde(default)]
    pub selective_disclosure: bool,
    #[serde(default)]
    pub specific_courses: bool,
    #[serde(default)]
    pub specific_terms: bool,
}

/// Multi-term receipt for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyReceipt {
    pub student_id: StudentId,
    #[serde(default)]
    pub receipt_type: ReceiptType,
    pub generation_timestamp: DateTime<Utc>,
    pub terms_included: Vec<TermId>,
    #[serde(default)]
    pub courses_filter: Vec<CourseId>,
    pub term_receipts: BTreeMap<TermId, TermReceipt>,
    #[serde(default)]
    pub blockchain_ready: bool,
}

impl JourneyReceipt {
    /// Check every structural invariant of the receipt and its terms.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut listed = BTreeSet::new();
        for term in &self.terms_included {
            if !listed.insert(term) {
                return Err(CoreError::MalformedReceipt(format!(
                    "term {term} listed twice in terms_included"
                )));
            }
        }

        let keys: BTreeSet<&TermId> = self.term_receipts.keys().collect();
        if listed != keys {
            return Err(CoreError::MalformedReceipt(
                "terms_included does not match the term_receipts keys".to_string(),
            ));
        }

        for (key, term) in &self.term_receipts {
            if key != &term.term_id {
                return Err(CoreError::MalformedReceipt(format!(
                    "term_receipts key {key} holds receipt for term {}",
                    term.term_id
                )));
            }
            if term.student_id != self.student_id {
                return Err(CoreError::MalformedReceipt(format!(
                    "term {key} belongs to student {}, not {}",
                    term.student_id, self.student_id
                )));
            }
            term.validate()?;
        }

        Ok(())
    }

    /// Total revealed courses across every term, counted locally.
    pub fn total_course_count(&self) -> usize {
        self.term_receipts.values().map(TermReceipt::course_count).sum()
    }

    /// SHA-256 over the JCS-canonical form of the receipt.
    pub fn content_digest(&self) -> Result<ContentDigest, CoreError> {
        let canonical = CanonicalBytes::new(self)?;
        Ok(sha256_digest(&canonical))
    }
}
