//! # Proof Document Parsing
//!
//! Uploaded documents are either a single-term receipt or a multi-term
//! journey receipt. [`ProofDocument::parse()`] decides which at the boundary
//! and hands downstream code an explicit variant.
//!
//! A document may name its variant with `"document_type": "term"` or
//! `"journey"`. Without that field the document must carry the full
//! required field set of exactly one variant.
//!
//! Parsing goes straight from text to the typed receipt. Going through an
//! intermediate `serde_json::Value` would re-encode the proof material.

use serde::de::IgnoredAny;
use serde::Deserialize;
use thiserror::Error;

use crate::error::CoreError;
use crate::receipt::{JourneyReceipt, TermReceipt};

/// Failure to turn text into a [`ProofDocument`].
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The text is not a receipt of either kind.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The text parsed as a receipt but violates a receipt invariant.
    #[error(transparent)]
    Invalid(#[from] CoreError),
}

/// A parsed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofDocument {
    Term(TermReceipt),
    Journey(JourneyReceipt),
}

const TERM_FIELDS: &[&str] = &[
    "term_id",
    "student_id",
    "verkle_root",
    "revealed_courses",
    "course_proofs",
    "proof_type",
    "generated_at",
];

const JOURNEY_FIELDS: &[&str] = &[
    "student_id",
    "generation_timestamp",
    "terms_included",
    "term_receipts",
];

/// Which top-level keys are present. Values are skipped, not decoded.
#[derive(Deserialize)]
struct Probe {
    #[serde(default)]
    document_type: Option<String>,
    #[serde(default)]
    term_id: Option<IgnoredAny>,
    #[serde(default)]
    student_id: Option<IgnoredAny>,
    #[serde(default)]
    verkle_root: Option<IgnoredAny>,
    #[serde(default)]
    revealed_courses: Option<IgnoredAny>,
    #[serde(default)]
    course_proofs: Option<IgnoredAny>,
    #[serde(default)]
    proof_type: Option<IgnoredAny>,
    #[serde(default)]
    generated_at: Option<IgnoredAny>,
    #[serde(default)]
    generation_timestamp: Option<IgnoredAny>,
    #[serde(default)]
    terms_included: Option<IgnoredAny>,
    #[serde(default)]
    term_receipts: Option<IgnoredAny>,
}

impl Probe {
    fn has(&self, field: &str) -> bool {
        match field {
            "term_id" => self.term_id.is_some(),
            "student_id" => self.student_id.is_some(),
            "verkle_root" => self.verkle_root.is_some(),
            "revealed_courses" => self.revealed_courses.is_some(),
            "course_proofs" => self.course_proofs.is_some(),
            "proof_type" => self.proof_type.is_some(),
            "generated_at" => self.generated_at.is_some(),
            "generation_timestamp" => self.generation_timestamp.is_some(),
            "terms_included" => self.terms_included.is_some(),
            "term_receipts" => self.term_receipts.is_some(),
            _ => false,
        }
    }

    fn missing(&self, fields: &[&'static str]) -> Vec<&'static str> {
        fields.iter().copied().filter(|f| !self.has(f)).collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Term,
    Journey,
}

impl ProofDocument {
    /// Parse and validate an uploaded document.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let probe: Probe = serde_json::from_str(text).map_err(|e| {
            DocumentError::MalformedDocument(format!("not a JSON object: {e}"))
        })?;

        let kind = match probe.document_type.as_deref() {
            Some("term") => Kind::Term,
            Some("journey") => Kind::Journey,
            Some(other) => {
                return Err(DocumentError::MalformedDocument(format!(
                    "unknown document_type {other:?}"
                )))
            }
            None => {
                let term_missing = probe.missing(TERM_FIELDS);
                let journey_missing = probe.missing(JOURNEY_FIELDS);
                match (term_missing.is_empty(), journey_missing.is_empty()) {
                    (true, false) => Kind::Term,
                    (false, true) => Kind::Journey,
                    (true, true) => {
                        return Err(DocumentError::MalformedDocument(
                            "document carries the fields of both a term and a journey receipt"
                                .to_string(),
                        ))
                    }
                    (false, false) => {
                        return Err(DocumentError::MalformedDocument(format!(
                            "not a term receipt (missing {}); not a journey receipt (missing {})",
                            term_missing.join(", "),
                            journey_missing.join(", ")
                        )))
                    }
                }
            }
        };

        match kind {
            Kind::Term => {
                let receipt: TermReceipt = serde_json::from_str(text).map_err(|e| {
                    DocumentError::MalformedDocument(format!("invalid term receipt: {e}"))
                })?;
                receipt.validate()?;
                Ok(Self::Term(receipt))
            }
            Kind::Journey => {
                let receipt: JourneyReceipt = serde_json::from_str(text).map_err(|e| {
                    DocumentError::MalformedDocument(format!("invalid journey receipt: {e}"))
                })?;
                receipt.validate()?;
                Ok(Self::Journey(receipt))
            }
        }
    }

    /// The document as a journey receipt. A single-term receipt is wrapped
    /// into a one-term journey for the same student.
    pub fn into_journey(self) -> JourneyReceipt {
        match self {
            Self::Journey(j) => j,
            Self::Term(t) => JourneyReceipt {
                student_id: t.student_id.clone(),
                receipt_type: Default::default(),
                generation_timestamp: t.generated_at,
                terms_included: vec![t.term_id.clone()],
                courses_filter: Vec::new(),
                term_receipts: [(t.term_id.clone(), t)].into_iter().collect(),
                blockchain_ready: false,
            },
        }
    }

    /// Short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Term(_) => "term",
            Self::Journey(_) => "journey",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERM: &str = r#"{
        "term_id": "T1",
        "student_id": "S1",
        "verkle_root": "0x1111111111111111111111111111111111111111111111111111111111111111",
        "revealed_courses": [
            {"course_id": "c1", "course_name": "Algebra", "grade": "A", "credits": 3}
        ],
        "course_proofs": {"c1": {"siblings": ["0xaa", "0xbb"]}},
        "proof_type": "verkle",
        "generated_at": "2024-05-01T12:00:00Z"
    }"#;

    fn journey_text() -> String {
        format!(
            r#"{{
                "student_id": "S1",
                "generation_timestamp": "2024-05-02T09:30:00Z",
                "terms_included": ["T1"],
                "term_receipts": {{"T1": {TERM}}},
                "blockchain_ready": true
            }}"#
        )
    }

    #[test]
    fn term_document_is_detected() {
        let doc = ProofDocument::parse(TERM).unwrap();
        assert_eq!(doc.kind(), "term");
    }

    #[test]
    fn journey_document_is_detected() {
        let doc = ProofDocument::parse(&journey_text()).unwrap();
        match doc {
            ProofDocument::Journey(j) => assert_eq!(j.term_receipts.len(), 1),
            other => panic!("expected journey, got {}", other.kind()),
        }
    }

    #[test]
    fn explicit_document_type_wins() {
        let text = TERM.replacen('{', r#"{"document_type": "term","#, 1);
        assert_eq!(ProofDocument::parse(&text).unwrap().kind(), "term");

        let text = TERM.replacen('{', r#"{"document_type": "journey","#, 1);
        let err = ProofDocument::parse(&text).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));
    }

    #[test]
    fn unknown_shape_names_missing_fields() {
        let err = ProofDocument::parse(r#"{"student_id": "S1"}"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("verkle_root"));
        assert!(msg.contains("term_receipts"));
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(
            ProofDocument::parse("[1, 2]"),
            Err(DocumentError::MalformedDocument(_))
        ));
    }

    #[test]
    fn invariant_violation_is_invalid() {
        let text = TERM.replace(r#""c1": {"siblings""#, r#""c9": {"siblings""#);
        assert!(matches!(
            ProofDocument::parse(&text),
            Err(DocumentError::Invalid(CoreError::MalformedReceipt(_)))
        ));
    }

    #[test]
    fn proof_bytes_survive_parsing() {
        let doc = ProofDocument::parse(TERM).unwrap();
        let ProofDocument::Term(t) = doc else {
            panic!("expected term");
        };
        let proof = &t.course_proofs[&crate::CourseId::new("c1").unwrap()];
        assert_eq!(proof.as_json(), r#"{"siblings": ["0xaa", "0xbb"]}"#);
    }

    #[test]
    fn term_wraps_into_journey() {
        let journey = ProofDocument::parse(TERM).unwrap().into_journey();
        journey.validate().unwrap();
        assert_eq!(journey.terms_included.len(), 1);
    }
}
