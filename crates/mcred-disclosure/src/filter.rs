//! # Receipt Filter
//!
//! `filter_receipt(full, selection)` keeps the selected terms and, within
//! each, the selected courses together with their proofs. Everything else
//! is dropped. Proofs and roots of what remains are cloned verbatim.
//!
//! ## Flags
//!
//! - `receipt_type.selective_disclosure` is always set.
//! - `receipt_type.specific_terms` is set when a term was dropped, and
//!   `specific_courses` when a course was dropped from a kept term. Both
//!   keep any value already set on the source, so re-filtering a filtered
//!   receipt does not clear them.
//! - A kept term's own `selective_disclosure` is set when any of its
//!   courses was dropped.
//!
//! Entries in `selection.courses` for terms that are not selected are
//! ignored.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use mcred_core::{CourseId, JourneyReceipt, ReceiptType, TermId, TermReceipt};

use crate::error::DisclosureError;
use crate::session::Selection;

/// Filter a receipt, stamping the result with the current time.
pub fn filter_receipt(
    full: &JourneyReceipt,
    selection: &Selection,
) -> Result<JourneyReceipt, DisclosureError> {
    filter_receipt_at(full, selection, Utc::now())
}

/// Filter a receipt, stamping the result with `generated_at`.
pub fn filter_receipt_at(
    full: &JourneyReceipt,
    selection: &Selection,
    generated_at: DateTime<Utc>,
) -> Result<JourneyReceipt, DisclosureError> {
    full.validate()?;

    let mut term_receipts = BTreeMap::new();
    let mut courses_filter = BTreeSet::new();
    let mut dropped_course = false;

    for term_id in &selection.terms {
        let source = full
            .term_receipts
            .get(term_id)
            .ok_or_else(|| DisclosureError::UnknownTerm(term_id.clone()))?;
        let wanted: BTreeSet<&CourseId> = selection.courses_in(term_id).collect();

        if let Some(course) = wanted
            .iter()
            .find(|c| !source.course_proofs.contains_key(**c))
        {
            return Err(DisclosureError::UnknownCourse {
                term: term_id.clone(),
                course: (*course).clone(),
            });
        }

        let reduced = reduce_term(source, &wanted);
        if reduced.course_count() < source.course_count() {
            dropped_course = true;
        }
        courses_filter.extend(reduced.course_ids().cloned());
        term_receipts.insert(term_id.clone(), reduced);
    }

    let terms_included: Vec<TermId> = full
        .terms_included
        .iter()
        .filter(|t| selection.terms.contains(*t))
        .cloned()
        .collect();

    let receipt = JourneyReceipt {
        student_id: full.student_id.clone(),
        receipt_type: ReceiptType {
            selective_disclosure: true,
            specific_courses: full.receipt_type.specific_courses || dropped_course,
            specific_terms: full.receipt_type.specific_terms
                || selection.terms.len() < full.term_receipts.len(),
        },
        generation_timestamp: generated_at,
        terms_included,
        courses_filter: courses_filter.into_iter().collect(),
        term_receipts,
        blockchain_ready: full.blockchain_ready,
    };

    receipt.validate()?;
    tracing::debug!(
        student_id = %receipt.student_id,
        terms = receipt.term_receipts.len(),
        courses = receipt.total_course_count(),
        "filtered receipt"
    );
    Ok(receipt)
}

fn reduce_term(source: &TermReceipt, wanted: &BTreeSet<&CourseId>) -> TermReceipt {
    let revealed_courses: Vec<_> = source
        .revealed_courses
        .iter()
        .filter(|c| wanted.contains(&c.course_id))
        .cloned()
        .collect();

    let course_proofs = source
        .course_proofs
        .iter()
        .filter(|(id, _)| wanted.contains(id))
        .map(|(id, proof)| (id.clone(), proof.clone()))
        .collect();

    let dropped = revealed_courses.len() < source.revealed_courses.len();

    TermReceipt {
        term_id: source.term_id.clone(),
        student_id: source.student_id.clone(),
        verkle_root: source.verkle_root,
        total_courses: Some(revealed_courses.len()),
        revealed_courses,
        course_proofs,
        proof_type: source.proof_type.clone(),
        selective_disclosure: source.selective_disclosure || dropped,
        verification_path: source.verification_path.clone(),
        generated_at: source.generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcred_core::{Course, Proof, RootCommitment, StudentId};

    fn course(id: &str) -> Course {
        Course {
            course_id: CourseId::new(id).unwrap(),
            course_name: format!("Course {id}"),
            grade: "B".to_string(),
            credits: 3.into(),
        }
    }

    fn term(id: &str, root: u8, courses: &[&str]) -> TermReceipt {
        TermReceipt {
            term_id: TermId::new(id).unwrap(),
            student_id: StudentId::new("S1").unwrap(),
            verkle_root: RootCommitment::from_bytes([root; 32]),
            revealed_courses: courses.iter().map(|c| course(c)).collect(),
            course_proofs: courses
                .iter()
                .map(|c| {
                    (
                        CourseId::new(*c).unwrap(),
                        Proof::from_json(format!(r#"{{ "leaf": "{c}", "path": [ 1, 2 ] }}"#))
                            .unwrap(),
                    )
                })
                .collect(),
            total_courses: Some(courses.len()),
            proof_type: "verkle".to_string(),
            selective_disclosure: false,
            verification_path: serde_json::json!({"depth": 2}),
            generated_at: Utc::now(),
        }
    }

    fn full() -> JourneyReceipt {
        let terms = vec![term("T1", 1, &["c1", "c2", "c3"]), term("T2", 2, &["c4", "c5"])];
        JourneyReceipt {
            student_id: StudentId::new("S1").unwrap(),
            receipt_type: ReceiptType::default(),
            generation_timestamp: Utc::now(),
            terms_included: terms.iter().map(|t| t.term_id.clone()).collect(),
            courses_filter: Vec::new(),
            term_receipts: terms.into_iter().map(|t| (t.term_id.clone(), t)).collect(),
            blockchain_ready: true,
        }
    }

    fn select(picks: &[(&str, &[&str])]) -> Selection {
        let mut s = Selection::default();
        for (t, courses) in picks {
            let t = TermId::new(*t).unwrap();
            s.terms.insert(t.clone());
            s.courses.insert(
                t,
                courses.iter().map(|c| CourseId::new(*c).unwrap()).collect(),
            );
        }
        s
    }

    #[test]
    fn single_term_two_courses() {
        let full = full();
        let out = filter_receipt(&full, &select(&[("T1", &["c1", "c3"])])).unwrap();

        let t1 = TermId::new("T1").unwrap();
        assert_eq!(out.term_receipts.keys().collect::<Vec<_>>(), vec![&t1]);
        assert!(!out.term_receipts.contains_key(&TermId::new("T2").unwrap()));

        let kept = &out.term_receipts[&t1];
        assert_eq!(kept.revealed_courses.len(), 2);
        assert_eq!(kept.total_courses, Some(2));
        assert_eq!(kept.verkle_root, full.term_receipts[&t1].verkle_root);
        for id in ["c1", "c3"] {
            let id = CourseId::new(id).unwrap();
            assert_eq!(
                kept.course_proofs[&id].as_json(),
                full.term_receipts[&t1].course_proofs[&id].as_json()
            );
        }
        assert_eq!(kept.course_proofs.len(), 2);
        assert!(kept.selective_disclosure);

        assert!(out.receipt_type.selective_disclosure);
        assert!(out.receipt_type.specific_terms);
        assert!(out.receipt_type.specific_courses);
        assert_eq!(out.terms_included, vec![t1]);
        assert_eq!(out.courses_filter.len(), 2);
    }

    #[test]
    fn zero_courses_in_selected_term_is_legal() {
        let out = filter_receipt(&full(), &select(&[("T2", &[])])).unwrap();
        let t2 = &out.term_receipts[&TermId::new("T2").unwrap()];
        assert!(t2.revealed_courses.is_empty());
        assert!(t2.course_proofs.is_empty());
        assert_eq!(t2.total_courses, Some(0));
        assert_eq!(out.total_course_count(), 0);
    }

    #[test]
    fn selected_term_without_course_entry_keeps_no_courses() {
        let mut s = Selection::default();
        s.terms.insert(TermId::new("T1").unwrap());
        let out = filter_receipt(&full(), &s).unwrap();
        assert_eq!(out.total_course_count(), 0);
    }

    #[test]
    fn unknown_term_is_rejected() {
        let err = filter_receipt(&full(), &select(&[("T7", &[])])).unwrap_err();
        assert!(matches!(err, DisclosureError::UnknownTerm(_)));
    }

    #[test]
    fn course_from_other_term_is_rejected() {
        let err = filter_receipt(&full(), &select(&[("T1", &["c4"])])).unwrap_err();
        assert!(matches!(err, DisclosureError::UnknownCourse { .. }));
    }

    #[test]
    fn full_selection_keeps_specific_flags_clear() {
        let full = full();
        let out = filter_receipt(&full, &Selection::everything(&full)).unwrap();
        assert!(out.receipt_type.selective_disclosure);
        assert!(!out.receipt_type.specific_terms);
        assert!(!out.receipt_type.specific_courses);
        assert_eq!(out.total_course_count(), 5);
    }

    #[test]
    fn timestamp_is_regenerated() {
        let full = full();
        let at = DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let out = filter_receipt_at(&full, &select(&[("T1", &["c2"])]), at).unwrap();
        assert_eq!(out.generation_timestamp, at);
    }

    #[test]
    fn malformed_source_is_rejected() {
        let mut full = full();
        full.terms_included.pop();
        assert!(matches!(
            filter_receipt(&full, &select(&[("T1", &[])])),
            Err(DisclosureError::Malformed(_))
        ));
    }
}
