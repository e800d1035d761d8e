//! # Selection Session
//!
//! The operator's per-term and per-course choices for one receipt. The
//! session is mutated only by explicit calls and read through
//! [`SelectionSession::snapshot()`], which yields an immutable
//! [`Selection`]. An export works from the snapshot taken when it was
//! invoked.
//!
//! ## Rules
//!
//! - Selecting a term selects every course revealed in it.
//! - Deselecting a term drops its course choices.
//! - Selecting a course in an unselected term selects the term with just
//!   that course.
//! - Deselecting the last course of a term leaves the term selected with
//!   zero courses.

use std::collections::{BTreeMap, BTreeSet};

use mcred_core::{CourseId, JourneyReceipt, TermId};
use serde::{Deserialize, Serialize};

use crate::error::DisclosureError;

/// An immutable selection: which terms to keep and which courses within
/// each kept term.
///
/// A selected term with no entry in `courses` keeps zero courses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub terms: BTreeSet<TermId>,
    #[serde(default)]
    pub courses: BTreeMap<TermId, BTreeSet<CourseId>>,
}

impl Selection {
    /// Select every term and course in a receipt.
    pub fn everything(receipt: &JourneyReceipt) -> Self {
        let mut selection = Self::default();
        for (term_id, term) in &receipt.term_receipts {
            selection.terms.insert(term_id.clone());
            selection
                .courses
                .insert(term_id.clone(), term.course_ids().cloned().collect());
        }
        selection
    }

    /// Courses selected within a term. Empty if the term has no entry.
    pub fn courses_in(&self, term: &TermId) -> impl Iterator<Item = &CourseId> {
        self.courses.get(term).into_iter().flatten()
    }

    /// Whether no term is selected.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Mutable selection state bound to the courses revealed in one receipt.
#[derive(Debug, Clone)]
pub struct SelectionSession {
    catalog: BTreeMap<TermId, Vec<CourseId>>,
    current: Selection,
}

impl SelectionSession {
    /// Start a session with nothing selected.
    pub fn new(receipt: &JourneyReceipt) -> Self {
        let catalog = receipt
            .term_receipts
            .iter()
            .map(|(id, term)| (id.clone(), term.course_ids().cloned().collect()))
            .collect();
        Self {
            catalog,
            current: Selection::default(),
        }
    }

    /// Flip a term's selection. Returns whether the term is now selected.
    pub fn toggle_term(&mut self, term: &TermId) -> Result<bool, DisclosureError> {
        let courses = self
            .catalog
            .get(term)
            .ok_or_else(|| DisclosureError::UnknownTerm(term.clone()))?;

        if self.current.terms.remove(term) {
            self.current.courses.remove(term);
            Ok(false)
        } else {
            self.current.terms.insert(term.clone());
            self.current
                .courses
                .insert(term.clone(), courses.iter().cloned().collect());
            Ok(true)
        }
    }

    /// Flip a course's selection. Returns whether the course is now
    /// selected.
    pub fn toggle_course(
        &mut self,
        term: &TermId,
        course: &CourseId,
    ) -> Result<bool, DisclosureError> {
        let known = self
            .catalog
            .get(term)
            .ok_or_else(|| DisclosureError::UnknownTerm(term.clone()))?;
        if !known.contains(course) {
            return Err(DisclosureError::UnknownCourse {
                term: term.clone(),
                course: course.clone(),
            });
        }

        self.current.terms.insert(term.clone());
        let chosen = self.current.courses.entry(term.clone()).or_default();
        if chosen.remove(course) {
            Ok(false)
        } else {
            chosen.insert(course.clone());
            Ok(true)
        }
    }

    /// Select every term and course.
    pub fn select_all(&mut self) {
        self.current = Selection {
            terms: self.catalog.keys().cloned().collect(),
            courses: self
                .catalog
                .iter()
                .map(|(id, courses)| (id.clone(), courses.iter().cloned().collect()))
                .collect(),
        };
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.current = Selection::default();
    }

    /// Whether a term is currently selected.
    pub fn is_term_selected(&self, term: &TermId) -> bool {
        self.current.terms.contains(term)
    }

    /// Whether a course is currently selected.
    pub fn is_course_selected(&self, term: &TermId, course: &CourseId) -> bool {
        self.current
            .courses
            .get(term)
            .is_some_and(|c| c.contains(course))
    }

    /// Freeze the current selection.
    pub fn snapshot(&self) -> Selection {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mcred_core::{Course, Proof, ReceiptType, RootCommitment, StudentId, TermReceipt};

    fn receipt() -> JourneyReceipt {
        let term = |id: &str, courses: &[&str]| TermReceipt {
            term_id: TermId::new(id).unwrap(),
            student_id: StudentId::new("S1").unwrap(),
            verkle_root: RootCommitment::from_bytes([1; 32]),
            revealed_courses: courses
                .iter()
                .map(|c| Course {
                    course_id: CourseId::new(*c).unwrap(),
                    course_name: c.to_string(),
                    grade: "A".to_string(),
                    credits: 4.into(),
                })
                .collect(),
            course_proofs: courses
                .iter()
                .map(|c| (CourseId::new(*c).unwrap(), Proof::from_json("[]").unwrap()))
                .collect(),
            total_courses: None,
            proof_type: "verkle".to_string(),
            selective_disclosure: false,
            verification_path: serde_json::Value::Null,
            generated_at: Utc::now(),
        };
        let terms = [term("T1", &["c1", "c2"]), term("T2", &["c3"])];
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

    fn t(id: &str) -> TermId {
        TermId::new(id).unwrap()
    }

    fn c(id: &str) -> CourseId {
        CourseId::new(id).unwrap()
    }

    #[test]
    fn selecting_term_selects_its_courses() {
        let mut s = SelectionSession::new(&receipt());
        assert!(s.toggle_term(&t("T1")).unwrap());
        assert!(s.is_course_selected(&t("T1"), &c("c1")));
        assert!(s.is_course_selected(&t("T1"), &c("c2")));

        assert!(!s.toggle_term(&t("T1")).unwrap());
        assert!(s.snapshot().is_empty());
        assert!(s.snapshot().courses.is_empty());
    }

    #[test]
    fn last_course_off_keeps_term() {
        let mut s = SelectionSession::new(&receipt());
        s.toggle_term(&t("T2")).unwrap();
        assert!(!s.toggle_course(&t("T2"), &c("c3")).unwrap());
        assert!(s.is_term_selected(&t("T2")));
        assert_eq!(s.snapshot().courses_in(&t("T2")).count(), 0);
    }

    #[test]
    fn course_in_unselected_term_selects_term() {
        let mut s = SelectionSession::new(&receipt());
        assert!(s.toggle_course(&t("T1"), &c("c2")).unwrap());
        let snap = s.snapshot();
        assert!(snap.terms.contains(&t("T1")));
        assert_eq!(snap.courses_in(&t("T1")).collect::<Vec<_>>(), vec![&c("c2")]);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut s = SelectionSession::new(&receipt());
        assert!(matches!(
            s.toggle_term(&t("T9")),
            Err(DisclosureError::UnknownTerm(_))
        ));
        assert!(matches!(
            s.toggle_course(&t("T1"), &c("c3")),
            Err(DisclosureError::UnknownCourse { .. })
        ));
    }

    #[test]
    fn snapshot_is_detached_from_later_edits() {
        let r = receipt();
        let mut s = SelectionSession::new(&r);
        s.select_all();
        let snap = s.snapshot();
        s.clear();
        assert_eq!(snap, Selection::everything(&r));
        assert!(s.snapshot().is_empty());
    }
}
