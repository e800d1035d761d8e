use mcred_core::{CoreError, CourseId, TermId};
use thiserror::Error;

/// Errors raised while selecting or filtering.
#[derive(Error, Debug)]
pub enum DisclosureError {
    /// A selected term is not in the source receipt.
    #[error("term {0} is not in the receipt")]
    UnknownTerm(TermId),

    /// A selected course is not revealed in its term.
    #[error("course {course} is not revealed in term {term}")]
    UnknownCourse { term: TermId, course: CourseId },

    /// An export was requested with nothing selected.
    #[error("no terms selected")]
    EmptySelection,

    /// The source receipt, or the filtered result, violates a receipt
    /// invariant.
    #[error(transparent)]
    Malformed(#[from] CoreError),

    /// Rendering the export failed.
    #[error("failed to render receipt: {0}")]
    Render(#[from] serde_json::Error),
}
