//! # Report Aggregation
//!
//! Turns a verifier response into the per-term report plus the synthesized
//! `overall` entry. Course totals come from the submitted receipt, not the
//! verifier.

use mcred_core::verification::OVERALL_KEY;
use mcred_core::{
    JourneyReceipt, VerificationReport, VerificationResult, VerifierResponse, VerifierStatus,
};

/// Build the report for a completed verifier call.
///
/// Term results are copied unchanged under their term identifier. The
/// synthesized `overall` entry is inserted last. A term result keyed
/// `overall` would collide with it; it still counts toward
/// `blockchain_verified` but is left out of the report.
pub fn aggregate(submitted: &JourneyReceipt, external: &VerifierResponse) -> VerificationReport {
    let local_total = submitted.total_course_count();
    let verified_courses = external.verified_courses;

    let mut report: VerificationReport = external
        .term_results
        .iter()
        .filter(|(term, _)| {
            let collides = term.as_str() == OVERALL_KEY;
            if collides {
                tracing::warn!(
                    term_id = %term,
                    "verifier used the reserved overall key as a term; dropping it"
                );
            }
            !collides
        })
        .map(|(term, result)| (term.to_string(), result.clone()))
        .collect();

    let blockchain_verified = !external.term_results.is_empty()
        && external.term_results.values().all(|r| r.blockchain_verified);

    let overall = VerificationResult {
        verified: external.status == VerifierStatus::Success,
        status: external.status.as_str().to_string(),
        courses_verified: verified_courses,
        courses_failed: local_total.saturating_sub(verified_courses),
        blockchain_verified,
        ipa_verified: Some(verified_courses == external.total_courses),
        details: Some(format!("{verified_courses}/{local_total} courses verified")),
        ..VerificationResult::default()
    };

    if external.total_courses != local_total {
        tracing::warn!(
            submitted = local_total,
            reported = external.total_courses,
            "verifier counted a different number of courses than were submitted"
        );
    }

    report.insert(OVERALL_KEY.to_string(), overall);
    report
}

/// The report for a verifier call that did not produce a usable response.
pub fn aggregate_failure(message: impl Into<String>) -> VerificationReport {
    let mut report = VerificationReport::new();
    report.insert(OVERALL_KEY.to_string(), VerificationResult::failure(message));
    report
}
