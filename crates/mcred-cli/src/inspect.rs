//! # Inspect Subcommand
//!
//! Parses a receipt (term or journey) and prints a summary: student,
//! scope flags, per-term roots and revealed courses, and the content
//! digest of journey receipts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mcred_core::{JourneyReceipt, ProofDocument};

/// Arguments for the `mcred inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Receipt file (term or journey).
    pub file: PathBuf,
}

pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let doc = crate::read_document(&args.file)?;
    print!("{}", render(&doc)?);
    Ok(0)
}

fn render(doc: &ProofDocument) -> Result<String> {
    let mut out = String::new();
    let digest = match doc {
        ProofDocument::Journey(j) => Some(j.content_digest().context("failed to digest receipt")?),
        ProofDocument::Term(_) => None,
    };
    let kind = doc.kind();
    let journey: JourneyReceipt = doc.clone().into_journey();

    out.push_str(&format!("Document: {kind} receipt\n"));
    out.push_str(&format!("  Student: {}\n", journey.student_id));
    out.push_str(&format!("  Generated: {}\n", journey.generation_timestamp));
    out.push_str(&format!(
        "  Courses: {} in {} term(s)\n",
        journey.total_course_count(),
        journey.term_receipts.len()
    ));
    let flags = journey.receipt_type;
    out.push_str(&format!(
        "  Selective disclosure: {}\n",
        if flags.selective_disclosure { "yes" } else { "no" }
    ));
    if !journey.courses_filter.is_empty() {
        let filter: Vec<&str> = journey.courses_filter.iter().map(|c| c.as_str()).collect();
        out.push_str(&format!("  Course filter: {}\n", filter.join(", ")));
    }
    if let Some(digest) = digest {
        out.push_str(&format!("  Digest: {digest}\n"));
    }

    for term_id in &journey.terms_included {
        let Some(term) = journey.term_receipts.get(term_id) else {
            continue;
        };
        out.push_str(&format!("Term {term_id}\n"));
        out.push_str(&format!("  Root: {}\n", term.verkle_root.to_hex()));
        out.push_str(&format!("  Proof type: {}\n", term.proof_type));
        for course in &term.revealed_courses {
            out.push_str(&format!(
                "  - {} {} ({}, {} credits)\n",
                course.course_id, course.course_name, course.grade, course.credits
            ));
        }
    }
    Ok(out)
}
