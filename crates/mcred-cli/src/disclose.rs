//! # Disclose Subcommand
//!
//! Builds a selective-disclosure receipt from a full receipt. `--term`
//! selects a whole term; `--course TERM:COURSE` selects one course. The
//! result keeps the original roots and proof material untouched.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use mcred_core::{CourseId, JourneyReceipt, TermId};
use mcred_disclosure::{export_receipt, ExportedReceipt, SelectionSession};

/// Arguments for the `mcred disclose` subcommand.
#[derive(Args, Debug)]
pub struct DiscloseArgs {
    /// Full receipt to disclose from.
    #[arg(long)]
    pub receipt: PathBuf,

    /// Disclose every course of a term. Repeatable.
    #[arg(long = "term", value_name = "TERM")]
    pub terms: Vec<String>,

    /// Disclose one course, written TERM:COURSE. Repeatable.
    #[arg(long = "course", value_name = "TERM:COURSE")]
    pub courses: Vec<String>,

    /// Output file. Defaults to the suggested name in the current directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run_disclose(args: &DiscloseArgs) -> Result<u8> {
    let full = crate::read_document(&args.receipt)?.into_journey();
    let exported = disclose(&full, &args.terms, &args.courses)?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&exported.file_name));
    std::fs::write(&out, &exported.contents)
        .with_context(|| format!("failed to write {}", out.display()))?;

    println!("OK: wrote {}", out.display());
    println!(
        "  {} course(s) from {} term(s)",
        exported.receipt.total_course_count(),
        exported.receipt.term_receipts.len()
    );
    println!("  Digest: {}", exported.digest);
    Ok(0)
}

fn disclose(
    full: &JourneyReceipt,
    terms: &[String],
    courses: &[String],
) -> Result<ExportedReceipt> {
    let mut session = SelectionSession::new(full);

    for raw in terms {
        let term = TermId::new(raw.as_str()).with_context(|| format!("invalid term {raw:?}"))?;
        if !session.is_term_selected(&term) {
            session.toggle_term(&term)?;
        }
        // A term touched by an earlier --course only holds that course.
        let missing: Vec<CourseId> = full
            .term_receipts
            .get(&term)
            .into_iter()
            .flat_map(|t| t.course_ids())
            .filter(|c| !session.is_course_selected(&term, c))
            .cloned()
            .collect();
        for course in &missing {
            session.toggle_course(&term, course)?;
        }
    }

    for raw in courses {
        let (term, course) = parse_course(raw)?;
        if !session.is_course_selected(&term, &course) {
            session.toggle_course(&term, &course)?;
        }
    }

    if session.snapshot().is_empty() {
        bail!("nothing to disclose: pass --term or --course");
    }
    Ok(export_receipt(full, &session)?)
}

fn parse_course(raw: &str) -> Result<(TermId, CourseId)> {
    let Some((term, course)) = raw.split_once(':') else {
        bail!("invalid --course {raw:?}: expected TERM:COURSE");
    };
    let term = TermId::new(term).with_context(|| format!("invalid term in {raw:?}"))?;
    let course = CourseId::new(course).with_context(|| format!("invalid course in {raw:?}"))?;
    Ok((term, course))
}
