//! # Journey Verifier
//!
//! Submits a receipt to the external verifier and aggregates the answer.
//! Only one request may be outstanding per `JourneyVerifier`; a second
//! call while the first is pending returns [`VerifyBusy`] instead of
//! racing it into the same report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mcred_core::{JourneyReceipt, ReceiptVerifier, VerificationReport};
use thiserror::Error;

use crate::aggregate::{aggregate, aggregate_failure};

/// A verification request is already outstanding.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("a verification request is already in progress")]
pub struct VerifyBusy;

/// Caller of the external verifier.
pub struct JourneyVerifier {
    backend: Arc<dyn ReceiptVerifier>,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl JourneyVerifier {
    pub fn new(backend: Arc<dyn ReceiptVerifier>) -> Self {
        Self {
            backend,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Verify a receipt and return a full replacement report.
    ///
    /// Collaborator failures and locally detected malformed receipts become
    /// a report holding only a failed `overall` entry.
    pub async fn verify(&self, receipt: &JourneyReceipt) -> Result<VerificationReport, VerifyBusy> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VerifyBusy);
        }
        let _guard = InFlight(&self.in_flight);

        if let Err(e) = receipt.validate() {
            tracing::warn!(error = %e, "refusing to submit malformed receipt");
            return Ok(aggregate_failure(e.to_string()));
        }

        match self.backend.verify(receipt).await {
            Ok(response) => {
                let report = aggregate(receipt, &response);
                tracing::info!(
                    student_id = %receipt.student_id,
                    status = %response.status,
                    verified = response.verified_courses,
                    "verification complete"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(student_id = %receipt.student_id, error = %e, "verification failed");
                Ok(aggregate_failure(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for JourneyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyVerifier")
            .field("in_flight", &self.is_busy())
            .finish_non_exhaustive()
    }
}
