//! # Progress Reporting
//!
//! The workflow reports an [`AttemptSnapshot`] to a [`ProgressSink`] after
//! every phase change, so a caller can render the current phase while the
//! workflow is suspended on the network.

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::attempt::AttemptSnapshot;

/// Observer of attempt progress. Called synchronously from the workflow;
/// implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, snapshot: &AttemptSnapshot);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _snapshot: &AttemptSnapshot) {}
}

/// Publishes the latest snapshot to watchers.
impl ProgressSink for watch::Sender<Option<AttemptSnapshot>> {
    fn report(&self, snapshot: &AttemptSnapshot) {
        self.send_replace(Some(snapshot.clone()));
    }
}

/// Keeps every snapshot in order.
#[derive(Debug, Default)]
pub struct RecordedProgress {
    snapshots: Mutex<Vec<AttemptSnapshot>>,
}

impl RecordedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<AttemptSnapshot> {
        self.snapshots.lock().clone()
    }
}

impl ProgressSink for RecordedProgress {
    fn report(&self, snapshot: &AttemptSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }
}
