//! Round telemetry.
//!
//! Logging of executed rounds is an injected collaborator invoked at round
//! boundaries, not implicit global state. The default observer does nothing.

use std::fmt::Debug;
use std::time::Duration;

use crate::error::QuarryError;

/// What kind of round completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundKind {
    /// A one-shot search.
    Search,
    /// A count.
    Count,
    /// One scroll step.
    ScrollStep,
    /// A single-document explanation.
    Explain,
}

/// Telemetry for one completed round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// The kind of round.
    pub kind: RoundKind,
    /// A rendering of the executed query.
    pub query: String,
    /// Elapsed time of the round.
    pub took: Duration,
    /// Observed hit count (lower bound if truncated).
    pub hit_count: u64,
    /// Whether a soft timeout truncated the round.
    pub timed_out: bool,
}

/// Observer invoked at round boundaries.
pub trait SearchObserver: Send + Sync + Debug {
    /// Called when a round completes normally.
    fn round_completed(&self, report: &RoundReport);

    /// Called when releasing an index reader fails on a best-effort path
    /// (e.g. while dropping a scroll cursor), where the failure must not mask
    /// a primary error.
    fn reader_release_failed(&self, error: &QuarryError) {
        let _ = error;
    }
}

/// An observer that ignores all reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {
    fn round_completed(&self, _report: &RoundReport) {}
}
