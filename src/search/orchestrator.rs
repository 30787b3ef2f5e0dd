//! Work dispatch seam between the execution core and the index store.
//!
//! The core is single-threaded per round: it submits one unit of read work
//! and blocks until it completes. An orchestrator may run the work on a
//! worker thread or pool, but that is invisible here.

use std::fmt::Debug;

use crate::error::Result;

/// Dispatches one unit of read work, synchronously from the caller's view.
pub trait WorkOrchestrator: Send + Sync + Debug {
    /// Run `work` to completion and propagate its outcome.
    fn submit(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()>;
}

/// The default orchestrator: runs the work inline on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallingThreadOrchestrator;

impl WorkOrchestrator for CallingThreadOrchestrator {
    fn submit(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        work()
    }
}
