//! Deadline tracking for query execution rounds.

use std::time::{Duration, Instant};

use crate::error::{QuarryError, Result};
use crate::search::{TimeoutConfig, TimeoutMode};

/// Tracks the deadline of one execution round.
///
/// A manager is created when a round begins and discarded when it ends. It is
/// consulted from the single scanning thread only; it is not thread-safe.
/// Checks are expected to be invoked periodically (see
/// [`crate::search::collector::TIMEOUT_CHECK_INTERVAL`]), not per item, so the
/// system-clock reads stay off the hot path.
#[derive(Debug)]
pub struct TimeoutManager {
    config: Option<TimeoutConfig>,
    query: String,
    started_at: Option<Instant>,
    elapsed: Option<Duration>,
    timed_out: bool,
}

impl TimeoutManager {
    /// Create a manager for one round. `query` is used to describe the
    /// offending query in hard-timeout errors.
    pub fn new<S: Into<String>>(config: Option<TimeoutConfig>, query: S) -> Self {
        TimeoutManager {
            config,
            query: query.into(),
            started_at: None,
            elapsed: None,
            timed_out: false,
        }
    }

    /// Record the round's begin time. Idempotent within a round.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Check the deadline.
    ///
    /// Returns `Ok(false)` while time remains (or no timeout is configured),
    /// `Ok(true)` once a soft deadline expired (the caller must stop
    /// collecting), and a [`QuarryError::Timeout`] once a hard deadline
    /// expired.
    pub fn check(&mut self) -> Result<bool> {
        if self.timed_out {
            return Ok(true);
        }
        let config = match self.config {
            Some(config) => config,
            None => return Ok(false),
        };
        let started_at = match self.started_at {
            Some(started_at) => started_at,
            None => return Ok(false),
        };
        if started_at.elapsed() < config.duration {
            return Ok(false);
        }
        match config.mode {
            TimeoutMode::Fail => Err(QuarryError::timeout(config.duration, self.query.clone())),
            TimeoutMode::Truncate => {
                self.timed_out = true;
                Ok(true)
            }
        }
    }

    /// Finalize elapsed-time bookkeeping for reporting.
    pub fn stop(&mut self) {
        if let Some(started_at) = self.started_at {
            self.elapsed = Some(started_at.elapsed());
        }
    }

    /// Elapsed time of the round: finalized if stopped, live otherwise.
    pub fn took(&self) -> Duration {
        self.elapsed
            .or_else(|| self.started_at.map(|s| s.elapsed()))
            .unwrap_or(Duration::ZERO)
    }

    /// Whether a soft deadline expired during this round.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}
