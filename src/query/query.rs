//! Base query trait and the match-all plan.

use std::fmt::Debug;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::matcher::{AllDocsMatcher, Matcher};
use crate::query::scorer::{ConstScorer, Scorer};

/// Trait for compiled query plans.
///
/// A plan is immutable once built; the execution core only reads it. Matchers
/// and scorers are created fresh per round.
pub trait Query: Send + Sync + Debug {
    /// Create a matcher for this query.
    fn matcher(&self, reader: &dyn IndexReader) -> Result<Box<dyn Matcher>>;

    /// Create a scorer for this query.
    fn scorer(&self, reader: &dyn IndexReader) -> Result<Box<dyn Scorer>>;

    /// Get a human-readable description of this query, used in error reports
    /// and round telemetry.
    fn description(&self) -> String;

    /// Clone this query.
    fn clone_box(&self) -> Box<dyn Query>;

    /// Check if this query cannot match any documents.
    fn is_empty(&self, reader: &dyn IndexReader) -> Result<bool>;
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A query matching every root document with a constant score.
#[derive(Debug, Clone, Default)]
pub struct MatchAllQuery;

impl MatchAllQuery {
    /// Create a new match-all query.
    pub fn new() -> Self {
        MatchAllQuery
    }
}

impl Query for MatchAllQuery {
    fn matcher(&self, reader: &dyn IndexReader) -> Result<Box<dyn Matcher>> {
        Ok(Box::new(AllDocsMatcher::for_roots(reader)?))
    }

    fn scorer(&self, _reader: &dyn IndexReader) -> Result<Box<dyn Scorer>> {
        Ok(Box::new(ConstScorer::new(1.0)))
    }

    fn description(&self) -> String {
        "match_all".to_string()
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn is_empty(&self, reader: &dyn IndexReader) -> Result<bool> {
        Ok(reader.doc_count()? == 0)
    }
}
