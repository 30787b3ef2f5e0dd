//! Query seam: the compiled-plan trait and the built-in plan types.
//!
//! Query construction and predicate compilation live outside this crate; the
//! execution core only consumes objects implementing [`Query`]. A handful of
//! concrete plans ship with the crate: [`MatchAllQuery`] and [`TermQuery`] for
//! callers of the in-memory engine, and the internally derived
//! [`NestedChildQuery`] used by the nested-document resolver.

pub mod matcher;
pub mod nested;
#[allow(clippy::module_inception)]
pub mod query;
pub mod scorer;
pub mod term;

pub use self::matcher::{AllDocsMatcher, EmptyMatcher, Matcher, PostingMatcher};
pub use self::nested::NestedChildQuery;
pub use self::query::{MatchAllQuery, Query};
pub use self::scorer::{Bm25Scorer, ConstScorer, Scorer};
pub use self::term::TermQuery;

use serde::{Deserialize, Serialize};

/// A ranked hit: a matching document and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    /// The document ID.
    pub doc_id: u64,
    /// The relevance score.
    pub score: f32,
}
