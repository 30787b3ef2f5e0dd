//! Query execution: collector pipeline, timeouts, result extraction,
//! nested-document stitching and scroll pagination.

pub mod collector;
pub mod nested;
pub mod observer;
pub mod orchestrator;
pub mod projection;
pub mod scroll;
pub mod searcher;
pub mod timeout;

pub use self::collector::{
    CollectorOutput, CollectorRequirement, CollectorsBuilder, TIMEOUT_CHECK_INTERVAL, TotalHits,
};
pub use self::observer::{NoopObserver, RoundKind, RoundReport, SearchObserver};
pub use self::orchestrator::{CallingThreadOrchestrator, WorkOrchestrator};
pub use self::projection::{
    ExtractableSearchResult, IdentityMapper, LoadableSearchResult, NestedRecord,
    ProjectionExtractor, ProjectionHitMapper, SearchResult, StitchedRecord,
    StitchedRecordExtractor,
};
pub use self::scroll::{ScrollCursor, ScrollPage};
pub use self::searcher::Searcher;
pub use self::timeout::TimeoutManager;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::Query;

/// Sort order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Sort specification for ranked hits.
///
/// Equal sort keys fall back to document ID, so rankings are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    /// Sort by relevance score, descending.
    Score,
    /// Sort by a stored field value.
    Field {
        /// The field to sort by.
        name: String,
        /// The sort direction.
        order: SortOrder,
    },
}

/// What happens when a query timeout expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutMode {
    /// Hard timeout: the round fails with a timeout error.
    Fail,
    /// Soft timeout: the scan stops and a best-effort partial result is
    /// returned, marked as timed out.
    Truncate,
}

/// Per-query timeout budget and expiry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// The timeout budget for one round.
    pub duration: Duration,
    /// The expiry behavior.
    pub mode: TimeoutMode,
}

/// Score-computation metadata for a single document; diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// The computed value.
    pub value: f32,
    /// What this value is.
    pub description: String,
    /// Sub-computations contributing to the value.
    pub details: Vec<Explanation>,
}

/// One executable search: a compiled query plan, a sort order, a projection
/// and the per-round execution knobs.
///
/// `D` is the extracted-but-not-yet-loaded projection fragment type, `H` the
/// final hit type produced by the hit mapper.
pub struct SearchRequest<D, H> {
    query: Box<dyn Query>,
    sort: SortField,
    extractor: Arc<dyn ProjectionExtractor<D>>,
    mapper: Arc<dyn ProjectionHitMapper<D, H>>,
    timeout: Option<TimeoutConfig>,
    total_hits_threshold: u64,
}

impl<D, H> SearchRequest<D, H> {
    /// Create a new search request with the given projection.
    pub fn new(
        query: Box<dyn Query>,
        extractor: Arc<dyn ProjectionExtractor<D>>,
        mapper: Arc<dyn ProjectionHitMapper<D, H>>,
    ) -> Self {
        SearchRequest {
            query,
            sort: SortField::Score,
            extractor,
            mapper,
            timeout: None,
            total_hits_threshold: u64::MAX,
        }
    }

    /// Set the sort order.
    pub fn sort_by(mut self, sort: SortField) -> Self {
        self.sort = sort;
        self
    }

    /// Fail the round with a timeout error after `duration` (hard timeout).
    pub fn fail_after(mut self, duration: Duration) -> Self {
        self.timeout = Some(TimeoutConfig {
            duration,
            mode: TimeoutMode::Fail,
        });
        self
    }

    /// Truncate the scan after `duration` and return a partial, timed-out
    /// result (soft timeout).
    pub fn truncate_after(mut self, duration: Duration) -> Self {
        self.timeout = Some(TimeoutConfig {
            duration,
            mode: TimeoutMode::Truncate,
        });
        self
    }

    /// Stop counting hits exactly beyond this threshold; past it the total
    /// becomes a lower bound and the scan may terminate early once ranking
    /// no longer needs hits.
    pub fn total_hits_threshold(mut self, threshold: u64) -> Self {
        self.total_hits_threshold = threshold;
        self
    }

    /// The compiled query plan.
    pub fn query(&self) -> &dyn Query {
        self.query.as_ref()
    }

    /// The sort specification.
    pub fn sort(&self) -> &SortField {
        &self.sort
    }

    /// The projection extractor.
    pub fn extractor(&self) -> &Arc<dyn ProjectionExtractor<D>> {
        &self.extractor
    }

    /// The projection hit mapper.
    pub fn mapper(&self) -> &Arc<dyn ProjectionHitMapper<D, H>> {
        &self.mapper
    }

    /// The timeout configuration, if any.
    pub fn timeout(&self) -> Option<TimeoutConfig> {
        self.timeout
    }

    pub(crate) fn threshold(&self) -> u64 {
        self.total_hits_threshold
    }
}

impl SearchRequest<StitchedRecord, StitchedRecord> {
    /// Convenience request projecting each hit as its raw stitched record.
    pub fn for_records(query: Box<dyn Query>, extractor: StitchedRecordExtractor) -> Self {
        SearchRequest::new(query, Arc::new(extractor), Arc::new(IdentityMapper))
    }
}

impl<D, H> Clone for SearchRequest<D, H> {
    fn clone(&self) -> Self {
        SearchRequest {
            query: self.query.clone_box(),
            sort: self.sort.clone(),
            extractor: Arc::clone(&self.extractor),
            mapper: Arc::clone(&self.mapper),
            timeout: self.timeout,
            total_hits_threshold: self.total_hits_threshold,
        }
    }
}

impl<D, H> std::fmt::Debug for SearchRequest<D, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchRequest")
            .field("query", &self.query.description())
            .field("sort", &self.sort)
            .field("timeout", &self.timeout)
            .field("total_hits_threshold", &self.total_hits_threshold)
            .finish()
    }
}
