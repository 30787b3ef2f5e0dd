//! Projection extraction and deferred result loading.
//!
//! Extraction happens in two stages, so that blocking entity loading can stay
//! in the calling thread: first each ranked hit is stitched into a
//! [`StitchedRecord`] and handed to the [`ProjectionExtractor`], producing an
//! extracted-but-not-yet-loaded fragment; then [`LoadableSearchResult::load_blocking`]
//! asks the [`ProjectionHitMapper`] to finish loading. An asynchronous variant
//! would be a separate interface, not a retrofit of this one.

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;

use crate::document::Document;
use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::query::ScoredHit;
use crate::search::SearchRequest;
use crate::search::collector::{CollectorOutput, CollectorRequirement, TotalHits, distance_of};
use crate::search::nested::resolve_nested_docs;

/// A nested child record stitched under its parent hit.
#[derive(Debug, Clone)]
pub struct NestedRecord {
    /// The child record's document ID.
    pub doc_id: u64,
    /// The child record's stored fields.
    pub document: Document,
    /// Distance auxiliary value for the child, if a distance collector ran.
    pub distance: Option<f64>,
}

/// One matched hit with its stored fields and nested child fragments stitched
/// together, ready for projection extraction.
#[derive(Debug, Clone)]
pub struct StitchedRecord {
    /// The document ID of the root hit.
    pub doc_id: u64,
    /// The hit's score.
    pub score: f32,
    /// The root document's stored fields.
    pub document: Document,
    /// The hit's nested child records, if the projection requested any
    /// nested paths.
    pub children: Vec<NestedRecord>,
    /// Distance auxiliary value, if a distance collector ran.
    pub distance: Option<f64>,
}

/// Turns a stitched record into an extracted (possibly still deferred)
/// projection fragment.
pub trait ProjectionExtractor<D>: Send + Sync {
    /// Extract one hit.
    fn extract(&self, record: &StitchedRecord) -> Result<D>;

    /// The nested document paths this projection reads. When empty, the
    /// nested-document resolution pass is skipped entirely.
    fn nested_paths(&self) -> Vec<String> {
        Vec::new()
    }

    /// The collector capabilities this projection requires.
    fn required_collectors(&self) -> Vec<CollectorRequirement> {
        Vec::new()
    }
}

/// Finishes deferred entity loading for extracted fragments.
///
/// `load_blocking` runs in the thread that asked for results; it may block on
/// I/O (e.g. loading entities from an external store).
pub trait ProjectionHitMapper<D, H>: Send + Sync {
    /// Load the final hits for a batch of extracted fragments, preserving
    /// order.
    fn load_blocking(&self, fragments: Vec<D>) -> Result<Vec<H>>;
}

/// A hit mapper that passes fragments through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl<T: Send> ProjectionHitMapper<T, T> for IdentityMapper {
    fn load_blocking(&self, fragments: Vec<T>) -> Result<Vec<T>> {
        Ok(fragments)
    }
}

/// An extractor projecting each hit as its raw [`StitchedRecord`].
#[derive(Debug, Clone, Default)]
pub struct StitchedRecordExtractor {
    nested_paths: Vec<String>,
    requirements: Vec<CollectorRequirement>,
}

impl StitchedRecordExtractor {
    /// Create a new record extractor with no nested paths or requirements.
    pub fn new() -> Self {
        StitchedRecordExtractor::default()
    }

    /// Declare a nested path this projection reads.
    pub fn with_nested_path<S: Into<String>>(mut self, path: S) -> Self {
        self.nested_paths.push(path.into());
        self
    }

    /// Require a distance collector.
    pub fn with_distance<S: Into<String>>(mut self, field: S, origin: crate::document::GeoPoint) -> Self {
        self.requirements.push(CollectorRequirement::Distance {
            field: field.into(),
            origin,
        });
        self
    }
}

impl ProjectionExtractor<StitchedRecord> for StitchedRecordExtractor {
    fn extract(&self, record: &StitchedRecord) -> Result<StitchedRecord> {
        Ok(record.clone())
    }

    fn nested_paths(&self) -> Vec<String> {
        self.nested_paths.clone()
    }

    fn required_collectors(&self) -> Vec<CollectorRequirement> {
        self.requirements.clone()
    }
}

/// The final result of one round, after deferred loading.
#[derive(Debug, Clone)]
pub struct SearchResult<H> {
    /// Total hit count.
    pub total: TotalHits,
    /// Loaded hits, best first.
    pub hits: Vec<H>,
    /// Elapsed time of the round.
    pub took: Duration,
    /// Whether a soft timeout truncated the round.
    pub timed_out: bool,
}

/// The output of one search executor invocation: extracted fragments plus the
/// mapper needed to finish loading them.
pub struct LoadableSearchResult<D, H> {
    total: TotalHits,
    fragments: Vec<D>,
    mapper: Arc<dyn ProjectionHitMapper<D, H>>,
    took: Duration,
    timed_out: bool,
}

impl<D, H> LoadableSearchResult<D, H> {
    pub(crate) fn new(
        total: TotalHits,
        fragments: Vec<D>,
        mapper: Arc<dyn ProjectionHitMapper<D, H>>,
    ) -> Self {
        LoadableSearchResult {
            total,
            fragments,
            mapper,
            took: Duration::ZERO,
            timed_out: false,
        }
    }

    /// An empty result that touched no index resources.
    pub(crate) fn empty(mapper: Arc<dyn ProjectionHitMapper<D, H>>) -> Self {
        LoadableSearchResult::new(TotalHits::new(0, true), Vec::new(), mapper)
    }

    pub(crate) fn with_timing(mut self, took: Duration, timed_out: bool) -> Self {
        self.took = took;
        self.timed_out = timed_out;
        self
    }

    /// Total hit count.
    pub fn total(&self) -> TotalHits {
        self.total
    }

    /// Number of extracted fragments.
    pub fn extracted_len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether a soft timeout truncated the round.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Finish deferred loading in the calling thread and produce the final
    /// result.
    pub fn load_blocking(self) -> Result<SearchResult<H>> {
        let hits = self.mapper.load_blocking(self.fragments)?;
        Ok(SearchResult {
            total: self.total,
            hits,
            took: self.took,
            timed_out: self.timed_out,
        })
    }
}

impl<D, H> std::fmt::Debug for LoadableSearchResult<D, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadableSearchResult")
            .field("total", &self.total)
            .field("fragments", &self.fragments.len())
            .field("took", &self.took)
            .field("timed_out", &self.timed_out)
            .finish()
    }
}

/// A cached ranked window over which slices can be extracted repeatedly,
/// used by the scroll cursor.
pub struct ExtractableSearchResult<D, H> {
    reader: Arc<dyn IndexReader>,
    request: SearchRequest<D, H>,
    output: CollectorOutput,
}

impl<D, H> ExtractableSearchResult<D, H> {
    pub(crate) fn new(
        reader: Arc<dyn IndexReader>,
        request: SearchRequest<D, H>,
        output: CollectorOutput,
    ) -> Self {
        ExtractableSearchResult {
            reader,
            request,
            output,
        }
    }

    /// Number of ranked hits held in this window.
    pub fn hit_count(&self) -> usize {
        self.output.hits.len()
    }

    /// Total hit count observed by the window's scan.
    pub fn total(&self) -> TotalHits {
        self.output.total
    }

    /// Whether the window's scan was truncated by a soft timeout.
    pub fn timed_out(&self) -> bool {
        self.output.timed_out
    }

    /// Stitch, extract and return hits `[from, to)`; the range is clamped to
    /// the window. Stored-field loading and the nested-document pass happen
    /// here, for the slice only.
    pub fn extract(&self, from: usize, to: usize) -> Result<LoadableSearchResult<D, H>> {
        let to = to.min(self.output.hits.len());
        let from = from.min(to);
        let slice = &self.output.hits[from..to];

        let query = self.request.query().description();
        let extractor = self.request.extractor();

        // Nested pass, skipped when the projection reads no nested paths.
        let nested = resolve_nested_docs(
            self.reader.as_ref(),
            &query,
            slice,
            &extractor.nested_paths(),
        )?;

        // Publish nested children to distance-requiring projections:
        // per-batch map, discarded after stitching.
        let mut distances = self.output.distances.clone();
        if !nested.is_empty() {
            for requirement in extractor.required_collectors() {
                let CollectorRequirement::Distance { field, origin } = requirement;
                for child_ids in nested.values() {
                    for &child_id in child_ids {
                        if let Some(distance) =
                            distance_of(self.reader.as_ref(), child_id, &field, &origin)?
                        {
                            distances.insert(child_id, distance);
                        }
                    }
                }
            }
        }

        let mut fragments = Vec::with_capacity(slice.len());
        for hit in slice {
            let record = self.stitch(hit, &nested, &distances, &query)?;
            let fragment = extractor
                .extract(&record)
                .map_err(|e| QuarryError::execution(query.clone(), e))?;
            fragments.push(fragment);
        }

        Ok(LoadableSearchResult::new(
            self.output.total,
            fragments,
            Arc::clone(self.request.mapper()),
        ))
    }

    fn stitch(
        &self,
        hit: &ScoredHit,
        nested: &AHashMap<u64, Vec<u64>>,
        distances: &AHashMap<u64, f64>,
        query: &str,
    ) -> Result<StitchedRecord> {
        let document = self
            .reader
            .document(hit.doc_id)?
            .ok_or_else(|| {
                QuarryError::execution(
                    query.to_string(),
                    QuarryError::index(format!("missing stored document {}", hit.doc_id)),
                )
            })?;

        let mut children = Vec::new();
        if let Some(child_ids) = nested.get(&hit.doc_id) {
            for &child_id in child_ids {
                if let Some(child) = self.reader.document(child_id)? {
                    children.push(NestedRecord {
                        doc_id: child_id,
                        document: child,
                        distance: distances.get(&child_id).copied(),
                    });
                }
            }
        }

        Ok(StitchedRecord {
            doc_id: hit.doc_id,
            score: hit.score,
            document,
            children,
            distance: distances.get(&hit.doc_id).copied(),
        })
    }
}

impl<D, H> std::fmt::Debug for ExtractableSearchResult<D, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractableSearchResult")
            .field("hits", &self.output.hits.len())
            .field("total", &self.output.total)
            .field("timed_out", &self.output.timed_out)
            .finish()
    }
}
