//! Search executor: runs a query plan through the collector pipeline, then
//! loads and extracts the surviving hits.

use std::sync::Arc;

use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::search::collector::CollectorsBuilder;
use crate::search::observer::{NoopObserver, RoundKind, RoundReport, SearchObserver};
use crate::search::orchestrator::{CallingThreadOrchestrator, WorkOrchestrator};
use crate::search::projection::{ExtractableSearchResult, LoadableSearchResult};
use crate::search::timeout::TimeoutManager;
use crate::search::{Explanation, SearchRequest};

/// Run one collector-pipeline scan of `request`'s query, ranking at most
/// `capacity` hits, and wrap the ranked window for extraction.
pub(crate) fn execute_window<D, H>(
    reader: &Arc<dyn IndexReader>,
    request: &SearchRequest<D, H>,
    capacity: usize,
    timeout: &mut TimeoutManager,
) -> Result<ExtractableSearchResult<D, H>> {
    let mut collectors = CollectorsBuilder::new(request.sort().clone(), capacity)
        .total_hits_threshold(request.threshold())
        .requirements(request.extractor().required_collectors())
        .build(Arc::clone(reader));

    let query = request.query();
    if !query.is_empty(reader.as_ref())? {
        let mut matcher = query.matcher(reader.as_ref())?;
        let scorer = query.scorer(reader.as_ref())?;
        while !matcher.is_exhausted() {
            let doc_id = matcher.doc_id();
            if doc_id == u64::MAX {
                break;
            }
            let score = scorer.score(doc_id, matcher.term_freq());
            if !collectors.collect(doc_id, score, timeout)? {
                break;
            }
            if !matcher.next()? {
                break;
            }
        }
    }

    Ok(ExtractableSearchResult::new(
        Arc::clone(reader),
        request.clone(),
        collectors.finish(),
    ))
}

/// A searcher executing requests against an index reader.
///
/// The searcher itself is stateless across rounds; every invocation is one
/// complete round executed synchronously on the calling thread (work may be
/// dispatched through the orchestrator, but the call blocks until the round
/// completes).
#[derive(Debug)]
pub struct Searcher {
    reader: Arc<dyn IndexReader>,
    orchestrator: Arc<dyn WorkOrchestrator>,
    observer: Arc<dyn SearchObserver>,
}

impl Searcher {
    /// Create a new searcher over the given index reader.
    pub fn new(reader: Arc<dyn IndexReader>) -> Self {
        Searcher {
            reader,
            orchestrator: Arc::new(CallingThreadOrchestrator),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Dispatch rounds through the given orchestrator.
    pub fn with_orchestrator(mut self, orchestrator: Arc<dyn WorkOrchestrator>) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Report round telemetry to the given observer.
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Get the index reader.
    pub fn reader(&self) -> &Arc<dyn IndexReader> {
        &self.reader
    }

    /// Execute a search and return the extracted-but-not-yet-loaded result.
    ///
    /// The pipeline scan is bounded by `min(offset + limit, max_doc)`, or the
    /// full index when `limit` is `None`. A `limit` of zero returns an empty
    /// result immediately, without touching the index.
    pub fn search<D, H>(
        &self,
        request: &SearchRequest<D, H>,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<LoadableSearchResult<D, H>> {
        let query = request.query().description();

        if limit == Some(0) {
            self.observer.round_completed(&RoundReport {
                kind: RoundKind::Search,
                query,
                took: std::time::Duration::ZERO,
                hit_count: 0,
                timed_out: false,
            });
            return Ok(LoadableSearchResult::empty(Arc::clone(request.mapper())));
        }

        let mut timeout = TimeoutManager::new(request.timeout(), query.clone());
        timeout.start();

        let max_doc = self.reader.max_doc()? as usize;
        let capacity = match limit {
            Some(limit) => offset.saturating_add(limit).min(max_doc),
            None => max_doc,
        };

        let window = self.submit_window(request, capacity, &mut timeout)?;
        let end = match limit {
            Some(limit) => offset.saturating_add(limit),
            None => window.hit_count(),
        };
        let loadable = window.extract(offset, end)?;
        timeout.stop();

        self.observer.round_completed(&RoundReport {
            kind: RoundKind::Search,
            query,
            took: timeout.took(),
            hit_count: window.total().value(),
            timed_out: window.timed_out(),
        });

        Ok(loadable.with_timing(timeout.took(), window.timed_out()))
    }

    /// Count the documents matching the request, without building ranked
    /// output. The round enforces the request's timeout like any other; a
    /// truncated (soft-timeout) count fails with
    /// [`QuarryError::TruncatedCount`] carrying the lower bound.
    pub fn count<D, H>(&self, request: &SearchRequest<D, H>) -> Result<u64> {
        let query = request.query().description();
        let mut timeout = TimeoutManager::new(request.timeout(), query.clone());
        timeout.start();

        let window = self.submit_window(request, 0, &mut timeout)?;
        timeout.stop();

        self.observer.round_completed(&RoundReport {
            kind: RoundKind::Count,
            query,
            took: timeout.took(),
            hit_count: window.total().value(),
            timed_out: window.timed_out(),
        });

        window.total().exact_count()
    }

    /// Explain the score computation for a single document.
    pub fn explain<D, H>(
        &self,
        request: &SearchRequest<D, H>,
        doc_id: u64,
    ) -> Result<Explanation> {
        let query = request.query();
        let description = query.description();

        let mut matcher = query.matcher(self.reader.as_ref())?;
        while !matcher.is_exhausted() && matcher.doc_id() < doc_id {
            if !matcher.next()? {
                break;
            }
        }

        let explanation = if matcher.doc_id() == doc_id {
            let scorer = query.scorer(self.reader.as_ref())?;
            let term_freq = matcher.term_freq();
            let score = scorer.score(doc_id, term_freq);
            Explanation {
                value: score,
                description: format!(
                    "score for doc {doc_id} matching {description}, computed by {}",
                    scorer.name()
                ),
                details: vec![Explanation {
                    value: term_freq as f32,
                    description: "term frequency".to_string(),
                    details: Vec::new(),
                }],
            }
        } else {
            Explanation {
                value: 0.0,
                description: format!("doc {doc_id} does not match {description}"),
                details: Vec::new(),
            }
        };

        self.observer.round_completed(&RoundReport {
            kind: RoundKind::Explain,
            query: description,
            took: std::time::Duration::ZERO,
            hit_count: u64::from(explanation.value > 0.0),
            timed_out: false,
        });

        Ok(explanation)
    }

    fn submit_window<D, H>(
        &self,
        request: &SearchRequest<D, H>,
        capacity: usize,
        timeout: &mut TimeoutManager,
    ) -> Result<ExtractableSearchResult<D, H>> {
        let mut window = None;
        let reader = &self.reader;
        self.orchestrator.submit(&mut || {
            window = Some(execute_window(reader, request, capacity, timeout)?);
            Ok(())
        })?;
        window.ok_or_else(|| QuarryError::other("orchestrator did not run the submitted work"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::memory::MemoryIndex;
    use crate::query::{MatchAllQuery, TermQuery};
    use crate::search::projection::StitchedRecordExtractor;

    fn indexed(count: usize) -> Arc<dyn IndexReader> {
        let index = MemoryIndex::new();
        let writer = index.writer();
        for i in 0..count {
            writer.add_document(
                format!("doc-{i}"),
                Document::builder().add_text("body", "common words here").build(),
            );
        }
        Arc::new(index.reader())
    }

    fn match_all_request() -> SearchRequest<
        crate::search::projection::StitchedRecord,
        crate::search::projection::StitchedRecord,
    > {
        SearchRequest::for_records(Box::new(MatchAllQuery::new()), StitchedRecordExtractor::new())
    }

    #[test]
    fn test_limit_zero_does_not_touch_the_index() {
        let reader = indexed(5);
        // Close the reader up front: the zero-limit path must not read it.
        reader.close().unwrap();
        let searcher = Searcher::new(reader);

        let result = searcher.search(&match_all_request(), 0, Some(0)).unwrap();
        assert_eq!(result.total().exact_count().unwrap(), 0);
        assert_eq!(result.extracted_len(), 0);
    }

    #[test]
    fn test_search_ranks_and_extracts() {
        let searcher = Searcher::new(indexed(8));

        let result = searcher.search(&match_all_request(), 0, Some(3)).unwrap();
        assert_eq!(result.total().exact_count().unwrap(), 8);
        assert_eq!(result.extracted_len(), 3);

        let loaded = result.load_blocking().unwrap();
        let doc_ids: Vec<u64> = loaded.hits.iter().map(|hit| hit.doc_id).collect();
        // Constant scores: ties broken by document ID.
        assert_eq!(doc_ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_offset_slices_past_ranked_prefix() {
        let searcher = Searcher::new(indexed(8));

        let result = searcher.search(&match_all_request(), 5, Some(10)).unwrap();
        let loaded = result.load_blocking().unwrap();
        let doc_ids: Vec<u64> = loaded.hits.iter().map(|hit| hit.doc_id).collect();
        assert_eq!(doc_ids, vec![5, 6, 7]);
    }

    #[test]
    fn test_count_matches_unlimited_search() {
        let searcher = Searcher::new(indexed(12));
        let request = match_all_request();

        let count = searcher.count(&request).unwrap();
        let search_total = searcher
            .search(&request, 0, None)
            .unwrap()
            .total()
            .exact_count()
            .unwrap();
        assert_eq!(count, 12);
        assert_eq!(count, search_total);
    }

    #[test]
    fn test_empty_query_yields_empty_result() {
        let searcher = Searcher::new(indexed(3));
        let request = SearchRequest::for_records(
            Box::new(TermQuery::new("body", "absent")),
            StitchedRecordExtractor::new(),
        );

        let result = searcher.search(&request, 0, Some(10)).unwrap();
        assert_eq!(result.total().exact_count().unwrap(), 0);
        assert_eq!(result.extracted_len(), 0);
    }

    #[test]
    fn test_explain_matching_and_non_matching() {
        let searcher = Searcher::new(indexed(2));
        let request = SearchRequest::for_records(
            Box::new(TermQuery::new("body", "common")),
            StitchedRecordExtractor::new(),
        );

        let explanation = searcher.explain(&request, 1).unwrap();
        assert!(explanation.value > 0.0);
        assert!(!explanation.details.is_empty());

        let no_match = searcher.explain(&request, 99).unwrap();
        assert_eq!(no_match.value, 0.0);
        assert!(no_match.details.is_empty());
    }
}
