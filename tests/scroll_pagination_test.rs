//! Scroll cursor behavior over realistically sized result sets.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use quarry::document::Document;
use quarry::error::Result;
use quarry::index::{IndexReader, MemoryIndex};
use quarry::query::MatchAllQuery;
use quarry::search::{
    ScrollCursor, SearchRequest, Searcher, StitchedRecord, StitchedRecordExtractor,
    WorkOrchestrator,
};

/// Counts window fetches dispatched by the cursor.
#[derive(Debug, Default)]
struct CountingOrchestrator {
    submissions: AtomicUsize,
}

impl WorkOrchestrator for CountingOrchestrator {
    fn submit(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        work()
    }
}

fn indexed(count: usize) -> Arc<MemoryIndex> {
    let index = MemoryIndex::new();
    let writer = index.writer();
    for i in 0..count {
        writer.add_document(format!("doc-{i}"), Document::new());
    }
    index
}

fn match_all_request() -> SearchRequest<StitchedRecord, StitchedRecord> {
    SearchRequest::for_records(Box::new(MatchAllQuery::new()), StitchedRecordExtractor::new())
}

#[test]
fn test_scroll_visits_every_hit_once_in_search_order() -> Result<()> {
    let index = indexed(23);

    let searcher = Searcher::new(Arc::new(index.reader()));
    let expected: Vec<u64> = searcher
        .search(&match_all_request(), 0, None)?
        .load_blocking()?
        .hits
        .iter()
        .map(|hit| hit.doc_id)
        .collect();

    let mut cursor = ScrollCursor::new(match_all_request(), Arc::new(index.reader()), 4)?;
    let mut scrolled = Vec::new();
    loop {
        let page = cursor.next()?;
        if !page.has_more {
            break;
        }
        scrolled.extend(page.hits.iter().map(|hit| hit.doc_id));
    }
    cursor.close()?;

    assert_eq!(scrolled, expected);
    Ok(())
}

#[test]
fn test_large_scroll_yields_full_pages_then_one_empty_page() -> Result<()> {
    let index = indexed(3000);
    let mut cursor = ScrollCursor::new(match_all_request(), Arc::new(index.reader()), 5)?;

    let mut pages = 0usize;
    let mut hits = 0usize;
    loop {
        let page = cursor.next()?;
        if !page.has_more {
            assert!(page.hits.is_empty());
            break;
        }
        // 3000 divides evenly into pages of 5: every hit-bearing page is full.
        assert_eq!(page.hits.len(), 5);
        pages += 1;
        hits += page.hits.len();
    }

    assert_eq!(pages, 600);
    assert_eq!(hits, 3000);

    // The cursor stays exhausted on subsequent calls.
    assert!(!cursor.next()?.has_more);
    cursor.close()?;
    Ok(())
}

#[test]
fn test_fetch_window_grows_geometrically() -> Result<()> {
    let index = indexed(3000);
    let orchestrator = Arc::new(CountingOrchestrator::default());
    let mut cursor = ScrollCursor::new(match_all_request(), Arc::new(index.reader()), 5)?
        .with_orchestrator(Arc::clone(&orchestrator) as Arc<dyn WorkOrchestrator>);

    while cursor.next()?.has_more {}

    // 601 scroll steps are served by doubling re-queries: windows of
    // 20, 40, 80, 160, 320, 640, 1280, 2560 and 5120 hits.
    assert_eq!(orchestrator.submissions.load(Ordering::SeqCst), 9);
    cursor.close()?;
    Ok(())
}

#[test]
fn test_drop_releases_the_reader() -> Result<()> {
    let index = indexed(6);
    let reader: Arc<dyn IndexReader> = Arc::new(index.reader());

    let mut cursor = ScrollCursor::new(match_all_request(), Arc::clone(&reader), 2)?;
    cursor.next()?;
    assert!(!reader.is_closed());

    drop(cursor);
    assert!(reader.is_closed());
    Ok(())
}
