//! Scroll cursor: stateful pagination with a geometrically growing fetch
//! window.
//!
//! The underlying engine has no native incremental-scroll primitive, so the
//! cursor re-runs the query when the cached window runs out; doubling the
//! fetch window bounds the number of re-queries to O(log(total / page_size)).

use std::sync::Arc;
use std::time::Duration;

use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::search::SearchRequest;
use crate::search::observer::{NoopObserver, RoundKind, RoundReport, SearchObserver};
use crate::search::orchestrator::{CallingThreadOrchestrator, WorkOrchestrator};
use crate::search::projection::ExtractableSearchResult;
use crate::search::searcher::execute_window;
use crate::search::timeout::TimeoutManager;

/// One page of scroll results.
#[derive(Debug, Clone)]
pub struct ScrollPage<H> {
    /// Whether this page carried hits; the first empty page reports `false`.
    pub has_more: bool,
    /// The loaded hits of this page.
    pub hits: Vec<H>,
    /// Elapsed time of this scroll step.
    pub took: Duration,
    /// Whether a soft timeout truncated the window this page came from.
    pub timed_out: bool,
}

/// A stateful cursor over successive fixed-size pages of a result set.
///
/// The cursor exclusively owns its index reader and releases it exactly once,
/// via [`ScrollCursor::close`] or on drop. `next()` must not be invoked
/// concurrently on the same cursor; result loading runs synchronously in the
/// calling thread.
pub struct ScrollCursor<D, H> {
    request: SearchRequest<D, H>,
    reader: Arc<dyn IndexReader>,
    orchestrator: Arc<dyn WorkOrchestrator>,
    observer: Arc<dyn SearchObserver>,
    page_size: usize,
    scroll_index: usize,
    fetch_size: usize,
    window: Option<ExtractableSearchResult<D, H>>,
    closed: bool,
}

impl<D, H> ScrollCursor<D, H> {
    /// Open a cursor over `request` with the given page size.
    ///
    /// `reader` must be dedicated to this cursor; it is closed when the
    /// cursor is released.
    pub fn new(
        request: SearchRequest<D, H>,
        reader: Arc<dyn IndexReader>,
        page_size: usize,
    ) -> Result<Self> {
        if page_size == 0 {
            return Err(QuarryError::invalid_operation(
                "scroll page size must be positive",
            ));
        }
        Ok(ScrollCursor {
            request,
            reader,
            orchestrator: Arc::new(CallingThreadOrchestrator),
            observer: Arc::new(NoopObserver),
            page_size,
            scroll_index: 0,
            // Prefetch the window for the first four pages up front.
            fetch_size: page_size * 4,
            window: None,
            closed: false,
        })
    }

    /// Dispatch window fetches through the given orchestrator.
    pub fn with_orchestrator(mut self, orchestrator: Arc<dyn WorkOrchestrator>) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Report round telemetry to the given observer.
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fetch the next page.
    pub fn next(&mut self) -> Result<ScrollPage<H>> {
        if self.closed {
            return Err(QuarryError::invalid_operation(
                "next() on a closed scroll cursor",
            ));
        }

        let query = self.request.query().description();
        let mut timeout = TimeoutManager::new(self.request.timeout(), query.clone());
        timeout.start();

        if self.window.is_none() || self.scroll_index + self.page_size > self.fetch_size {
            if self.window.is_some() {
                self.fetch_size *= 2;
            }
            self.window = Some(self.fetch_window(&mut timeout)?);
        }
        let window = self
            .window
            .as_ref()
            .ok_or_else(|| QuarryError::other("scroll window missing after fetch"))?;

        // No more results in a window that covered the whole result set.
        if self.scroll_index >= window.hit_count() {
            self.observer.round_completed(&RoundReport {
                kind: RoundKind::ScrollStep,
                query,
                took: Duration::ZERO,
                hit_count: window.total().value(),
                timed_out: false,
            });
            return Ok(ScrollPage {
                has_more: false,
                hits: Vec::new(),
                took: Duration::ZERO,
                timed_out: false,
            });
        }

        let loadable = window.extract(self.scroll_index, self.scroll_index + self.page_size)?;
        let timed_out = window.timed_out();
        let total = window.total().value();

        // Must run in the caller's thread: the mapper may block on entity
        // loading.
        let result = loadable.load_blocking()?;

        timeout.stop();
        self.scroll_index += self.page_size;

        self.observer.round_completed(&RoundReport {
            kind: RoundKind::ScrollStep,
            query,
            took: timeout.took(),
            hit_count: total,
            timed_out,
        });

        Ok(ScrollPage {
            has_more: true,
            hits: result.hits,
            took: timeout.took(),
            timed_out,
        })
    }

    /// Release the cursor's index reader. Idempotent; must run on every exit
    /// path (also invoked on drop).
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.window = None;
        self.reader.close()
    }

    fn fetch_window(
        &self,
        timeout: &mut TimeoutManager,
    ) -> Result<ExtractableSearchResult<D, H>> {
        let mut window = None;
        let reader = &self.reader;
        let request = &self.request;
        let fetch_size = self.fetch_size;
        self.orchestrator.submit(&mut || {
            window = Some(execute_window(reader, request, fetch_size, timeout)?);
            Ok(())
        })?;
        window.ok_or_else(|| QuarryError::other("orchestrator did not run the submitted work"))
    }
}

impl<D, H> Drop for ScrollCursor<D, H> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(error) = self.close() {
                self.observer.reader_release_failed(&error);
            }
        }
    }
}

impl<D, H> std::fmt::Debug for ScrollCursor<D, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollCursor")
            .field("query", &self.request.query().description())
            .field("page_size", &self.page_size)
            .field("scroll_index", &self.scroll_index)
            .field("fetch_size", &self.fetch_size)
            .field("closed", &self.closed)
            .finish()
    }
}
