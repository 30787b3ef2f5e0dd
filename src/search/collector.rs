//! Collector pipeline: hit counting, top-N ranking and auxiliary per-hit
//! values gathered in a single index pass.
//!
//! The pipeline is a closed set of collector variants composed at round start
//! from the capabilities a projection declares, rather than open-ended runtime
//! polymorphism. The composite polls the round's [`TimeoutManager`] every
//! [`TIMEOUT_CHECK_INTERVAL`] collected documents.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::document::GeoPoint;
use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::query::ScoredHit;
use crate::search::timeout::TimeoutManager;
use crate::search::{SortField, SortOrder};

/// The deadline is checked every this many collected documents, so that
/// system-clock reads do not dominate the scan loop.
pub const TIMEOUT_CHECK_INTERVAL: u64 = 256;

/// A total hit count, either exact or a lower bound.
///
/// The count stops being exact when a soft timeout truncated the scan or the
/// configured total-hits threshold was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalHits {
    value: u64,
    exact: bool,
}

impl TotalHits {
    pub(crate) fn new(value: u64, exact: bool) -> Self {
        TotalHits { value, exact }
    }

    /// The hit count as a lower bound; always available.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Whether the count is exact.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// The exact hit count.
    ///
    /// Fails with [`QuarryError::TruncatedCount`] when only a lower bound is
    /// available.
    pub fn exact_count(&self) -> Result<u64> {
        if self.exact {
            Ok(self.value)
        } else {
            Err(QuarryError::TruncatedCount {
                lower_bound: self.value,
            })
        }
    }
}

/// A collector capability a projection can require beyond counting and
/// ranking.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorRequirement {
    /// Collect the distance from `origin` to each hit's `field` value.
    Distance {
        /// The stored geo field to measure.
        field: String,
        /// The point distances are measured from.
        origin: GeoPoint,
    },
}

/// Result of one collector pipeline run.
#[derive(Debug)]
pub struct CollectorOutput {
    /// Total hit count (exact or lower bound).
    pub total: TotalHits,
    /// Ranked hits, best first, up to the capacity bound.
    pub hits: Vec<ScoredHit>,
    /// Auxiliary per-hit values keyed by document ID (e.g. distance).
    pub distances: AHashMap<u64, f64>,
    /// Whether a soft timeout truncated the scan.
    pub timed_out: bool,
}

/// A sort key extracted for one document.
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Missing,
}

impl SortValue {
    /// Ascending comparison; missing values sort last, numeric variants
    /// cross-compare, and mixed text/numeric fall back to type precedence.
    fn cmp_values(&self, other: &SortValue) -> Ordering {
        use SortValue::*;
        match (self, other) {
            (Text(a), Text(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Missing, Missing) => Ordering::Equal,
            (Missing, _) => Ordering::Greater,
            (_, Missing) => Ordering::Less,
            (Text(_), _) => Ordering::Less,
            (_, Text(_)) => Ordering::Greater,
        }
    }
}

/// Counts hits, exactly up to a threshold.
#[derive(Debug)]
struct HitCountCollector {
    count: u64,
    threshold: u64,
    exact: bool,
}

impl HitCountCollector {
    fn new(threshold: u64) -> Self {
        HitCountCollector {
            count: 0,
            threshold,
            exact: true,
        }
    }

    fn collect(&mut self) {
        if self.count < self.threshold {
            self.count += 1;
        } else {
            self.exact = false;
        }
    }

    fn saturated(&self) -> bool {
        !self.exact
    }
}

/// Heap entry: one candidate hit with its sort key.
#[derive(Debug)]
struct RankedEntry {
    key: SortValue,
    doc_id: u64,
    score: f32,
    ascending: bool,
}

impl RankedEntry {
    /// Ranking order: `Less` means this entry outranks `other`.
    fn ranking_cmp(&self, other: &RankedEntry) -> Ordering {
        let by_key = self.key.cmp_values(&other.key);
        let by_key = if self.ascending { by_key } else { by_key.reverse() };
        by_key.then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

impl PartialEq for RankedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.ranking_cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedEntry {}

impl PartialOrd for RankedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap surfaces the worst kept entry at the top.
        self.ranking_cmp(other)
    }
}

/// Keeps the best N hits per the sort order without materializing all matches.
#[derive(Debug)]
struct TopHitsCollector {
    capacity: usize,
    ascending: bool,
    heap: BinaryHeap<RankedEntry>,
}

impl TopHitsCollector {
    fn new(capacity: usize, ascending: bool) -> Self {
        TopHitsCollector {
            capacity,
            ascending,
            heap: BinaryHeap::new(),
        }
    }

    fn collect(&mut self, key: SortValue, doc_id: u64, score: f32) {
        if self.capacity == 0 {
            return;
        }
        let entry = RankedEntry {
            key,
            doc_id,
            score,
            ascending: self.ascending,
        };
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
        } else if let Some(worst) = self.heap.peek() {
            if entry.ranking_cmp(worst) == Ordering::Less {
                self.heap.pop();
                self.heap.push(entry);
            }
        }
    }

    fn into_hits(self) -> Vec<ScoredHit> {
        let mut entries = self.heap.into_vec();
        entries.sort_by(|a, b| a.ranking_cmp(b));
        entries
            .into_iter()
            .map(|entry| ScoredHit {
                doc_id: entry.doc_id,
                score: entry.score,
            })
            .collect()
    }
}

/// Collects the distance from an origin to each hit's stored geo field.
#[derive(Debug)]
struct DistanceCollector {
    field: String,
    origin: GeoPoint,
    distances: AHashMap<u64, f64>,
}

impl DistanceCollector {
    fn new(field: String, origin: GeoPoint) -> Self {
        DistanceCollector {
            field,
            origin,
            distances: AHashMap::new(),
        }
    }

    fn collect(&mut self, reader: &dyn IndexReader, doc_id: u64) -> Result<()> {
        if let Some(distance) = distance_of(reader, doc_id, &self.field, &self.origin)? {
            self.distances.insert(doc_id, distance);
        }
        Ok(())
    }
}

/// Distance in meters from `origin` to the geo value of `field` in the given
/// document, if present. Also used when publishing nested child documents to
/// distance-requiring projections.
pub(crate) fn distance_of(
    reader: &dyn IndexReader,
    doc_id: u64,
    field: &str,
    origin: &GeoPoint,
) -> Result<Option<f64>> {
    let document = match reader.document(doc_id)? {
        Some(document) => document,
        None => return Ok(None),
    };
    Ok(document
        .get_field(field)
        .and_then(|value| value.as_geo())
        .map(|point| origin.distance_to(point)))
}

/// Builds the composite collector for one round from the declared
/// capabilities.
#[derive(Debug)]
pub struct CollectorsBuilder {
    sort: SortField,
    capacity: usize,
    threshold: u64,
    requirements: Vec<CollectorRequirement>,
}

impl CollectorsBuilder {
    /// Start a builder for a round ranking at most `capacity` hits.
    pub fn new(sort: SortField, capacity: usize) -> Self {
        CollectorsBuilder {
            sort,
            capacity,
            threshold: u64::MAX,
            requirements: Vec::new(),
        }
    }

    /// Set the exact-counting threshold.
    pub fn total_hits_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Add the capabilities a projection requires.
    pub fn requirements(mut self, requirements: Vec<CollectorRequirement>) -> Self {
        self.requirements.extend(requirements);
        self
    }

    /// Build the composite collector.
    pub fn build(self, reader: Arc<dyn IndexReader>) -> Collectors {
        let top = if self.capacity > 0 {
            let ascending = match &self.sort {
                SortField::Score => false,
                SortField::Field { order, .. } => *order == SortOrder::Asc,
            };
            Some(TopHitsCollector::new(self.capacity, ascending))
        } else {
            // Count-only round: no ranking structures.
            None
        };
        let distances = self
            .requirements
            .into_iter()
            .map(|requirement| match requirement {
                CollectorRequirement::Distance { field, origin } => {
                    DistanceCollector::new(field, origin)
                }
            })
            .collect();
        Collectors {
            reader,
            sort: self.sort,
            count: HitCountCollector::new(self.threshold),
            top,
            distances,
            seen: 0,
            timed_out: false,
        }
    }
}

/// The composed per-round collector pipeline. Stateful, never reused across
/// rounds.
#[derive(Debug)]
pub struct Collectors {
    reader: Arc<dyn IndexReader>,
    sort: SortField,
    count: HitCountCollector,
    top: Option<TopHitsCollector>,
    distances: Vec<DistanceCollector>,
    seen: u64,
    timed_out: bool,
}

impl Collectors {
    /// Collect one matching document.
    ///
    /// Returns `Ok(true)` to continue the scan and `Ok(false)` to stop it
    /// (soft timeout expiry, or the count saturated while ranking is full).
    pub fn collect(
        &mut self,
        doc_id: u64,
        score: f32,
        timeout: &mut TimeoutManager,
    ) -> Result<bool> {
        if self.seen % TIMEOUT_CHECK_INTERVAL == 0 && timeout.check()? {
            self.timed_out = true;
            return Ok(false);
        }
        self.seen += 1;

        self.count.collect();
        if self.top.is_some() {
            let key = match &self.sort {
                SortField::Score => SortValue::Float(score as f64),
                SortField::Field { name, .. } => self.sort_value(doc_id, name)?,
            };
            if let Some(top) = &mut self.top {
                top.collect(key, doc_id, score);
            }
        }
        for distance in &mut self.distances {
            distance.collect(self.reader.as_ref(), doc_id)?;
        }

        // A saturated count only ends the scan on count-only rounds; a ranked
        // round must keep scanning because later documents may still outrank
        // the kept hits.
        if self.count.saturated() && self.top.is_none() {
            return Ok(false);
        }
        Ok(true)
    }

    fn sort_value(&self, doc_id: u64, field: &str) -> Result<SortValue> {
        use crate::document::FieldValue;

        let document = match self.reader.document(doc_id)? {
            Some(document) => document,
            None => return Ok(SortValue::Missing),
        };
        Ok(match document.get_field(field) {
            Some(FieldValue::Text(s)) => SortValue::Text(s.clone()),
            Some(FieldValue::Integer(i)) => SortValue::Integer(*i),
            Some(FieldValue::Float(f)) => SortValue::Float(*f),
            Some(FieldValue::Boolean(b)) => SortValue::Integer(*b as i64),
            Some(FieldValue::DateTime(dt)) => SortValue::Integer(dt.timestamp_micros()),
            Some(FieldValue::Geo(_)) | Some(FieldValue::Null) | None => SortValue::Missing,
        })
    }

    /// Finish the round and produce the pipeline result.
    pub fn finish(self) -> CollectorOutput {
        let mut distances = AHashMap::new();
        for collector in self.distances {
            distances.extend(collector.distances);
        }
        CollectorOutput {
            total: TotalHits::new(self.count.count, self.count.exact && !self.timed_out),
            hits: self.top.map(TopHitsCollector::into_hits).unwrap_or_default(),
            distances,
            timed_out: self.timed_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::memory::MemoryIndex;
    use std::time::Duration;

    fn reader() -> Arc<dyn IndexReader> {
        let index = MemoryIndex::new();
        let writer = index.writer();
        for i in 0..10 {
            writer.add_document(
                format!("doc-{i}"),
                Document::builder().add_integer("rank", 10 - i).build(),
            );
        }
        Arc::new(index.reader())
    }

    fn no_timeout() -> TimeoutManager {
        TimeoutManager::new(None, "test")
    }

    #[test]
    fn test_top_hits_by_score_with_doc_id_tiebreak() {
        let mut collectors = CollectorsBuilder::new(SortField::Score, 3).build(reader());
        let mut timeout = no_timeout();

        for (doc_id, score) in [(0, 0.5), (1, 0.8), (2, 0.8), (3, 0.1), (4, 0.9)] {
            assert!(collectors.collect(doc_id, score, &mut timeout).unwrap());
        }

        let output = collectors.finish();
        assert_eq!(output.total.exact_count().unwrap(), 5);
        let doc_ids: Vec<u64> = output.hits.iter().map(|hit| hit.doc_id).collect();
        // Equal scores (docs 1 and 2) break ties by document ID.
        assert_eq!(doc_ids, vec![4, 1, 2]);
    }

    #[test]
    fn test_sort_by_field_ascending() {
        let mut collectors = CollectorsBuilder::new(
            SortField::Field {
                name: "rank".to_string(),
                order: SortOrder::Asc,
            },
            4,
        )
        .build(reader());
        let mut timeout = no_timeout();

        for doc_id in 0..10 {
            collectors.collect(doc_id, 1.0, &mut timeout).unwrap();
        }

        let output = collectors.finish();
        // rank = 10 - doc_id, so ascending rank means descending doc_id.
        let doc_ids: Vec<u64> = output.hits.iter().map(|hit| hit.doc_id).collect();
        assert_eq!(doc_ids, vec![9, 8, 7, 6]);
    }

    #[test]
    fn test_count_only_round_collects_no_hits() {
        let mut collectors = CollectorsBuilder::new(SortField::Score, 0).build(reader());
        let mut timeout = no_timeout();

        for doc_id in 0..10 {
            collectors.collect(doc_id, 1.0, &mut timeout).unwrap();
        }

        let output = collectors.finish();
        assert!(output.hits.is_empty());
        assert_eq!(output.total.exact_count().unwrap(), 10);
    }

    #[test]
    fn test_threshold_makes_count_a_lower_bound() {
        let mut collectors = CollectorsBuilder::new(SortField::Score, 2)
            .total_hits_threshold(3)
            .build(reader());
        let mut timeout = no_timeout();

        for doc_id in 0..10 {
            assert!(collectors.collect(doc_id, 1.0, &mut timeout).unwrap());
        }

        let output = collectors.finish();
        assert!(!output.total.is_exact());
        assert_eq!(output.total.value(), 3);
        match output.total.exact_count() {
            Err(QuarryError::TruncatedCount { lower_bound }) => assert_eq!(lower_bound, 3),
            other => panic!("expected TruncatedCount, got {other:?}"),
        }
    }

    #[test]
    fn test_threshold_does_not_degrade_ranking() {
        let mut collectors = CollectorsBuilder::new(SortField::Score, 2)
            .total_hits_threshold(3)
            .build(reader());
        let mut timeout = no_timeout();

        // Strictly improving scores: the best documents arrive after the
        // count has saturated.
        for doc_id in 0..10 {
            let score = doc_id as f32;
            assert!(collectors.collect(doc_id, score, &mut timeout).unwrap());
        }

        let output = collectors.finish();
        let doc_ids: Vec<u64> = output.hits.iter().map(|hit| hit.doc_id).collect();
        assert_eq!(doc_ids, vec![9, 8]);
        // Only the count degrades to a lower bound.
        assert!(!output.total.is_exact());
        assert_eq!(output.total.value(), 3);
    }

    #[test]
    fn test_count_only_round_stops_at_threshold() {
        let mut collectors = CollectorsBuilder::new(SortField::Score, 0)
            .total_hits_threshold(3)
            .build(reader());
        let mut timeout = no_timeout();

        let mut scanned = 0;
        for doc_id in 0..10 {
            scanned += 1;
            if !collectors.collect(doc_id, 1.0, &mut timeout).unwrap() {
                break;
            }
        }
        // With no ranking to feed, the scan ends once the count saturates.
        assert!(scanned < 10);

        let output = collectors.finish();
        assert!(!output.total.is_exact());
        assert_eq!(output.total.value(), 3);
    }

    #[test]
    fn test_soft_timeout_truncates_scan() {
        let mut collectors = CollectorsBuilder::new(SortField::Score, 5).build(reader());
        let config = crate::search::TimeoutConfig {
            duration: Duration::from_nanos(1),
            mode: crate::search::TimeoutMode::Truncate,
        };
        let mut timeout = TimeoutManager::new(Some(config), "test");
        timeout.start();
        std::thread::sleep(Duration::from_millis(1));

        // First check point (document 0) observes the expired deadline.
        assert!(!collectors.collect(0, 1.0, &mut timeout).unwrap());

        let output = collectors.finish();
        assert!(output.timed_out);
        assert!(!output.total.is_exact());
        assert_eq!(output.total.value(), 0);
    }

    #[test]
    fn test_distance_requirement() {
        let index = MemoryIndex::new();
        let writer = index.writer();
        writer.add_document(
            "paris",
            Document::builder().add_geo("location", 48.8566, 2.3522).build(),
        );
        writer.add_document("nowhere", Document::new());
        let reader: Arc<dyn IndexReader> = Arc::new(index.reader());

        let origin = GeoPoint::new(48.8566, 2.3522);
        let mut collectors = CollectorsBuilder::new(SortField::Score, 10)
            .requirements(vec![CollectorRequirement::Distance {
                field: "location".to_string(),
                origin,
            }])
            .build(reader);
        let mut timeout = no_timeout();
        collectors.collect(0, 1.0, &mut timeout).unwrap();
        collectors.collect(1, 1.0, &mut timeout).unwrap();

        let output = collectors.finish();
        assert!(output.distances[&0] < 1.0);
        assert!(!output.distances.contains_key(&1));
    }
}
