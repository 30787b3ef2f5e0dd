//! Nested-document resolution: the second, scoped pass that fetches child
//! records for already-matched parent hits.
//!
//! Matching children requires knowing which parents matched, so this is a
//! two-pass design: the main ranked-hit pass collects parents, then one
//! derived query — restricted to child records, the projected nested paths,
//! and the matched parent set — collects the children. The resulting
//! parent-to-children map is allocated fresh per result batch and discarded
//! after stitching.

use ahash::{AHashMap, AHashSet};

use crate::error::{QuarryError, Result};
use crate::index::reader::IndexReader;
use crate::query::nested::NestedChildQuery;
use crate::query::{Query, ScoredHit};

/// Groups child document IDs by their parent identifier during the child
/// scan.
#[derive(Debug, Default)]
pub struct ChildrenCollector {
    groups: AHashMap<String, Vec<u64>>,
}

impl ChildrenCollector {
    /// Create a new, empty collector.
    pub fn new() -> Self {
        ChildrenCollector::default()
    }

    /// Record one child document under its parent identifier.
    pub fn collect<S: Into<String>>(&mut self, parent: S, child_doc_id: u64) {
        self.groups.entry(parent.into()).or_default().push(child_doc_id);
    }

    /// Consume the collector, yielding the grouped children.
    pub fn into_groups(self) -> AHashMap<String, Vec<u64>> {
        self.groups
    }
}

/// Resolve the nested child documents of the given matched hits.
///
/// Returns a map from parent document ID to that parent's child document IDs,
/// covering only children on the projected `paths`. Skipped entirely (empty
/// map, no index access) when `paths` is empty.
pub(crate) fn resolve_nested_docs(
    reader: &dyn IndexReader,
    query_description: &str,
    hits: &[ScoredHit],
    paths: &[String],
) -> Result<AHashMap<u64, Vec<u64>>> {
    if paths.is_empty() || hits.is_empty() {
        return Ok(AHashMap::new());
    }

    // First pass over the hits: resolve each hit's stored identifier.
    let mut parent_ids: AHashMap<String, u64> = AHashMap::with_capacity(hits.len());
    for hit in hits {
        if let Some(id) = reader.stored_id(hit.doc_id)? {
            parent_ids.insert(id, hit.doc_id);
        }
    }

    // Second pass: derived child-join query over the matched parent set.
    let child_query = NestedChildQuery::new(
        parent_ids.keys().cloned().collect::<AHashSet<String>>(),
        paths.iter().cloned().collect::<AHashSet<String>>(),
    );
    let mut children = ChildrenCollector::new();
    let mut matcher = child_query
        .matcher(reader)
        .map_err(|e| QuarryError::execution(query_description, e))?;
    while !matcher.is_exhausted() {
        let child_doc_id = matcher.doc_id();
        if child_doc_id == u64::MAX {
            break;
        }
        if let Some(parent) = reader.parent_id(child_doc_id)? {
            children.collect(parent, child_doc_id);
        }
        if !matcher.next()? {
            break;
        }
    }

    // Regroup by parent document ID.
    let mut result = AHashMap::new();
    for (parent, child_ids) in children.into_groups() {
        if let Some(&parent_doc_id) = parent_ids.get(&parent) {
            result.insert(parent_doc_id, child_ids);
        }
    }
    Ok(result)
}
