//! Derived child-join query used by the nested-document resolver.

use ahash::AHashSet;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::matcher::{AllDocsMatcher, Matcher};
use crate::query::query::Query;
use crate::query::scorer::{ConstScorer, Scorer};

/// A query matching nested child records whose ancestor chain passes through
/// one of an already-matched set of parents, restricted to the nested paths a
/// projection actually reads.
///
/// This is the to-child join expressed over the matched parent set: the main
/// ranked-hit pass has already decided which parents matched, so the second
/// pass only needs to filter child records by parent identifier and path.
#[derive(Debug, Clone)]
pub struct NestedChildQuery {
    parent_ids: AHashSet<String>,
    paths: AHashSet<String>,
}

impl NestedChildQuery {
    /// Create a new child-join query.
    pub fn new(parent_ids: AHashSet<String>, paths: AHashSet<String>) -> Self {
        NestedChildQuery { parent_ids, paths }
    }
}

impl Query for NestedChildQuery {
    fn matcher(&self, reader: &dyn IndexReader) -> Result<Box<dyn Matcher>> {
        let mut doc_ids = Vec::new();
        for doc_id in 0..reader.max_doc()? {
            let path = match reader.nested_path(doc_id)? {
                Some(path) => path,
                // root document, not a child record
                None => continue,
            };
            if !self.paths.contains(&path) {
                continue;
            }
            match reader.parent_id(doc_id)? {
                Some(parent) if self.parent_ids.contains(&parent) => doc_ids.push(doc_id),
                _ => {}
            }
        }
        Ok(Box::new(AllDocsMatcher::new(doc_ids)))
    }

    fn scorer(&self, _reader: &dyn IndexReader) -> Result<Box<dyn Scorer>> {
        // Child records contribute data, not relevance.
        Ok(Box::new(ConstScorer::new(0.0)))
    }

    fn description(&self) -> String {
        let mut paths: Vec<_> = self.paths.iter().map(|s| s.as_str()).collect();
        paths.sort_unstable();
        format!("nested_children(paths=[{}])", paths.join(", "))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn is_empty(&self, _reader: &dyn IndexReader) -> Result<bool> {
        Ok(self.parent_ids.is_empty() || self.paths.is_empty())
    }
}
