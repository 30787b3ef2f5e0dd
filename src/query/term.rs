//! Term query implementation.

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::matcher::{EmptyMatcher, Matcher, PostingMatcher};
use crate::query::query::Query;
use crate::query::scorer::{Bm25Scorer, Scorer};

/// A query matching root documents containing a single term in a field.
#[derive(Debug, Clone)]
pub struct TermQuery {
    field: String,
    term: String,
}

impl TermQuery {
    /// Create a new term query.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        TermQuery {
            field: field.into(),
            term: term.into(),
        }
    }

    /// Get the field this query searches in.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Get the term this query searches for.
    pub fn term(&self) -> &str {
        &self.term
    }
}

impl Query for TermQuery {
    fn matcher(&self, reader: &dyn IndexReader) -> Result<Box<dyn Matcher>> {
        match reader.postings(&self.field, &self.term)? {
            Some(postings) => Ok(Box::new(PostingMatcher::new(postings)?)),
            None => Ok(Box::new(EmptyMatcher::new())),
        }
    }

    fn scorer(&self, reader: &dyn IndexReader) -> Result<Box<dyn Scorer>> {
        let doc_freq = reader.term_doc_freq(&self.field, &self.term)?;
        Ok(Box::new(Bm25Scorer::new(doc_freq, reader.doc_count()?)))
    }

    fn description(&self) -> String {
        format!("term({}:{})", self.field, self.term)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn is_empty(&self, reader: &dyn IndexReader) -> Result<bool> {
        Ok(reader.term_doc_freq(&self.field, &self.term)? == 0)
    }
}
