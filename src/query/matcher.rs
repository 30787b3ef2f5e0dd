//! Matcher implementations for query execution.
//!
//! A matcher is positioned on its first match at construction time; the scan
//! loop reads `doc_id()`/`term_freq()` and advances with `next()` until
//! `is_exhausted()`.

use std::fmt::Debug;

use crate::error::Result;
use crate::index::reader::{IndexReader, Posting, PostingIterator};

/// Trait for document matchers.
pub trait Matcher: Send {
    /// Get the current document ID, or `u64::MAX` when exhausted.
    fn doc_id(&self) -> u64;

    /// Term frequency at the current document (1 for non-term matchers).
    fn term_freq(&self) -> u32;

    /// Move to the next matching document. Returns false when exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Check if this matcher is exhausted.
    fn is_exhausted(&self) -> bool;
}

/// A matcher that matches no documents.
#[derive(Debug, Default)]
pub struct EmptyMatcher;

impl EmptyMatcher {
    /// Create a new empty matcher.
    pub fn new() -> Self {
        EmptyMatcher
    }
}

impl Matcher for EmptyMatcher {
    fn doc_id(&self) -> u64 {
        u64::MAX
    }

    fn term_freq(&self) -> u32 {
        0
    }

    fn next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn is_exhausted(&self) -> bool {
        true
    }
}

/// A matcher over a fixed, ascending list of document IDs.
#[derive(Debug)]
pub struct AllDocsMatcher {
    doc_ids: Vec<u64>,
    position: usize,
}

impl AllDocsMatcher {
    /// Create a matcher over an explicit document-ID list.
    pub fn new(doc_ids: Vec<u64>) -> Self {
        AllDocsMatcher {
            doc_ids,
            position: 0,
        }
    }

    /// Create a matcher over every root document of the index, skipping
    /// nested child records.
    pub fn for_roots(reader: &dyn IndexReader) -> Result<Self> {
        let mut doc_ids = Vec::new();
        for doc_id in 0..reader.max_doc()? {
            if reader.nested_path(doc_id)?.is_none() {
                doc_ids.push(doc_id);
            }
        }
        Ok(AllDocsMatcher::new(doc_ids))
    }
}

impl Matcher for AllDocsMatcher {
    fn doc_id(&self) -> u64 {
        self.doc_ids.get(self.position).copied().unwrap_or(u64::MAX)
    }

    fn term_freq(&self) -> u32 {
        1
    }

    fn next(&mut self) -> Result<bool> {
        if self.position < self.doc_ids.len() {
            self.position += 1;
        }
        Ok(self.position < self.doc_ids.len())
    }

    fn is_exhausted(&self) -> bool {
        self.position >= self.doc_ids.len()
    }
}

/// A matcher driven by a posting list iterator.
pub struct PostingMatcher {
    postings: Box<dyn PostingIterator>,
    current: Option<Posting>,
}

impl PostingMatcher {
    /// Create a new posting matcher, positioned on the first posting.
    pub fn new(mut postings: Box<dyn PostingIterator>) -> Result<Self> {
        let current = postings.next()?;
        Ok(PostingMatcher { postings, current })
    }
}

impl Debug for PostingMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostingMatcher")
            .field("current", &self.current)
            .finish()
    }
}

impl Matcher for PostingMatcher {
    fn doc_id(&self) -> u64 {
        self.current.map(|p| p.doc_id).unwrap_or(u64::MAX)
    }

    fn term_freq(&self) -> u32 {
        self.current.map(|p| p.term_freq).unwrap_or(0)
    }

    fn next(&mut self) -> Result<bool> {
        self.current = self.postings.next()?;
        Ok(self.current.is_some())
    }

    fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matcher() {
        let mut matcher = EmptyMatcher::new();
        assert!(matcher.is_exhausted());
        assert_eq!(matcher.doc_id(), u64::MAX);
        assert!(!matcher.next().unwrap());
    }

    #[test]
    fn test_all_docs_matcher() {
        let mut matcher = AllDocsMatcher::new(vec![2, 5, 9]);

        assert!(!matcher.is_exhausted());
        assert_eq!(matcher.doc_id(), 2);
        assert!(matcher.next().unwrap());
        assert_eq!(matcher.doc_id(), 5);
        assert!(matcher.next().unwrap());
        assert_eq!(matcher.doc_id(), 9);
        assert!(!matcher.next().unwrap());
        assert!(matcher.is_exhausted());
        assert_eq!(matcher.doc_id(), u64::MAX);
    }
}
