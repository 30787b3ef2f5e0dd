//! Index reader abstraction over interchangeable engines.
//!
//! The execution core only ever *reads* an index: it scans postings, loads
//! stored fields for matched hits, and inspects the parent/child metadata
//! used for nested-document stitching. Engines plug in by implementing
//! [`IndexReader`].

use std::fmt::Debug;

use crate::document::Document;
use crate::error::Result;

/// Name of the stored identifier field every root document carries.
pub const ID_FIELD: &str = "_id";

/// A single posting list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// The document ID.
    pub doc_id: u64,
    /// Number of occurrences of the term in the document.
    pub term_freq: u32,
}

/// Iterator over a posting list, in increasing document-ID order.
pub trait PostingIterator: Send {
    /// Advance and return the next posting, or `None` when exhausted.
    fn next(&mut self) -> Result<Option<Posting>>;
}

/// Trait for index readers.
///
/// A reader is a handle on index resources. It may be shared between one-shot
/// searches, but a scroll cursor takes exclusive ownership of its reader and
/// releases it through [`IndexReader::close`]. Operations on a closed reader
/// fail with [`crate::error::QuarryError::ReaderClosed`].
pub trait IndexReader: Send + Sync + Debug {
    /// Get the number of live root documents in the index.
    fn doc_count(&self) -> Result<u64>;

    /// Get the exclusive upper bound of document IDs in the index.
    fn max_doc(&self) -> Result<u64>;

    /// Load the stored fields of a document.
    fn document(&self, doc_id: u64) -> Result<Option<Document>>;

    /// Get the stored identifier of a root document.
    fn stored_id(&self, doc_id: u64) -> Result<Option<String>>;

    /// Get the nested path of a document; `Some` only for child records.
    fn nested_path(&self, doc_id: u64) -> Result<Option<String>>;

    /// Get the parent identifier of a child record.
    fn parent_id(&self, doc_id: u64) -> Result<Option<String>>;

    /// Get the posting list for a field/term pair, over root documents.
    fn postings(&self, field: &str, term: &str) -> Result<Option<Box<dyn PostingIterator>>>;

    /// Get the number of root documents containing a term.
    fn term_doc_freq(&self, field: &str, term: &str) -> Result<u64>;

    /// Release the resources held by this reader. Idempotent.
    fn close(&self) -> Result<()>;

    /// Check if the reader has been closed.
    fn is_closed(&self) -> bool;
}
