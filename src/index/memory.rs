//! In-memory index engine.
//!
//! A small reference engine backing the execution core: root documents with a
//! stored identifier, child records linked to a parent by identifier plus a
//! nested path, and whitespace-tokenized term postings over root documents.
//! It exists so the core can run end-to-end without an external engine and is
//! the engine used throughout the test suite.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::document::{Document, FieldValue};
use crate::error::{QuarryError, Result};
use crate::index::reader::{ID_FIELD, IndexReader, Posting, PostingIterator};

/// One stored record: either a root document or a nested child record.
#[derive(Debug, Clone)]
enum StoredDoc {
    Root {
        id: String,
        document: Document,
    },
    Child {
        parent: String,
        path: String,
        document: Document,
    },
}

#[derive(Debug, Default)]
struct Inner {
    docs: Vec<StoredDoc>,
    /// field -> term -> postings (root documents only, doc-id ascending).
    postings: AHashMap<String, AHashMap<String, Vec<Posting>>>,
}

/// An in-memory inverted index.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    inner: RwLock<Inner>,
}

impl MemoryIndex {
    /// Create a new empty index.
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryIndex::default())
    }

    /// Create a writer for this index.
    pub fn writer(self: &Arc<Self>) -> MemoryIndexWriter {
        MemoryIndexWriter {
            index: Arc::clone(self),
        }
    }

    /// Open a reader over the current contents of this index.
    pub fn reader(self: &Arc<Self>) -> MemoryIndexReader {
        MemoryIndexReader {
            index: Arc::clone(self),
            closed: AtomicBool::new(false),
        }
    }
}

/// Writer appending documents to a [`MemoryIndex`].
#[derive(Debug)]
pub struct MemoryIndexWriter {
    index: Arc<MemoryIndex>,
}

impl MemoryIndexWriter {
    /// Add a root document. Text fields are tokenized on whitespace and
    /// lowercased; the stored identifier lands in the `_id` field.
    pub fn add_document<S: Into<String>>(&self, id: S, mut document: Document) -> u64 {
        let id = id.into();
        document.add_field(ID_FIELD, FieldValue::Text(id.clone()));

        let mut inner = self.index.inner.write();
        let doc_id = inner.docs.len() as u64;

        let mut term_freqs: AHashMap<(String, String), u32> = AHashMap::new();
        for (field, value) in document.fields() {
            if let FieldValue::Text(text) = value {
                for token in text.split_whitespace() {
                    *term_freqs
                        .entry((field.clone(), token.to_lowercase()))
                        .or_insert(0) += 1;
                }
            }
        }
        for ((field, term), term_freq) in term_freqs {
            inner
                .postings
                .entry(field)
                .or_default()
                .entry(term)
                .or_default()
                .push(Posting { doc_id, term_freq });
        }

        inner.docs.push(StoredDoc::Root { id, document });
        doc_id
    }

    /// Add a nested child record for an existing parent. Child records are
    /// not term-indexed; they are only reachable through the nested join.
    pub fn add_child<P: Into<String>, N: Into<String>>(
        &self,
        parent: P,
        path: N,
        document: Document,
    ) -> u64 {
        let mut inner = self.index.inner.write();
        let doc_id = inner.docs.len() as u64;
        inner.docs.push(StoredDoc::Child {
            parent: parent.into(),
            path: path.into(),
            document,
        });
        doc_id
    }
}

/// Reader over a [`MemoryIndex`].
#[derive(Debug)]
pub struct MemoryIndexReader {
    index: Arc<MemoryIndex>,
    closed: AtomicBool,
}

impl MemoryIndexReader {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(QuarryError::reader_closed("memory index reader"))
        } else {
            Ok(())
        }
    }
}

/// Posting iterator over an owned snapshot of a posting list.
struct VecPostingIterator {
    postings: Vec<Posting>,
    position: usize,
}

impl PostingIterator for VecPostingIterator {
    fn next(&mut self) -> Result<Option<Posting>> {
        let posting = self.postings.get(self.position).copied();
        self.position += 1;
        Ok(posting)
    }
}

impl IndexReader for MemoryIndexReader {
    fn doc_count(&self) -> Result<u64> {
        self.ensure_open()?;
        let inner = self.index.inner.read();
        Ok(inner
            .docs
            .iter()
            .filter(|doc| matches!(doc, StoredDoc::Root { .. }))
            .count() as u64)
    }

    fn max_doc(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.index.inner.read().docs.len() as u64)
    }

    fn document(&self, doc_id: u64) -> Result<Option<Document>> {
        self.ensure_open()?;
        let inner = self.index.inner.read();
        Ok(inner.docs.get(doc_id as usize).map(|doc| match doc {
            StoredDoc::Root { document, .. } => document.clone(),
            StoredDoc::Child { document, .. } => document.clone(),
        }))
    }

    fn stored_id(&self, doc_id: u64) -> Result<Option<String>> {
        self.ensure_open()?;
        let inner = self.index.inner.read();
        Ok(match inner.docs.get(doc_id as usize) {
            Some(StoredDoc::Root { id, .. }) => Some(id.clone()),
            _ => None,
        })
    }

    fn nested_path(&self, doc_id: u64) -> Result<Option<String>> {
        self.ensure_open()?;
        let inner = self.index.inner.read();
        Ok(match inner.docs.get(doc_id as usize) {
            Some(StoredDoc::Child { path, .. }) => Some(path.clone()),
            _ => None,
        })
    }

    fn parent_id(&self, doc_id: u64) -> Result<Option<String>> {
        self.ensure_open()?;
        let inner = self.index.inner.read();
        Ok(match inner.docs.get(doc_id as usize) {
            Some(StoredDoc::Child { parent, .. }) => Some(parent.clone()),
            _ => None,
        })
    }

    fn postings(&self, field: &str, term: &str) -> Result<Option<Box<dyn PostingIterator>>> {
        self.ensure_open()?;
        let inner = self.index.inner.read();
        Ok(inner
            .postings
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(|postings| {
                Box::new(VecPostingIterator {
                    postings: postings.clone(),
                    position: 0,
                }) as Box<dyn PostingIterator>
            }))
    }

    fn term_doc_freq(&self, field: &str, term: &str) -> Result<u64> {
        self.ensure_open()?;
        let inner = self.index.inner.read();
        Ok(inner
            .postings
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(|postings| postings.len() as u64)
            .unwrap_or(0))
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read_documents() {
        let index = MemoryIndex::new();
        let writer = index.writer();

        let doc_id = writer.add_document(
            "book-1",
            Document::builder().add_text("title", "Rust in Action").build(),
        );
        writer.add_child(
            "book-1",
            "chapters",
            Document::builder().add_text("chapters.name", "Ownership").build(),
        );

        let reader = index.reader();
        assert_eq!(reader.doc_count().unwrap(), 1);
        assert_eq!(reader.max_doc().unwrap(), 2);
        assert_eq!(reader.stored_id(doc_id).unwrap().as_deref(), Some("book-1"));
        assert_eq!(reader.nested_path(doc_id).unwrap(), None);
        assert_eq!(reader.nested_path(1).unwrap().as_deref(), Some("chapters"));
        assert_eq!(reader.parent_id(1).unwrap().as_deref(), Some("book-1"));

        let doc = reader.document(doc_id).unwrap().unwrap();
        assert_eq!(doc.get_field("_id").unwrap().as_text(), Some("book-1"));
    }

    #[test]
    fn test_postings_are_tokenized_and_lowercased() {
        let index = MemoryIndex::new();
        let writer = index.writer();
        writer.add_document(
            "a",
            Document::builder().add_text("title", "Hello World hello").build(),
        );

        let reader = index.reader();
        assert_eq!(reader.term_doc_freq("title", "hello").unwrap(), 1);
        assert_eq!(reader.term_doc_freq("title", "world").unwrap(), 1);
        assert_eq!(reader.term_doc_freq("title", "Hello").unwrap(), 0);

        let mut postings = reader.postings("title", "hello").unwrap().unwrap();
        let posting = postings.next().unwrap().unwrap();
        assert_eq!(posting.doc_id, 0);
        assert_eq!(posting.term_freq, 2);
        assert!(postings.next().unwrap().is_none());
    }

    #[test]
    fn test_closed_reader_rejects_reads() {
        let index = MemoryIndex::new();
        index.writer().add_document("a", Document::new());

        let reader = index.reader();
        reader.close().unwrap();
        assert!(reader.is_closed());
        // close is idempotent
        reader.close().unwrap();

        match reader.document(0) {
            Err(QuarryError::ReaderClosed(_)) => {}
            other => panic!("expected ReaderClosed, got {other:?}"),
        }
        // Size queries reject a closed reader like every other read.
        assert!(matches!(
            reader.doc_count(),
            Err(QuarryError::ReaderClosed(_))
        ));
        assert!(matches!(reader.max_doc(), Err(QuarryError::ReaderClosed(_))));
    }
}
