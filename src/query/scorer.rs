//! Scoring implementations for ranking search results.

use std::fmt::Debug;

/// Trait for document scorers.
pub trait Scorer: Send + Debug {
    /// Calculate the score for a document.
    fn score(&self, doc_id: u64, term_freq: u32) -> f32;

    /// Get the name of this scorer.
    fn name(&self) -> &'static str;
}

/// A scorer returning a constant value for every document.
#[derive(Debug, Clone)]
pub struct ConstScorer {
    value: f32,
}

impl ConstScorer {
    /// Create a new constant scorer.
    pub fn new(value: f32) -> Self {
        ConstScorer { value }
    }
}

impl Scorer for ConstScorer {
    fn score(&self, _doc_id: u64, _term_freq: u32) -> f32 {
        self.value
    }

    fn name(&self) -> &'static str {
        "const"
    }
}

/// BM25 scorer over term statistics, without field-length normalization.
#[derive(Debug, Clone)]
pub struct Bm25Scorer {
    /// Number of documents containing the term.
    doc_freq: u64,
    /// Total number of documents in the index.
    total_docs: u64,
    /// BM25 k1 parameter.
    k1: f32,
}

impl Bm25Scorer {
    /// Create a new BM25 scorer.
    pub fn new(doc_freq: u64, total_docs: u64) -> Self {
        Bm25Scorer {
            doc_freq,
            total_docs,
            k1: 1.2,
        }
    }

    /// Calculate the IDF (Inverse Document Frequency) component.
    fn idf(&self) -> f32 {
        if self.doc_freq == 0 || self.total_docs == 0 {
            return 0.0;
        }

        let n = self.total_docs as f32;
        let df = self.doc_freq as f32;

        // IDF = log(1 + (N - df + 0.5) / (df + 0.5))
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl Scorer for Bm25Scorer {
    fn score(&self, _doc_id: u64, term_freq: u32) -> f32 {
        if term_freq == 0 {
            return 0.0;
        }

        let tf = term_freq as f32;
        let saturation = (tf * (self.k1 + 1.0)) / (tf + self.k1);
        self.idf() * saturation
    }

    fn name(&self) -> &'static str {
        "bm25"
    }
}
