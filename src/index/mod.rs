//! Index engine seam: reader abstraction and the in-memory engine.

pub mod memory;
pub mod reader;

pub use self::memory::{MemoryIndex, MemoryIndexReader, MemoryIndexWriter};
pub use self::reader::{IndexReader, Posting, PostingIterator};
