//! # Quarry
//!
//! A query execution and result retrieval core for full-text search,
//! designed to sit over pluggable inverted-index engines.
//!
//! ## Features
//!
//! - Composable collector pipeline (hit counting, top-N ranking,
//!   auxiliary per-hit values) in a single index pass
//! - Hard and soft query timeouts with cooperative check points
//! - Parent/nested-child document stitching for result assembly
//! - Cursor-based (scroll) pagination with a geometrically growing
//!   fetch window
//! - Deferred, blocking-friendly projection loading

pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod search;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
