//! Nested-document resolution and result stitching through the public search
//! path.

use std::sync::Arc;

use quarry::document::{Document, GeoPoint};
use quarry::error::Result;
use quarry::index::MemoryIndex;
use quarry::query::TermQuery;
use quarry::search::{SearchRequest, Searcher, StitchedRecordExtractor};

fn library() -> Arc<MemoryIndex> {
    let index = MemoryIndex::new();
    let writer = index.writer();

    writer.add_document(
        "book-a",
        Document::builder().add_text("body", "rust guide").build(),
    );
    writer.add_child(
        "book-a",
        "chapters",
        Document::builder().add_text("chapters.name", "Ownership").build(),
    );
    writer.add_child(
        "book-a",
        "chapters",
        Document::builder().add_text("chapters.name", "Lifetimes").build(),
    );
    writer.add_child(
        "book-a",
        "reviews",
        Document::builder().add_text("reviews.author", "alice").build(),
    );

    // Non-matching parent with its own children: its children must never
    // leak into another parent's hits.
    writer.add_document(
        "book-b",
        Document::builder().add_text("body", "cooking guide").build(),
    );
    writer.add_child(
        "book-b",
        "chapters",
        Document::builder().add_text("chapters.name", "Knives").build(),
    );

    // Matching parent without children.
    writer.add_document(
        "book-c",
        Document::builder().add_text("body", "rust patterns").build(),
    );

    index
}

fn chapter_names(children: &[quarry::search::NestedRecord]) -> Vec<&str> {
    children
        .iter()
        .filter_map(|child| child.document.get_field("chapters.name")?.as_text())
        .collect()
}

#[test]
fn test_children_are_stitched_under_their_parent() -> Result<()> {
    let searcher = Searcher::new(Arc::new(library().reader()));
    let request = SearchRequest::for_records(
        Box::new(TermQuery::new("body", "rust")),
        StitchedRecordExtractor::new().with_nested_path("chapters"),
    );

    let result = searcher.search(&request, 0, Some(10))?.load_blocking()?;
    assert_eq!(result.hits.len(), 2);

    let book_a = &result.hits[0];
    assert_eq!(
        book_a.document.get_field("_id").unwrap().as_text(),
        Some("book-a")
    );
    assert_eq!(chapter_names(&book_a.children), vec!["Ownership", "Lifetimes"]);

    // A matching parent with no children under the path stitches nothing.
    let book_c = &result.hits[1];
    assert_eq!(
        book_c.document.get_field("_id").unwrap().as_text(),
        Some("book-c")
    );
    assert!(book_c.children.is_empty());
    Ok(())
}

#[test]
fn test_multiple_paths_resolve_without_leaking_other_parents() -> Result<()> {
    let searcher = Searcher::new(Arc::new(library().reader()));
    let request = SearchRequest::for_records(
        Box::new(TermQuery::new("body", "rust")),
        StitchedRecordExtractor::new()
            .with_nested_path("chapters")
            .with_nested_path("reviews"),
    );

    let result = searcher.search(&request, 0, Some(10))?.load_blocking()?;
    let book_a = &result.hits[0];

    // Both requested paths contribute children, in document order.
    assert_eq!(book_a.children.len(), 3);
    assert!(book_a.children.iter().any(|child| {
        child
            .document
            .get_field("reviews.author")
            .and_then(|v| v.as_text())
            == Some("alice")
    }));

    // The decoy parent's chapter never appears anywhere.
    for hit in &result.hits {
        assert!(!chapter_names(&hit.children).contains(&"Knives"));
    }
    Ok(())
}

#[test]
fn test_projection_without_paths_stitches_no_children() -> Result<()> {
    let searcher = Searcher::new(Arc::new(library().reader()));
    let request = SearchRequest::for_records(
        Box::new(TermQuery::new("body", "rust")),
        StitchedRecordExtractor::new(),
    );

    let result = searcher.search(&request, 0, Some(10))?.load_blocking()?;
    assert!(result.hits.iter().all(|hit| hit.children.is_empty()));
    Ok(())
}

#[test]
fn test_child_records_carry_distance_when_requested() -> Result<()> {
    let index = MemoryIndex::new();
    let writer = index.writer();
    writer.add_document(
        "chain",
        Document::builder()
            .add_text("body", "bookshop chain")
            .add_geo("location", 48.8566, 2.3522)
            .build(),
    );
    writer.add_child(
        "chain",
        "stores",
        Document::builder().add_geo("location", 51.5074, -0.1278).build(),
    );
    writer.add_child("chain", "stores", Document::new());

    let searcher = Searcher::new(Arc::new(index.reader()));
    let origin = GeoPoint::new(48.8566, 2.3522);
    let request = SearchRequest::for_records(
        Box::new(TermQuery::new("body", "bookshop")),
        StitchedRecordExtractor::new()
            .with_nested_path("stores")
            .with_distance("location", origin),
    );

    let result = searcher.search(&request, 0, Some(10))?.load_blocking()?;
    let hit = &result.hits[0];
    assert!(hit.distance.unwrap() < 1.0);

    assert_eq!(hit.children.len(), 2);
    let store = &hit.children[0];
    let d = store.distance.unwrap();
    assert!(d > 330_000.0 && d < 360_000.0);
    // Child without a geo field gets no distance.
    assert!(hit.children[1].distance.is_none());
    Ok(())
}
