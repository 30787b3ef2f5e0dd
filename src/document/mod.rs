//! Document structure and field values for stored-field retrieval.
//!
//! The execution core does not define an indexing schema; it only needs a
//! schema-less view of the stored fields it loads for matched hits. Documents
//! are collections of named [`FieldValue`]s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A geographic point (latitude/longitude, degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new geo point.
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    /// Great-circle distance to another point, in meters (haversine).
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

/// Represents a value for a field in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text value.
    Text(String),
    /// 64-bit signed integer value.
    Integer(i64),
    /// 64-bit floating-point value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// Geographic coordinates.
    Geo(GeoPoint),
    /// UTC timestamp.
    DateTime(chrono::DateTime<chrono::Utc>),
    /// Explicit null value.
    Null,
}

impl FieldValue {
    /// Get the value as text, if it is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a float, converting from integer if necessary.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the value as a boolean, if it is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a geo point, if it is a geo value.
    pub fn as_geo(&self) -> Option<&GeoPoint> {
        match self {
            FieldValue::Geo(p) => Some(p),
            _ => None,
        }
    }
}

/// A schema-less document: the stored fields of one index record.
///
/// Fields are kept in a sorted map so that renderings of a document are
/// deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// The field values for this document.
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Document {
            fields: BTreeMap::new(),
        }
    }

    /// Create a document builder.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// Add a field value to the document.
    pub fn add_field<S: Into<String>>(&mut self, name: S, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Get a field value from the document.
    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Get all field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|s| s.as_str())
    }

    /// Get all field values.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Number of fields in this document.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for documents.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    /// Add a text field.
    pub fn add_text<S: Into<String>, V: Into<String>>(mut self, name: S, value: V) -> Self {
        self.document
            .add_field(name, FieldValue::Text(value.into()));
        self
    }

    /// Add an integer field.
    pub fn add_integer<S: Into<String>>(mut self, name: S, value: i64) -> Self {
        self.document.add_field(name, FieldValue::Integer(value));
        self
    }

    /// Add a float field.
    pub fn add_float<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.document.add_field(name, FieldValue::Float(value));
        self
    }

    /// Add a geo field.
    pub fn add_geo<S: Into<String>>(mut self, name: S, lat: f64, lon: f64) -> Self {
        self.document
            .add_field(name, FieldValue::Geo(GeoPoint::new(lat, lon)));
        self
    }

    /// Build the document.
    pub fn build(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::builder()
            .add_text("title", "hello")
            .add_integer("year", 2020)
            .add_geo("location", 48.85, 2.35)
            .build();

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get_field("title").unwrap().as_text(), Some("hello"));
        assert_eq!(doc.get_field("year").unwrap().as_integer(), Some(2020));
        assert!(doc.get_field("location").unwrap().as_geo().is_some());
        assert!(!doc.has_field("missing"));
    }

    #[test]
    fn test_haversine_distance() {
        let paris = GeoPoint::new(48.8566, 2.3522);
        let london = GeoPoint::new(51.5074, -0.1278);

        let distance = paris.distance_to(&london);

        // Roughly 344 km.
        assert!(distance > 330_000.0 && distance < 360_000.0);

        // Distance to self is zero.
        assert!(paris.distance_to(&paris) < 1e-6);
    }
}
