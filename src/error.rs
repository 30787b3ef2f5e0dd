//! Error types for the Quarry library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`QuarryError`] enum. Query execution failures embed a rendering of the
//! offending query so that callers can diagnose which round failed.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// The main error type for Quarry operations.
#[derive(Error, Debug)]
pub enum QuarryError {
    /// I/O errors (stored-field loading, index access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A hard query timeout expired mid-scan.
    #[error("query '{query}' exceeded the timeout of {duration:?}")]
    Timeout {
        /// The configured timeout budget.
        duration: Duration,
        /// A rendering of the offending query.
        query: String,
    },

    /// An exact hit count was requested but only a lower bound is available.
    #[error("hit count is a lower bound ({lower_bound}); the scan was truncated")]
    TruncatedCount {
        /// The lower bound that is always available.
        lower_bound: u64,
    },

    /// A failure during query execution, stored-field loading or nested-document
    /// fetching, wrapping the underlying cause.
    #[error("error executing query '{query}': {source}")]
    Execution {
        /// A rendering of the query being executed.
        query: String,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors (invalid plans, unsupported shapes, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Field-related errors
    #[error("Field error: {0}")]
    Field(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The index reader backing an operation has already been released.
    #[error("Index reader closed: {0}")]
    ReaderClosed(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with QuarryError.
pub type Result<T> = std::result::Result<T, QuarryError>;

impl QuarryError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        QuarryError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        QuarryError::Query(msg.into())
    }

    /// Create a new field error.
    pub fn field<S: Into<String>>(msg: S) -> Self {
        QuarryError::Field(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        QuarryError::InvalidOperation(msg.into())
    }

    /// Create a new reader-closed error.
    pub fn reader_closed<S: Into<String>>(msg: S) -> Self {
        QuarryError::ReaderClosed(msg.into())
    }

    /// Create a new hard-timeout error.
    pub fn timeout<S: Into<String>>(duration: Duration, query: S) -> Self {
        QuarryError::Timeout {
            duration,
            query: query.into(),
        }
    }

    /// Create a new execution error wrapping an underlying cause.
    pub fn execution<S, E>(query: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<anyhow::Error>,
    {
        QuarryError::Execution {
            query: query.into(),
            source: source.into(),
        }
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        QuarryError::Other(msg.into())
    }
}
