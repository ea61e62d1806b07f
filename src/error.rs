//! Error types for the Xiphos indexing pipeline.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`XiphosError`] enum. The variants fall in two groups: the indexing
//! failures a document job can end with (duplicate fields, malformed values,
//! missing update targets, rejected bulk commits) and the ambient failures of
//! configuration, I/O and serialization.
//!
//! # Examples
//!
//! ```
//! use xiphos::error::{ErrorKind, XiphosError, Result};
//!
//! fn parse_score(text: &str) -> Result<f64> {
//!     text.parse::<f64>()
//!         .map_err(|_| XiphosError::parse(format!("Could not parse `{text}`")))
//! }
//!
//! let err = parse_score("abc").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ParseError);
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Xiphos operations.
#[derive(Error, Debug)]
pub enum XiphosError {
    /// The same schema field was submitted twice in one document.
    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    /// A numeric value could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A geo value was not a `lon,lat` (or `lon lat`) pair.
    #[error("Geo format error: {0}")]
    GeoFormat(String),

    /// The target document of an update does not exist.
    #[error("No such document: {0}")]
    NoDocument(String),

    /// Unclassified failure, e.g. from a bulk commit.
    #[error("Indexing error: {0}")]
    Generic(String),

    /// The field type has no sortable representation.
    #[error("Unsupported sortable type: {0}")]
    UnsupportedSortableType(String),

    /// Schema-related errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal invariant violations
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Coarse classification of an [`XiphosError`].
///
/// Completion outcomes carry the full error; the kind is what callers
/// usually branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateField,
    ParseError,
    GeoFormatError,
    NoDocument,
    Generic,
    UnsupportedSortableType,
    Other,
}

/// Result type alias for operations that may fail with XiphosError.
pub type Result<T> = std::result::Result<T, XiphosError>;

impl XiphosError {
    /// Create a new duplicate field error.
    pub fn duplicate_field<S: Into<String>>(msg: S) -> Self {
        XiphosError::DuplicateField(msg.into())
    }

    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        XiphosError::Parse(msg.into())
    }

    /// Create a new geo format error.
    pub fn geo_format<S: Into<String>>(msg: S) -> Self {
        XiphosError::GeoFormat(msg.into())
    }

    /// Create a new missing document error.
    pub fn no_document<S: Into<String>>(msg: S) -> Self {
        XiphosError::NoDocument(msg.into())
    }

    /// Create a new generic indexing error.
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        XiphosError::Generic(msg.into())
    }

    /// Create a new unsupported sortable type error.
    pub fn unsupported_sortable<S: Into<String>>(msg: S) -> Self {
        XiphosError::UnsupportedSortableType(msg.into())
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        XiphosError::Schema(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        XiphosError::Config(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        XiphosError::Internal(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        XiphosError::Other(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            XiphosError::DuplicateField(_) => ErrorKind::DuplicateField,
            XiphosError::Parse(_) => ErrorKind::ParseError,
            XiphosError::GeoFormat(_) => ErrorKind::GeoFormatError,
            XiphosError::NoDocument(_) => ErrorKind::NoDocument,
            XiphosError::Generic(_) => ErrorKind::Generic,
            XiphosError::UnsupportedSortableType(_) => ErrorKind::UnsupportedSortableType,
            _ => ErrorKind::Other,
        }
    }
}
