//! # Xiphos
//!
//! The document indexing pipeline of a full-text and structured search
//! engine.
//!
//! ## Features
//!
//! - Schema-driven binding of named document fields
//! - Full-text tokenization into a per-document forward index
//! - Numeric, tag and geo bulk indexing with per-batch handle caching
//! - Sortable values and optional per-token byte offsets
//! - Partial updates, either merged reindexing or metadata-only
//! - Inline or worker-thread execution with exactly-once completion
//!
//! ## Pipeline
//!
//! A document is bound to a pooled [`context::IndexingContext`], submitted to
//! the [`service::IndexingService`], preprocessed field by field through
//! [`dispatch`], and committed by an [`indexer::IndexBatch`].

pub mod analysis;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod partial;
pub mod pool;
pub mod schema;
pub mod service;
pub mod store;
pub mod util;

pub mod prelude {
    pub use crate::config::IndexerConfig;
    pub use crate::context::{AddOptions, IndexingOutcome};
    pub use crate::document::{DocId, Document, DocumentField};
    pub use crate::error::{ErrorKind, Result, XiphosError};
    pub use crate::schema::{FieldSpec, FieldType, Schema};
    pub use crate::service::{Completion, Dispatch, IndexingService};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
