//! Schema module for Xiphos.
//!
//! This module resolves the named fields of a document to their schema
//! entries: type, flags and per-type options.

pub mod field;
#[allow(clippy::module_inception)]
pub mod schema;

// Re-export commonly used types
pub use field::{FieldOptions, FieldSpec, FieldType, TagOptions, TextOptions};
pub use schema::{MAX_FIELDS, Schema, SchemaBuilder, SchemaFlags};
