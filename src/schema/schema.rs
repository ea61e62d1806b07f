//! Schema management for document structure definition.

use std::sync::Arc;

use ahash::AHashMap;
use bitflags::bitflags;

use crate::analysis::stopwords::StopWords;
use crate::error::{Result, XiphosError};
use crate::schema::field::{FieldSpec, FieldType};

/// Maximum number of fields in one schema.
pub const MAX_FIELDS: usize = 1024;

/// Maximum number of full-text fields; term field masks are 64 bits wide.
pub const MAX_TEXT_FIELDS: usize = 64;

bitflags! {
    /// Schema-wide flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SchemaFlags: u32 {
        /// Record per-token byte offsets of full-text fields.
        const STORE_BYTE_OFFSETS = 1 << 0;
        /// The index is temporary; its jobs always run inline.
        const TEMPORARY = 1 << 1;
    }
}

/// A schema defines the fields documents of an index may carry.
///
/// Lookups by name ignore ASCII case. The schema is read-only once built and
/// is shared between jobs behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Index name, used to derive keys of per-field structures.
    name: String,
    /// Field specs ordered by their index.
    fields: Vec<FieldSpec>,
    /// Lower-cased field name to field index.
    by_name: AHashMap<String, usize>,
    /// Schema flags.
    flags: SchemaFlags,
    /// Number of sortable fields.
    sortable_count: usize,
    /// Stop words used by every tokenizer of this index.
    stopwords: Arc<StopWords>,
}

impl Schema {
    /// Create a builder for constructing schemas.
    pub fn builder<S: Into<String>>(name: S) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a document field name to its schema entry.
    pub fn resolve_field(&self, name: &str) -> Option<&FieldSpec> {
        if let Some(&idx) = self.by_name.get(name) {
            return self.fields.get(idx);
        }
        self.by_name
            .get(&name.to_ascii_lowercase())
            .and_then(|&idx| self.fields.get(idx))
    }

    /// Get a field by its schema index.
    pub fn field(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.get(index)
    }

    /// All fields in schema order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Schema flags.
    pub fn flags(&self) -> SchemaFlags {
        self.flags
    }

    /// Number of slots in a sorting vector of this schema.
    pub fn sortable_count(&self) -> usize {
        self.sortable_count
    }

    /// Sort slot of a field, looked up by name.
    pub fn sorting_index(&self, name: &str) -> Option<usize> {
        self.resolve_field(name).and_then(|fs| fs.sort_idx)
    }

    /// Stop words of this index.
    pub fn stopwords(&self) -> &Arc<StopWords> {
        &self.stopwords
    }

    /// Key under which the persistent structure of `field` is opened.
    pub fn field_key(&self, field: &FieldSpec) -> String {
        let prefix = match field.field_type {
            FieldType::FullText => "ft",
            FieldType::Numeric => "nm",
            FieldType::Tag => "tag",
            FieldType::Geo => "geo",
        };
        format!("{prefix}:{}/{}", self.name, field.name)
    }
}

/// A builder for constructing schemas in a fluent manner.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    flags: SchemaFlags,
    stopwords: Arc<StopWords>,
}

impl SchemaBuilder {
    /// Create a new schema builder.
    pub fn new<S: Into<String>>(name: S) -> Self {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            flags: SchemaFlags::empty(),
            stopwords: Arc::new(StopWords::english()),
        }
    }

    /// Add a field to the schema being built.
    pub fn add_field(mut self, field: FieldSpec) -> Result<Self> {
        if field.name.is_empty() {
            return Err(XiphosError::schema("Field name cannot be empty"));
        }
        if self
            .fields
            .iter()
            .any(|f| f.name.eq_ignore_ascii_case(&field.name))
        {
            return Err(XiphosError::schema(format!(
                "Field '{}' already exists",
                field.name
            )));
        }
        if self.fields.len() >= MAX_FIELDS {
            return Err(XiphosError::schema(format!(
                "Schema cannot have more than {MAX_FIELDS} fields"
            )));
        }
        self.fields.push(field);
        Ok(self)
    }

    /// Record byte offsets of full-text tokens.
    pub fn store_byte_offsets(mut self) -> Self {
        self.flags |= SchemaFlags::STORE_BYTE_OFFSETS;
        self
    }

    /// Mark the index temporary.
    pub fn temporary(mut self) -> Self {
        self.flags |= SchemaFlags::TEMPORARY;
        self
    }

    /// Replace the stop-word list.
    pub fn stopwords(mut self, stopwords: StopWords) -> Self {
        self.stopwords = Arc::new(stopwords);
        self
    }

    /// Build the schema, assigning field indices, text ids and sort slots.
    pub fn build(self) -> Result<Schema> {
        let mut fields = self.fields;
        let mut by_name = AHashMap::with_capacity(fields.len());
        let mut text_fields = 0usize;
        let mut sortable_count = 0usize;

        for (index, field) in fields.iter_mut().enumerate() {
            field.index = index;
            if field.field_type == FieldType::FullText {
                if text_fields >= MAX_TEXT_FIELDS {
                    return Err(XiphosError::schema(format!(
                        "Schema cannot have more than {MAX_TEXT_FIELDS} text fields"
                    )));
                }
                field.text_opts.id = text_fields as u16;
                text_fields += 1;
            }
            field.sort_idx = if field.is_sortable() {
                sortable_count += 1;
                Some(sortable_count - 1)
            } else {
                None
            };
            by_name.insert(field.name.to_ascii_lowercase(), index);
        }

        Ok(Schema {
            name: self.name,
            fields,
            by_name,
            flags: self.flags,
            sortable_count,
            stopwords: self.stopwords,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::builder("idx")
            .add_field(FieldSpec::text("title").sortable())
            .unwrap()
            .add_field(FieldSpec::numeric("price").sortable())
            .unwrap()
            .add_field(FieldSpec::text("body"))
            .unwrap()
            .add_field(FieldSpec::geo("location"))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_assigns_indices_and_slots() {
        let schema = schema();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.sortable_count(), 2);

        let body = schema.resolve_field("body").unwrap();
        assert_eq!(body.index, 2);
        assert_eq!(body.text_opts.id, 1);
        assert_eq!(body.sort_idx, None);
        assert_eq!(schema.sorting_index("price"), Some(1));
    }

    #[test]
    fn test_resolution_ignores_case() {
        let schema = schema();
        assert_eq!(schema.resolve_field("TITLE").unwrap().name, "title");
        assert!(schema.resolve_field("missing").is_none());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = Schema::builder("idx")
            .add_field(FieldSpec::text("title"))
            .unwrap()
            .add_field(FieldSpec::tag("Title"))
            .unwrap_err();
        assert!(matches!(err, XiphosError::Schema(_)));
    }

    #[test]
    fn test_field_keys() {
        let schema = schema();
        let price = schema.resolve_field("price").unwrap();
        assert_eq!(schema.field_key(price), "nm:idx/price");
        let location = schema.resolve_field("location").unwrap();
        assert_eq!(schema.field_key(location), "geo:idx/location");
    }
}
