//! Documents submitted for indexing.
//!
//! A [`Document`] is an ordered list of named raw field values plus the
//! metadata an index keeps per document: score, optional payload and
//! language. Field values are reference counted, so the private copy an
//! indexing job takes with [`Document::detach`] shares the text with the
//! caller's original instead of copying it.
//!
//! # Examples
//!
//! ```
//! use xiphos::document::Document;
//!
//! let doc = Document::builder("doc:1")
//!     .add_text("title", "Rust Programming Guide")
//!     .add_text("price", "39.99")
//!     .score(0.5)
//!     .payload(b"hello".to_vec())
//!     .build();
//!
//! assert_eq!(doc.len(), 2);
//! assert_eq!(doc.get_field("TITLE").unwrap().text(), Some("Rust Programming Guide"));
//! assert_eq!(doc.doc_id, 0);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::DEFAULT_LANGUAGE;

/// Document identifier assigned by the index. `0` means unassigned.
pub type DocId = u64;

/// One named field of a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentField {
    /// Field name as submitted.
    pub name: String,

    /// Raw value. `None` marks a field without a text value, which is never
    /// bound to the schema.
    pub text: Option<Arc<str>>,
}

impl DocumentField {
    /// Create a field with a text value.
    pub fn new<N: Into<String>, T: AsRef<str>>(name: N, text: T) -> Self {
        DocumentField {
            name: name.into(),
            text: Some(Arc::from(text.as_ref())),
        }
    }

    /// Create a field without a value.
    pub fn empty<N: Into<String>>(name: N) -> Self {
        DocumentField {
            name: name.into(),
            text: None,
        }
    }

    /// Check whether the field carries a text value.
    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// The text value, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Byte length of the value; `0` when there is none.
    pub fn byte_len(&self) -> usize {
        self.text.as_ref().map_or(0, |t| t.len())
    }
}

/// A document represents a single item to be indexed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Key identifying the document in the document store.
    pub key: String,

    /// Fields in submission order.
    pub fields: Vec<DocumentField>,

    /// Assigned id, `0` until the document is committed.
    pub doc_id: DocId,

    /// Document score.
    pub score: f32,

    /// Optional opaque payload.
    pub payload: Option<Arc<[u8]>>,

    /// Language used to pick the tokenizer.
    pub language: String,
}

impl Document {
    /// Create a new empty document.
    pub fn new<K: Into<String>>(key: K) -> Self {
        Document {
            key: key.into(),
            fields: Vec::new(),
            doc_id: 0,
            score: 1.0,
            payload: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Create a builder for constructing documents.
    pub fn builder<K: Into<String>>(key: K) -> DocumentBuilder {
        DocumentBuilder::new(key)
    }

    /// Append a field.
    pub fn add_field(&mut self, field: DocumentField) {
        self.fields.push(field);
    }

    /// Find a field by name, ignoring ASCII case.
    pub fn get_field(&self, name: &str) -> Option<&DocumentField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Produce a private copy that no longer depends on the caller's value.
    ///
    /// Field texts and the payload are shared through their reference
    /// counts; the copy has no assigned id.
    pub fn detach(&self) -> Document {
        Document {
            doc_id: 0,
            ..self.clone()
        }
    }

    /// Drop all fields, keeping the allocation.
    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }

    /// Replace the contents of `self` with `other`, reusing the field
    /// allocation.
    pub(crate) fn assign_from(&mut self, other: &Document) {
        self.key.clear();
        self.key.push_str(&other.key);
        self.fields.clear();
        self.fields.extend(other.fields.iter().cloned());
        self.doc_id = 0;
        self.score = other.score;
        self.payload = other.payload.clone();
        self.language.clear();
        self.language.push_str(&other.language);
    }

    /// Reset to an empty, keyless document.
    pub(crate) fn reset(&mut self) {
        self.key.clear();
        self.fields.clear();
        self.doc_id = 0;
        self.score = 1.0;
        self.payload = None;
        self.language.clear();
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document Key: {}. ID={}", self.key, self.doc_id)?;
        for (i, field) in self.fields.iter().enumerate() {
            writeln!(
                f,
                "  [{i}]: {} => {}",
                field.name,
                field.text().unwrap_or("(null)")
            )?;
        }
        Ok(())
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new<K: Into<String>>(key: K) -> Self {
        DocumentBuilder {
            document: Document::new(key),
        }
    }

    /// Add a field with a text value.
    pub fn add_text<S: Into<String>, T: AsRef<str>>(mut self, name: S, value: T) -> Self {
        self.document.add_field(DocumentField::new(name, value));
        self
    }

    /// Add a prepared field.
    pub fn add_field(mut self, field: DocumentField) -> Self {
        self.document.add_field(field);
        self
    }

    /// Set the document score.
    pub fn score(mut self, score: f32) -> Self {
        self.document.score = score;
        self
    }

    /// Set the document payload.
    pub fn payload<P: Into<Vec<u8>>>(mut self, payload: P) -> Self {
        self.document.payload = Some(Arc::from(payload.into()));
        self
    }

    /// Set the document language.
    pub fn language<S: Into<String>>(mut self, language: S) -> Self {
        self.document.language = language.into();
        self
    }

    /// Build the final document.
    pub fn build(self) -> Document {
        self.document
    }
}
