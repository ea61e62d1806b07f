//! The per-document indexing job.
//!
//! An [`IndexingContext`] holds everything one document needs on its way
//! through the pipeline: a private copy of the document, the schema binding
//! of every field, typed intermediate data, the forward index accumulator,
//! optional sorting vector and byte offsets, the tokenizer, the status slot
//! and the completion callback. Contexts are handed out by a
//! [`ContextPool`](crate::pool::ContextPool) and reset between documents.

use std::fmt;
use std::sync::Arc;

use bit_vec::BitVec;
use bitflags::bitflags;

use crate::analysis::tokenizer::{Tokenizer, TokenizerFactory};
use crate::document::{DocId, Document};
use crate::error::{ErrorKind, Result, XiphosError};
use crate::index::forward::ForwardIndex;
use crate::index::offsets::ByteOffsets;
use crate::index::sorting::SortingVector;
use crate::pool::SlotId;
use crate::schema::{FieldSpec, FieldType, Schema, SchemaFlags};

bitflags! {
    /// State collected while binding a document to its schema.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContextFlags: u32 {
        /// At least one bound field is sortable.
        const SORTABLES = 1 << 0;
        /// At least one bound field is indexable.
        const INDEXABLES = 1 << 1;
        /// No indexable full-text field is bound.
        const TEXT_INDEXED = 1 << 2;
        /// No indexable non-text field is bound.
        const OTHER_INDEXED = 1 << 3;
        /// The job must run on the submitting thread.
        const NO_BLOCK = 1 << 4;
    }
}

bitflags! {
    /// Options of an add request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AddOptions: u32 {
        /// Replace an existing document with the same key.
        const REPLACE = 1 << 0;
        /// Update only the given fields of an existing document.
        const PARTIAL = 1 << 1;
        /// Do not persist raw field values.
        const NOSAVE = 1 << 2;
        /// Never offload the job to a worker thread.
        const NO_BLOCK = 1 << 3;
    }
}

/// Typed intermediate data produced by preprocessing one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldData {
    /// Nothing to commit.
    #[default]
    None,
    /// Parsed numeric value.
    Numeric(f64),
    /// Longitude and latitude, still unparsed.
    Geo { lon: String, lat: String },
    /// Normalized tags.
    Tags(Vec<String>),
}

impl FieldData {
    pub fn is_none(&self) -> bool {
        matches!(self, FieldData::None)
    }
}

/// Final result of one job, handed to its completion callback.
#[derive(Debug)]
pub struct IndexingOutcome {
    /// Key of the document.
    pub key: String,
    /// Assigned (or, for metadata-only updates, existing) id on success.
    pub result: Result<DocId>,
}

impl IndexingOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Kind of the error, if the job failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(XiphosError::kind)
    }

    /// Id of the indexed document.
    pub fn doc_id(&self) -> Option<DocId> {
        self.result.as_ref().ok().copied()
    }
}

/// Callback invoked exactly once when a job finishes.
pub type CompletionCallback = Box<dyn FnOnce(IndexingOutcome) + Send + 'static>;

/// One document's indexing job.
pub struct IndexingContext {
    pub(crate) slot: SlotId,
    pub(crate) doc: Document,
    pub(crate) schema: Option<Arc<Schema>>,
    /// Schema index bound to each document field; `None` means skip.
    pub(crate) bindings: Vec<Option<usize>>,
    pub(crate) field_data: Vec<FieldData>,
    dedupe: BitVec,
    pub(crate) fwd: ForwardIndex,
    pub(crate) sorting: Option<SortingVector>,
    pub(crate) byte_offsets: Option<ByteOffsets>,
    pub(crate) tokenizer: Option<Arc<dyn Tokenizer>>,
    pub(crate) flags: ContextFlags,
    pub(crate) options: AddOptions,
    pub(crate) status: Option<XiphosError>,
    pub(crate) total_tokens: u32,
    pub(crate) callback: Option<CompletionCallback>,
}

impl fmt::Debug for IndexingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexingContext")
            .field("slot", &self.slot)
            .field("key", &self.doc.key)
            .field("fields", &self.doc.len())
            .field("flags", &self.flags)
            .field("options", &self.options)
            .field("status", &self.status)
            .field("total_tokens", &self.total_tokens)
            .finish()
    }
}

impl IndexingContext {
    pub(crate) fn new(slot: SlotId) -> Self {
        IndexingContext {
            slot,
            doc: Document::new(""),
            schema: None,
            bindings: Vec::new(),
            field_data: Vec::new(),
            dedupe: BitVec::new(),
            fwd: ForwardIndex::new(),
            sorting: None,
            byte_offsets: None,
            tokenizer: None,
            flags: ContextFlags::empty(),
            options: AddOptions::empty(),
            status: None,
            total_tokens: 0,
            callback: None,
        }
    }

    /// Bind `doc` to `schema` and prepare the job.
    ///
    /// Takes a private copy of the document, resolves every field, creates
    /// the sorting vector and byte offsets when needed, resets the forward
    /// index and picks the tokenizer for the document's language.
    pub fn prepare(
        &mut self,
        schema: &Arc<Schema>,
        doc: &Document,
        options: AddOptions,
    ) -> Result<()> {
        self.doc.assign_from(doc);
        self.options = options;
        self.status = None;
        self.total_tokens = 0;
        self.flags = ContextFlags::empty();
        if options.contains(AddOptions::NO_BLOCK)
            || schema.flags().contains(SchemaFlags::TEMPORARY)
        {
            self.flags |= ContextFlags::NO_BLOCK;
        }
        self.schema = Some(schema.clone());

        let old_field_count = self.bindings.len();
        self.set_document(schema, old_field_count)?;

        self.fwd.reset();
        self.tokenizer = Some(TokenizerFactory::get(
            &self.doc.language,
            schema.stopwords().clone(),
        ));
        Ok(())
    }

    /// Bind the fields of the held document to `schema`.
    ///
    /// Field arrays grow when the document has more than `old_field_count`
    /// fields and are reused otherwise.
    pub(crate) fn set_document(&mut self, schema: &Schema, old_field_count: usize) -> Result<()> {
        let num_fields = self.doc.len();
        if self.bindings.len() < num_fields {
            log::trace!("Growing field arrays from {old_field_count} to {num_fields}");
            self.bindings.resize(num_fields, None);
            self.field_data.resize_with(num_fields, FieldData::default);
        }
        for slot in 0..num_fields {
            self.bindings[slot] = None;
            self.field_data[slot] = FieldData::None;
        }

        self.dedupe.truncate(0);
        self.dedupe.grow(schema.len(), false);

        let mut num_indexable = 0usize;
        let mut has_text = false;
        let mut has_other = false;

        for (i, field) in self.doc.fields.iter().enumerate() {
            let fs = match schema.resolve_field(&field.name) {
                Some(fs) if field.is_text() => fs,
                _ => {
                    log::debug!("Skipping field {} not in index {}", field.name, schema.name());
                    continue;
                }
            };

            if self.dedupe.get(fs.index).unwrap_or(false) {
                return Err(XiphosError::duplicate_field(format!(
                    "Tried to insert `{}` twice",
                    fs.name
                )));
            }
            self.dedupe.set(fs.index, true);
            self.bindings[i] = Some(fs.index);

            if fs.is_sortable() {
                self.flags |= ContextFlags::SORTABLES;
            }
            if fs.is_indexable() {
                if fs.field_type == FieldType::FullText {
                    num_indexable += 1;
                    has_text = true;
                } else {
                    has_other = true;
                }
            }
        }

        if has_text || has_other {
            self.flags |= ContextFlags::INDEXABLES;
        }
        if !has_text {
            self.flags |= ContextFlags::TEXT_INDEXED;
        }
        if !has_other {
            self.flags |= ContextFlags::OTHER_INDEXED;
        }

        if self.flags.contains(ContextFlags::SORTABLES) && self.sorting.is_none() {
            self.sorting = Some(SortingVector::new(schema.sortable_count()));
        }

        if !self.options.contains(AddOptions::NOSAVE)
            && num_indexable > 0
            && schema.flags().contains(SchemaFlags::STORE_BYTE_OFFSETS)
        {
            self.byte_offsets
                .get_or_insert_with(ByteOffsets::new)
                .reserve_fields(num_indexable);
        }
        Ok(())
    }

    /// Key of the held document.
    pub fn key(&self) -> &str {
        &self.doc.key
    }

    /// The private copy of the document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    pub fn options(&self) -> AddOptions {
        self.options
    }

    /// Schema field bound to document field `i`.
    pub fn binding(&self, i: usize) -> Option<&FieldSpec> {
        let idx = (*self.bindings.get(i)?)?;
        self.schema.as_ref()?.field(idx)
    }

    /// Typed data of document field `i`.
    pub fn field_data(&self, i: usize) -> Option<&FieldData> {
        if i < self.doc.len() {
            self.field_data.get(i)
        } else {
            None
        }
    }

    pub fn forward_index(&self) -> &ForwardIndex {
        &self.fwd
    }

    pub fn sorting_vector(&self) -> Option<&SortingVector> {
        self.sorting.as_ref()
    }

    pub fn byte_offsets(&self) -> Option<&ByteOffsets> {
        self.byte_offsets.as_ref()
    }

    /// Error recorded for this job.
    pub fn status(&self) -> Option<&XiphosError> {
        self.status.as_ref()
    }

    pub(crate) fn set_status(&mut self, err: XiphosError) {
        self.status = Some(err);
    }

    /// Byte length of all bound full-text and tag values.
    pub fn text_bytes(&self) -> usize {
        self.doc
            .fields
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                matches!(
                    self.binding(*i).map(|fs| fs.field_type),
                    Some(FieldType::FullText) | Some(FieldType::Tag)
                )
            })
            .map(|(_, f)| f.byte_len())
            .sum()
    }

    /// Take the outcome of the job, leaving the status slot empty.
    pub(crate) fn take_outcome(&mut self) -> IndexingOutcome {
        let result = match self.status.take() {
            Some(err) => Err(err),
            None => Ok(self.doc.doc_id),
        };
        IndexingOutcome {
            key: self.doc.key.clone(),
            result,
        }
    }

    /// Free every sub-resource owned by the job.
    ///
    /// The forward index is reset rather than dropped.
    pub(crate) fn free_resources(&mut self) {
        self.sorting = None;
        self.byte_offsets = None;
        self.tokenizer = None;
        self.callback = None;
        self.status = None;
        self.schema = None;
        for data in self.field_data.iter_mut() {
            *data = FieldData::None;
        }
        self.doc.reset();
        self.fwd.reset();
    }

    /// Names of sub-resources still held.
    pub(crate) fn leaked_resources(&self) -> Vec<&'static str> {
        let mut leaked = Vec::new();
        if self.sorting.is_some() {
            leaked.push("sorting vector");
        }
        if self.byte_offsets.is_some() {
            leaked.push("byte offsets");
        }
        if self.tokenizer.is_some() {
            leaked.push("tokenizer");
        }
        if self.callback.is_some() {
            leaked.push("completion callback");
        }
        leaked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentField;

    fn schema(store_offsets: bool) -> Arc<Schema> {
        let mut builder = Schema::builder("idx")
            .add_field(FieldSpec::text("title").sortable())
            .unwrap()
            .add_field(FieldSpec::text("body"))
            .unwrap()
            .add_field(FieldSpec::numeric("price"))
            .unwrap();
        if store_offsets {
            builder = builder.store_byte_offsets();
        }
        Arc::new(builder.build().unwrap())
    }

    fn context() -> IndexingContext {
        IndexingContext::new(SlotId::new(0, 0, 0))
    }

    #[test]
    fn test_binds_known_fields() {
        let doc = Document::builder("doc:1")
            .add_text("title", "Hello")
            .add_text("unknown", "x")
            .add_field(DocumentField::empty("body"))
            .add_text("PRICE", "10")
            .build();

        let mut ctx = context();
        ctx.prepare(&schema(false), &doc, AddOptions::empty()).unwrap();

        assert_eq!(ctx.binding(0).unwrap().name, "title");
        assert!(ctx.binding(1).is_none());
        assert!(ctx.binding(2).is_none());
        assert_eq!(ctx.binding(3).unwrap().name, "price");

        let flags = ctx.flags();
        assert!(flags.contains(ContextFlags::SORTABLES | ContextFlags::INDEXABLES));
        assert!(!flags.contains(ContextFlags::TEXT_INDEXED));
        assert!(!flags.contains(ContextFlags::OTHER_INDEXED));
        assert_eq!(ctx.sorting_vector().unwrap().len(), 1);
        assert!(ctx.byte_offsets().is_none());
        assert!(ctx.tokenizer.is_some());
    }

    #[test]
    fn test_duplicate_field_fails() {
        let doc = Document::builder("doc:1")
            .add_text("title", "a")
            .add_text("Title", "b")
            .build();

        let mut ctx = context();
        let err = ctx.prepare(&schema(false), &doc, AddOptions::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateField);
        assert!(ctx.forward_index().is_empty());
    }

    #[test]
    fn test_byte_offsets_need_text_and_save() {
        let doc = Document::builder("doc:1").add_text("body", "hello").build();

        let mut ctx = context();
        ctx.prepare(&schema(true), &doc, AddOptions::empty()).unwrap();
        assert!(ctx.byte_offsets().is_some());
        assert!(ctx.sorting_vector().is_none());

        let mut ctx = context();
        ctx.prepare(&schema(true), &doc, AddOptions::NOSAVE).unwrap();
        assert!(ctx.byte_offsets().is_none());

        let numeric_only = Document::builder("doc:2").add_text("price", "1").build();
        let mut ctx = context();
        ctx.prepare(&schema(true), &numeric_only, AddOptions::empty()).unwrap();
        assert!(ctx.byte_offsets().is_none());
        assert!(ctx.flags().contains(ContextFlags::TEXT_INDEXED));
    }

    #[test]
    fn test_set_document_grows_arrays() {
        let small = Document::builder("doc:1").add_text("title", "a").build();
        let mut ctx = context();
        let schema = schema(false);
        ctx.prepare(&schema, &small, AddOptions::empty()).unwrap();
        assert_eq!(ctx.bindings.len(), 1);

        let old = ctx.doc.len();
        ctx.doc.add_field(DocumentField::new("body", "b"));
        ctx.doc.add_field(DocumentField::new("price", "3"));
        ctx.set_document(&schema, old).unwrap();
        assert_eq!(ctx.bindings.len(), 3);
        assert_eq!(ctx.binding(2).unwrap().name, "price");
    }

    #[test]
    fn test_temporary_schema_never_blocks() {
        let schema = Arc::new(
            Schema::builder("tmp")
                .add_field(FieldSpec::text("body"))
                .unwrap()
                .temporary()
                .build()
                .unwrap(),
        );
        let doc = Document::builder("doc:1").add_text("body", "x").build();
        let mut ctx = context();
        ctx.prepare(&schema, &doc, AddOptions::empty()).unwrap();
        assert!(ctx.flags().contains(ContextFlags::NO_BLOCK));
    }

    #[test]
    fn test_text_bytes_counts_text_and_tags() {
        let schema = Arc::new(
            Schema::builder("idx")
                .add_field(FieldSpec::text("body"))
                .unwrap()
                .add_field(FieldSpec::tag("tags"))
                .unwrap()
                .add_field(FieldSpec::numeric("n"))
                .unwrap()
                .build()
                .unwrap(),
        );
        let doc = Document::builder("doc:1")
            .add_text("body", "12345")
            .add_text("tags", "a,b")
            .add_text("n", "100000")
            .add_text("other", "ignored")
            .build();
        let mut ctx = context();
        ctx.prepare(&schema, &doc, AddOptions::empty()).unwrap();
        assert_eq!(ctx.text_bytes(), 8);
    }
}
