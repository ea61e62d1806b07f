//! Batch driver committing preprocessed jobs.
//!
//! An [`IndexBatch`] opens the persistent structure of every numeric, tag
//! and geo field at most once and reuses the handle for all documents of
//! the batch. A document is committed all-or-nothing: per-field structures
//! first, then the forward index, and finally the document record, which
//! makes it visible. A failure at any step removes what was already
//! written for the document.

use std::mem;
use std::sync::Arc;

use ahash::AHashMap;

use crate::context::{AddOptions, ContextFlags, FieldData, IndexingContext};
use crate::dispatch::indexer_for;
use crate::document::DocId;
use crate::error::{Result, XiphosError};
use crate::index::fulltext::{ForwardIndexSink, FullTextIndex};
use crate::index::registry::{BulkHandle, IndexRegistry, MemoryIndexRegistry};
use crate::schema::{FieldSpec, Schema};
use crate::store::{DocTable, DocumentStore, NewDocument};

/// Owner of the collaborators a document is committed into.
pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    registry: Arc<dyn IndexRegistry>,
    sink: Arc<dyn ForwardIndexSink>,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer").finish_non_exhaustive()
    }
}

impl Indexer {
    /// Create an indexer over the given collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<dyn IndexRegistry>,
        sink: Arc<dyn ForwardIndexSink>,
    ) -> Self {
        Indexer {
            store,
            registry,
            sink,
        }
    }

    /// Create an indexer backed by in-memory structures.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(DocTable::new()),
            Arc::new(MemoryIndexRegistry::new()),
            Arc::new(FullTextIndex::new()),
        )
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<dyn IndexRegistry> {
        &self.registry
    }

    pub fn sink(&self) -> &Arc<dyn ForwardIndexSink> {
        &self.sink
    }

    /// Start a batch.
    pub fn begin_batch(&self) -> IndexBatch<'_> {
        IndexBatch {
            indexer: self,
            handles: AHashMap::new(),
            stats: BatchStats::default(),
        }
    }
}

/// Counters of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Documents committed.
    pub indexed: usize,
    /// Documents that failed to commit.
    pub failed: usize,
    /// Persistent structures opened.
    pub handles_opened: usize,
}

/// A set of documents committed through shared handles.
pub struct IndexBatch<'a> {
    indexer: &'a Indexer,
    handles: AHashMap<String, Option<BulkHandle>>,
    stats: BatchStats,
}

impl IndexBatch<'_> {
    fn handle(&mut self, schema: &Schema, fs: &FieldSpec) -> Option<BulkHandle> {
        let key = schema.field_key(fs);
        if let Some(handle) = self.handles.get(&key) {
            return handle.clone();
        }
        let handle = indexer_for(fs.field_type).bulk_init(self.indexer.registry.as_ref(), &key);
        if handle.is_none() {
            log::warn!("Could not open {} structure {key}", fs.field_type);
        }
        self.stats.handles_opened += 1;
        self.handles.insert(key, handle.clone());
        handle
    }

    /// Commit a preprocessed job and assign its document id.
    pub fn add(&mut self, ctx: &mut IndexingContext) -> Result<DocId> {
        let result = self.commit(ctx);
        for data in ctx.field_data.iter_mut() {
            *data = FieldData::None;
        }
        match &result {
            Ok(doc_id) => {
                self.stats.indexed += 1;
                log::trace!("Indexed {} as {doc_id}", ctx.doc.key);
            }
            Err(err) => {
                self.stats.failed += 1;
                log::debug!("Could not index {}: {err}", ctx.doc.key);
            }
        }
        result
    }

    fn commit(&mut self, ctx: &mut IndexingContext) -> Result<DocId> {
        let schema = ctx
            .schema
            .clone()
            .ok_or_else(|| XiphosError::internal("Indexing context has no schema"))?;
        let store = self.indexer.store.clone();
        let replace = ctx.options.contains(AddOptions::REPLACE);

        if !replace && store.id_by_key(&ctx.doc.key).is_some() {
            return Err(XiphosError::generic("Document already exists"));
        }

        let doc_id = store.allocate_id();
        let mut touched: Vec<BulkHandle> = Vec::new();

        if let Err(err) = self.commit_fields(&schema, ctx, doc_id, &mut touched) {
            Self::rollback(&touched, None, doc_id);
            return Err(err);
        }

        let has_text = !ctx.flags.contains(ContextFlags::TEXT_INDEXED);
        if has_text {
            if let Err(err) = self
                .indexer
                .sink
                .commit(doc_id, &ctx.fwd, ctx.byte_offsets.as_ref())
            {
                Self::rollback(&touched, None, doc_id);
                return Err(err);
            }
        }

        let record = NewDocument {
            id: doc_id,
            key: ctx.doc.key.clone(),
            score: ctx.doc.score,
            payload: ctx.doc.payload.clone(),
            sort_vector: ctx.sorting.take(),
            byte_offsets: ctx.byte_offsets.take(),
            total_tokens: ctx.total_tokens,
            max_freq: ctx.fwd.max_freq(),
            fields: if ctx.options.contains(AddOptions::NOSAVE) {
                None
            } else {
                Some(ctx.doc.fields.clone())
            },
        };
        match store.put_document(record, replace) {
            Ok(replaced) => {
                if let Some(old_id) = replaced {
                    log::debug!("Replaced document {} ({old_id} -> {doc_id})", ctx.doc.key);
                }
            }
            Err(err) => {
                let sink = has_text.then(|| self.indexer.sink.as_ref());
                Self::rollback(&touched, sink, doc_id);
                return Err(err);
            }
        }

        ctx.doc.doc_id = doc_id;
        Ok(doc_id)
    }

    fn commit_fields(
        &mut self,
        schema: &Schema,
        ctx: &mut IndexingContext,
        doc_id: DocId,
        touched: &mut Vec<BulkHandle>,
    ) -> Result<()> {
        for i in 0..ctx.doc.len() {
            let Some(fs) = ctx.bindings[i].and_then(|idx| schema.field(idx)) else {
                continue;
            };
            let indexer = indexer_for(fs.field_type);
            if !fs.is_indexable() || !indexer.has_bulk() {
                continue;
            }
            let data = mem::take(&mut ctx.field_data[i]);
            if data.is_none() {
                continue;
            }

            let handle = self.handle(schema, fs);
            if let Some(handle) = &handle {
                touched.push(handle.clone());
            }
            indexer.bulk_add(handle.as_ref(), doc_id, data)?;
        }
        Ok(())
    }

    fn rollback(touched: &[BulkHandle], sink: Option<&dyn ForwardIndexSink>, doc_id: DocId) {
        for handle in touched {
            handle.remove_doc(doc_id);
        }
        if let Some(sink) = sink {
            sink.remove_doc(doc_id);
        }
        log::trace!("Rolled back document {doc_id} from {} structures", touched.len());
    }

    /// Counters so far.
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Close the batch, releasing its handles.
    pub fn finish(self) -> BatchStats {
        if self.stats.indexed + self.stats.failed > 1 {
            log::debug!(
                "Batch done: {} indexed, {} failed, {} structures",
                self.stats.indexed,
                self.stats.failed,
                self.stats.handles_opened
            );
        }
        self.stats
    }
}
