//! Entry point of the indexing pipeline.
//!
//! [`IndexingService`] owns the context pool, the batch driver and a
//! bounded rayon worker pool. A submitted job runs inline on the caller's
//! thread unless its full-text and tag values reach the configured offload
//! threshold and the job may block, in which case it runs on a worker.
//! Either way its completion callback is invoked exactly once, and the
//! context goes back to the pool right after.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use xiphos::config::IndexerConfig;
//! use xiphos::context::AddOptions;
//! use xiphos::document::Document;
//! use xiphos::schema::{FieldSpec, Schema};
//! use xiphos::service::IndexingService;
//!
//! let schema = Schema::builder("products")
//!     .add_field(FieldSpec::text("title"))?
//!     .add_field(FieldSpec::numeric("price").sortable())?
//!     .build()?;
//! let service = IndexingService::new(Arc::new(schema), IndexerConfig::default())?;
//!
//! let doc = Document::builder("product:1")
//!     .add_text("title", "Rust in Action")
//!     .add_text("price", "39.99")
//!     .build();
//! let outcome = tokio_test::block_on(service.add_document(&doc, AddOptions::empty())?);
//! assert_eq!(outcome.doc_id(), Some(1));
//! # Ok::<(), xiphos::error::XiphosError>(())
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::FutureExt;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::IndexerConfig;
use crate::context::{
    AddOptions, CompletionCallback, ContextFlags, IndexingContext, IndexingOutcome,
};
use crate::dispatch::preprocess_document;
use crate::document::Document;
use crate::error::{Result, XiphosError};
use crate::indexer::Indexer;
use crate::partial::{self, UpdatePath};
use crate::pool::{ContextPool, PooledContext};
use crate::schema::{Schema, SchemaFlags};

/// Where a submitted job ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Completed on the submitting thread before `submit` returned.
    Inline,
    /// Handed to a worker thread.
    Offloaded,
}

/// Future resolving to the outcome of one submitted document.
#[derive(Debug)]
pub struct Completion {
    key: String,
    dispatch: Dispatch,
    rx: oneshot::Receiver<IndexingOutcome>,
}

impl Completion {
    /// Where the job ran.
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    /// Key of the submitted document.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Future for Completion {
    type Output = IndexingOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx.poll_unpin(cx).map(|received| {
            received.unwrap_or_else(|_| IndexingOutcome {
                key: self.key.clone(),
                result: Err(XiphosError::internal("Completion dropped without an outcome")),
            })
        })
    }
}

/// State shared between the service and its workers.
struct Pipeline {
    pool: ContextPool,
    indexer: Indexer,
}

impl Pipeline {
    /// Preprocess and commit one job, then complete it.
    fn run(&self, mut ctx: PooledContext) {
        let result = preprocess_document(&mut ctx).and_then(|()| {
            let mut batch = self.indexer.begin_batch();
            let added = batch.add(&mut ctx);
            batch.finish();
            added
        });
        if let Err(err) = result {
            ctx.set_status(err);
        }
        self.finish(ctx);
    }

    /// Invoke the completion callback and return the context to the pool.
    fn finish(&self, mut ctx: PooledContext) {
        let callback = ctx.callback.take();
        let outcome = ctx.take_outcome();
        if let Err(err) = &outcome.result {
            log::debug!("Indexing {} failed: {err}", outcome.key);
        }
        ctx.free_resources();

        match callback {
            Some(callback) => callback(outcome),
            None => log::warn!("Job {} finished without a completion callback", outcome.key),
        }
        if let Err(err) = self.pool.release(ctx) {
            log::warn!("{err}");
        }
    }

    /// Apply the partial-update decision. Returns the job if it still needs
    /// the indexing pipeline; otherwise it was completed.
    fn resolve_partial(&self, mut ctx: PooledContext) -> Option<PooledContext> {
        if !ctx.options().contains(AddOptions::PARTIAL) {
            return Some(ctx);
        }
        let store = self.indexer.store().as_ref();
        match partial::decide(&ctx) {
            UpdatePath::ReplaceMerge => match partial::replace_merge(&mut ctx, store) {
                Ok(()) => Some(ctx),
                Err(err) => {
                    ctx.set_status(err);
                    self.finish(ctx);
                    None
                }
            },
            UpdatePath::MetadataOnly => {
                match partial::metadata_only(&ctx, store) {
                    Ok(doc_id) => ctx.doc.doc_id = doc_id,
                    Err(err) => ctx.set_status(err),
                }
                self.finish(ctx);
                None
            }
        }
    }
}

/// Document indexing service of one index.
pub struct IndexingService {
    schema: Arc<Schema>,
    config: IndexerConfig,
    pipeline: Arc<Pipeline>,
    workers: ThreadPool,
}

impl std::fmt::Debug for IndexingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingService")
            .field("schema", &self.schema.name())
            .field("config", &self.config)
            .field("workers", &self.workers.current_num_threads())
            .finish()
    }
}

impl IndexingService {
    /// Create a service backed by in-memory structures.
    pub fn new(schema: Arc<Schema>, config: IndexerConfig) -> Result<Self> {
        Self::with_indexer(schema, config, Indexer::in_memory())
    }

    /// Create a service committing through `indexer`.
    pub fn with_indexer(schema: Arc<Schema>, config: IndexerConfig, indexer: Indexer) -> Result<Self> {
        config.validate()?;

        let prefix = config.thread_name_prefix.clone();
        let workers = ThreadPoolBuilder::new()
            .num_threads(config.effective_worker_threads())
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()
            .map_err(|e| XiphosError::internal(format!("Failed to create thread pool: {e}")))?;

        log::debug!(
            "Indexing service for {} with {} workers, offload threshold {} bytes",
            schema.name(),
            workers.current_num_threads(),
            config.offload_threshold
        );

        Ok(IndexingService {
            pipeline: Arc::new(Pipeline {
                pool: ContextPool::with_capacity(config.pool_capacity),
                indexer,
            }),
            schema,
            config,
            workers,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// The context pool.
    pub fn pool(&self) -> &ContextPool {
        &self.pipeline.pool
    }

    /// The batch driver and its collaborators.
    pub fn indexer(&self) -> &Indexer {
        &self.pipeline.indexer
    }

    /// Check out a context and bind `doc` to it.
    ///
    /// Setup failures such as duplicate fields are returned directly; the
    /// context goes back to the pool and no callback is involved.
    pub fn new_context(&self, doc: &Document, options: AddOptions) -> Result<PooledContext> {
        let mut ctx = self.pipeline.pool.acquire();
        match ctx.prepare(&self.schema, doc, options) {
            Ok(()) => Ok(ctx),
            Err(err) => {
                ctx.free_resources();
                if let Err(release_err) = self.pipeline.pool.release(ctx) {
                    log::warn!("{release_err}");
                }
                Err(err)
            }
        }
    }

    /// Run a prepared job, inline or on a worker.
    ///
    /// `callback` is invoked exactly once with the outcome. With
    /// [`Dispatch::Inline`] that already happened when this returns.
    pub fn submit(&self, mut ctx: PooledContext, callback: CompletionCallback) -> Dispatch {
        ctx.callback = Some(callback);
        let Some(ctx) = self.pipeline.resolve_partial(ctx) else {
            return Dispatch::Inline;
        };

        let text_bytes = ctx.text_bytes();
        if text_bytes >= self.config.offload_threshold && self.is_blockable(&ctx) {
            log::debug!("Offloading {} ({text_bytes} bytes)", ctx.key());
            let pipeline = self.pipeline.clone();
            self.workers.spawn(move || pipeline.run(ctx));
            Dispatch::Offloaded
        } else {
            self.pipeline.run(ctx);
            Dispatch::Inline
        }
    }

    fn is_blockable(&self, ctx: &IndexingContext) -> bool {
        !ctx.flags().contains(ContextFlags::NO_BLOCK)
    }

    /// Index one document and get a future of its outcome.
    pub fn add_document(&self, doc: &Document, options: AddOptions) -> Result<Completion> {
        let ctx = self.new_context(doc, options)?;
        let (tx, rx) = oneshot::channel();
        let dispatch = self.submit(
            ctx,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );
        Ok(Completion {
            key: doc.key.clone(),
            dispatch,
            rx,
        })
    }

    /// Index several documents through one batch.
    ///
    /// Jobs are preprocessed in parallel on the worker pool (inline for
    /// temporary indexes or with [`AddOptions::NO_BLOCK`]) and committed in
    /// submission order. Returns one outcome per document.
    pub fn add_batch(&self, docs: &[Document], options: AddOptions) -> Vec<IndexingOutcome> {
        let outcomes: Arc<Mutex<Vec<Option<IndexingOutcome>>>> =
            Arc::new(Mutex::new((0..docs.len()).map(|_| None).collect()));

        let mut jobs: Vec<PooledContext> = Vec::with_capacity(docs.len());
        for (i, doc) in docs.iter().enumerate() {
            match self.new_context(doc, options) {
                Ok(mut ctx) => {
                    let slots = outcomes.clone();
                    ctx.callback = Some(Box::new(move |outcome| {
                        slots.lock()[i] = Some(outcome);
                    }));
                    if let Some(ctx) = self.pipeline.resolve_partial(ctx) {
                        jobs.push(ctx);
                    }
                }
                Err(err) => {
                    outcomes.lock()[i] = Some(IndexingOutcome {
                        key: doc.key.clone(),
                        result: Err(err),
                    });
                }
            }
        }

        let inline = options.contains(AddOptions::NO_BLOCK)
            || self.schema.flags().contains(SchemaFlags::TEMPORARY);
        let preprocess = |ctx: &mut PooledContext| {
            if let Err(err) = preprocess_document(ctx) {
                ctx.set_status(err);
            }
        };
        if inline {
            jobs.iter_mut().for_each(preprocess);
        } else {
            self.workers
                .install(|| jobs.par_iter_mut().for_each(preprocess));
        }

        let mut batch = self.pipeline.indexer.begin_batch();
        for mut ctx in jobs {
            if ctx.status().is_none() {
                if let Err(err) = batch.add(&mut ctx) {
                    ctx.set_status(err);
                }
            }
            self.pipeline.finish(ctx);
        }
        batch.finish();

        let mut slots = outcomes.lock();
        slots
            .iter_mut()
            .zip(docs)
            .map(|(slot, doc)| {
                slot.take().unwrap_or_else(|| IndexingOutcome {
                    key: doc.key.clone(),
                    result: Err(XiphosError::internal("Job finished without an outcome")),
                })
            })
            .collect()
    }
}
