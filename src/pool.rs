//! Pool of reusable indexing contexts.
//!
//! The pool is an arena of slots. Each slot owns one context while it is
//! idle; [`ContextPool::acquire`] moves the context out to its caller and
//! [`ContextPool::release`] moves it back. A context carries the
//! `(pool, index, generation)` id of its slot, and the generation is bumped
//! on every checkout, so a context can only ever be returned to the pool,
//! slot and checkout it came from.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::context::IndexingContext;
use crate::error::{Result, XiphosError};

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of one checkout of a pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    pool: u32,
    index: u32,
    generation: u32,
}

impl SlotId {
    pub(crate) fn new(pool: u32, index: u32, generation: u32) -> Self {
        SlotId {
            pool,
            index,
            generation,
        }
    }

    /// Id of the owning pool.
    pub fn pool(&self) -> u32 {
        self.pool
    }

    /// Slot index in the arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Checkout generation of the slot.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}v{}", self.pool, self.index, self.generation)
    }
}

/// A checked-out context.
pub type PooledContext = Box<IndexingContext>;

#[derive(Debug)]
struct Slot {
    generation: u32,
    ctx: Option<PooledContext>,
}

#[derive(Debug, Default)]
struct PoolInner {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

/// Pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts ever allocated.
    pub allocated: usize,
    /// Idle contexts.
    pub available: usize,
    /// Contexts currently checked out.
    pub checked_out: usize,
}

/// Thread-safe arena of [`IndexingContext`]s.
#[derive(Debug)]
pub struct ContextPool {
    id: u32,
    inner: Mutex<PoolInner>,
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl ContextPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with `capacity` preallocated contexts.
    pub fn with_capacity(capacity: usize) -> Self {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let mut inner = PoolInner {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
        };
        for index in 0..capacity {
            inner.slots.push(Slot {
                generation: 0,
                ctx: Some(Box::new(IndexingContext::new(SlotId::new(id, index as u32, 0)))),
            });
            inner.free.push(capacity - 1 - index);
        }
        ContextPool {
            id,
            inner: Mutex::new(inner),
        }
    }

    /// Check out a context, allocating a new slot when none is idle.
    pub fn acquire(&self) -> PooledContext {
        let mut inner = self.inner.lock();

        while let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index];
            if let Some(mut ctx) = slot.ctx.take() {
                slot.generation = slot.generation.wrapping_add(1);
                ctx.slot = SlotId::new(self.id, index as u32, slot.generation);
                return ctx;
            }
        }

        let index = inner.slots.len();
        inner.slots.push(Slot {
            generation: 1,
            ctx: None,
        });
        log::trace!("Context pool {} grew to {} slots", self.id, index + 1);
        Box::new(IndexingContext::new(SlotId::new(self.id, index as u32, 1)))
    }

    /// Return a context to its slot.
    ///
    /// A context still holding sub-resources is cleaned and returned, but
    /// the call reports an error. A context whose id does not match a
    /// checked-out slot of this pool is dropped with an error.
    pub fn release(&self, mut ctx: PooledContext) -> Result<()> {
        let leaked = ctx.leaked_resources();
        if !leaked.is_empty() {
            log::warn!(
                "Context {} released with unfreed resources: {}",
                ctx.slot,
                leaked.join(", ")
            );
        }
        ctx.free_resources();

        let id = ctx.slot;
        let mut inner = self.inner.lock();
        match inner.slots.get_mut(id.index()) {
            Some(slot)
                if id.pool == self.id && slot.generation == id.generation && slot.ctx.is_none() =>
            {
                slot.ctx = Some(ctx);
                inner.free.push(id.index());
            }
            _ => {
                return Err(XiphosError::internal(format!(
                    "Context {id} does not belong to a checked-out slot"
                )));
            }
        }

        if leaked.is_empty() {
            Ok(())
        } else {
            Err(XiphosError::internal(format!(
                "Context released with unfreed resources: {}",
                leaked.join(", ")
            )))
        }
    }

    /// Current statistics.
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            allocated: inner.slots.len(),
            available: inner.free.len(),
            checked_out: inner.slots.len() - inner.free.len(),
        }
    }
}
