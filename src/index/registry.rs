//! Batch-scoped handles to persistent per-field structures.
//!
//! An [`IndexRegistry`] owns the numeric, tag and geo structures of an
//! index, keyed by [`Schema::field_key`](crate::schema::Schema::field_key).
//! A batch opens each structure once and holds the returned [`BulkHandle`]
//! for all of its documents. The mutex inside a handle is the point where
//! concurrent commits to the same structure are serialized.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};

use crate::document::DocId;
use crate::index::geo::GeoIndex;
use crate::index::numeric::NumericRangeTree;
use crate::index::tag::TagIndex;
use crate::schema::FieldType;

/// Shared handle to one persistent per-field structure.
#[derive(Debug, Clone)]
pub enum BulkHandle {
    Numeric(Arc<Mutex<NumericRangeTree>>),
    Tag(Arc<Mutex<TagIndex>>),
    Geo(Arc<Mutex<GeoIndex>>),
}

impl BulkHandle {
    fn create(field_type: FieldType) -> Option<Self> {
        match field_type {
            FieldType::Numeric => Some(BulkHandle::Numeric(Default::default())),
            FieldType::Tag => Some(BulkHandle::Tag(Default::default())),
            FieldType::Geo => Some(BulkHandle::Geo(Default::default())),
            FieldType::FullText => None,
        }
    }

    /// Field type of the structure behind this handle.
    pub fn field_type(&self) -> FieldType {
        match self {
            BulkHandle::Numeric(_) => FieldType::Numeric,
            BulkHandle::Tag(_) => FieldType::Tag,
            BulkHandle::Geo(_) => FieldType::Geo,
        }
    }

    /// Remove every entry of a document. Used to roll back a failed commit.
    pub fn remove_doc(&self, doc_id: DocId) {
        match self {
            BulkHandle::Numeric(tree) => {
                tree.lock().remove_doc(doc_id);
            }
            BulkHandle::Tag(tags) => {
                tags.lock().remove_doc(doc_id);
            }
            BulkHandle::Geo(geo) => {
                geo.lock().remove_doc(doc_id);
            }
        }
    }
}

/// Opens persistent per-field structures.
pub trait IndexRegistry: Send + Sync {
    /// Open the structure stored under `key`.
    ///
    /// With `create` set a missing structure is created. Returns `None` when
    /// the structure does not exist and may not be created, or when the
    /// field type has no per-field structure.
    fn open(&self, field_type: FieldType, key: &str, create: bool) -> Option<BulkHandle>;
}

/// Registry keeping every structure in memory.
#[derive(Debug, Default)]
pub struct MemoryIndexRegistry {
    handles: RwLock<AHashMap<String, BulkHandle>>,
}

impl MemoryIndexRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric tree stored under `key`.
    pub fn numeric(&self, key: &str) -> Option<Arc<Mutex<NumericRangeTree>>> {
        match self.handles.read().get(key) {
            Some(BulkHandle::Numeric(tree)) => Some(tree.clone()),
            _ => None,
        }
    }

    /// Tag index stored under `key`.
    pub fn tag(&self, key: &str) -> Option<Arc<Mutex<TagIndex>>> {
        match self.handles.read().get(key) {
            Some(BulkHandle::Tag(tags)) => Some(tags.clone()),
            _ => None,
        }
    }

    /// Geo index stored under `key`.
    pub fn geo(&self, key: &str) -> Option<Arc<Mutex<GeoIndex>>> {
        match self.handles.read().get(key) {
            Some(BulkHandle::Geo(geo)) => Some(geo.clone()),
            _ => None,
        }
    }

    /// Number of opened structures.
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }
}

impl IndexRegistry for MemoryIndexRegistry {
    fn open(&self, field_type: FieldType, key: &str, create: bool) -> Option<BulkHandle> {
        if let Some(handle) = self.handles.read().get(key) {
            return (handle.field_type() == field_type).then(|| handle.clone());
        }
        if !create {
            return None;
        }

        let mut handles = self.handles.write();
        let handle = match handles.get(key) {
            Some(existing) => existing.clone(),
            None => {
                let created = BulkHandle::create(field_type)?;
                log::debug!("Created {field_type} structure {key}");
                handles.insert(key.to_string(), created.clone());
                created
            }
        };
        (handle.field_type() == field_type).then_some(handle)
    }
}
