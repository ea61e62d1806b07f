//! Index structures fed by the indexing pipeline.
//!
//! Per-document accumulators ([`forward::ForwardIndex`],
//! [`offsets::ByteOffsets`], [`sorting::SortingVector`]) live inside an
//! indexing context. The persistent per-field-type structures
//! ([`numeric::NumericRangeTree`], [`tag::TagIndex`], [`geo::GeoIndex`],
//! [`fulltext::FullTextIndex`]) are shared between jobs and reached through
//! the handles of an [`registry::IndexRegistry`].

pub mod forward;
pub mod fulltext;
pub mod geo;
pub mod numeric;
pub mod offsets;
pub mod registry;
pub mod sorting;
pub mod tag;

pub use forward::{ForwardIndex, ForwardIndexEntry};
pub use fulltext::{ForwardIndexSink, FullTextIndex, Posting};
pub use geo::{GeoIndex, GeoPoint};
pub use numeric::NumericRangeTree;
pub use offsets::ByteOffsets;
pub use registry::{BulkHandle, IndexRegistry, MemoryIndexRegistry};
pub use sorting::{SortableValue, SortingVector};
pub use tag::TagIndex;
