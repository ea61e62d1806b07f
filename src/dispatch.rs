//! Per-field-type preprocessing and bulk indexing.
//!
//! Every [`FieldType`] has a [`FieldIndexer`]. Preprocessing turns a raw
//! field value into [`FieldData`] and writes the forward index, sorting
//! vector and byte offsets of the job. Bulk indexing commits the typed data
//! of numeric, tag and geo fields into their persistent structures through
//! batch-scoped [`BulkHandle`]s.

use crate::analysis::token::Token;
use crate::analysis::tokenizer::Tokenizer;
use crate::context::{FieldData, IndexingContext};
use crate::document::DocId;
use crate::error::{Result, XiphosError};
use crate::index::forward::ForwardIndex;
use crate::index::offsets::ByteOffsets;
use crate::index::registry::{BulkHandle, IndexRegistry};
use crate::index::sorting::SortingVector;
use crate::index::tag;
use crate::schema::{FieldSpec, FieldType};

/// Per-document state written by preprocessors.
pub struct PreprocessTarget<'a> {
    pub fwd: &'a mut ForwardIndex,
    pub sorting: Option<&'a mut SortingVector>,
    pub byte_offsets: Option<&'a mut ByteOffsets>,
    pub tokenizer: Option<&'a dyn Tokenizer>,
    /// Last token position used by the document so far.
    pub total_tokens: &'a mut u32,
}

impl PreprocessTarget<'_> {
    fn put_sortable_str(&mut self, fs: &FieldSpec, value: &str) {
        if let (Some(idx), Some(sorting)) = (fs.sort_idx, self.sorting.as_deref_mut()) {
            sorting.put_str(idx, value);
        }
    }

    fn put_sortable_num(&mut self, fs: &FieldSpec, value: f64) {
        if let (Some(idx), Some(sorting)) = (fs.sort_idx, self.sorting.as_deref_mut()) {
            sorting.put_num(idx, value);
        }
    }
}

/// Indexing behavior of one field type.
pub trait FieldIndexer: Send + Sync {
    /// Field type handled by this indexer.
    fn field_type(&self) -> FieldType;

    /// Convert a raw value into typed data, writing per-document state.
    fn preprocess(
        &self,
        target: &mut PreprocessTarget<'_>,
        fs: &FieldSpec,
        value: &str,
    ) -> Result<FieldData>;

    /// Whether the field type has a persistent per-field structure.
    fn has_bulk(&self) -> bool {
        false
    }

    /// Open the persistent structure stored under `key` for a batch.
    fn bulk_init(&self, _registry: &dyn IndexRegistry, _key: &str) -> Option<BulkHandle> {
        None
    }

    /// Commit typed data of a document through a batch-scoped handle.
    ///
    /// The data is consumed whatever the outcome.
    fn bulk_add(&self, _handle: Option<&BulkHandle>, _doc_id: DocId, _data: FieldData) -> Result<()> {
        Ok(())
    }
}

/// Full-text fields: tokenized into the forward index.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullTextIndexer;

impl FieldIndexer for FullTextIndexer {
    fn field_type(&self) -> FieldType {
        FieldType::FullText
    }

    fn preprocess(
        &self,
        target: &mut PreprocessTarget<'_>,
        fs: &FieldSpec,
        value: &str,
    ) -> Result<FieldData> {
        if fs.is_sortable() {
            target.put_sortable_str(fs, value);
        }
        if !fs.is_indexable() {
            return Ok(FieldData::None);
        }

        let tokenizer = target
            .tokenizer
            .ok_or_else(|| XiphosError::internal("Indexing context has no tokenizer"))?;

        let base = *target.total_tokens;
        let field_id = fs.text_opts.id;
        let slot = target
            .byte_offsets
            .as_deref_mut()
            .map(|offsets| offsets.add_field(field_id, base + 1));

        let mut last_pos = base;
        for token in tokenizer.start(value, fs.tokenize_options()) {
            let token = Token {
                position: base + token.position,
                ..token
            };
            target.fwd.add_token(field_id, fs.text_opts.weight, &token);
            if let Some(offsets) = target.byte_offsets.as_deref_mut() {
                offsets.record(token.start_offset);
            }
            last_pos = token.position;
        }

        if let (Some(slot), Some(offsets)) = (slot, target.byte_offsets.as_deref_mut()) {
            offsets.finish_field(slot, last_pos);
        }
        *target.total_tokens = last_pos;
        Ok(FieldData::None)
    }
}

/// Numeric fields: parsed and added to a numeric range tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericIndexer;

impl FieldIndexer for NumericIndexer {
    fn field_type(&self) -> FieldType {
        FieldType::Numeric
    }

    fn preprocess(
        &self,
        target: &mut PreprocessTarget<'_>,
        fs: &FieldSpec,
        value: &str,
    ) -> Result<FieldData> {
        let number = parse_numeric(value).ok_or_else(|| {
            XiphosError::parse(format!(
                "Could not parse numeric value `{value}` of field `{}`",
                fs.name
            ))
        })?;
        if fs.is_sortable() {
            target.put_sortable_num(fs, number);
        }
        Ok(FieldData::Numeric(number))
    }

    fn has_bulk(&self) -> bool {
        true
    }

    fn bulk_init(&self, registry: &dyn IndexRegistry, key: &str) -> Option<BulkHandle> {
        registry.open(FieldType::Numeric, key, true)
    }

    fn bulk_add(&self, handle: Option<&BulkHandle>, doc_id: DocId, data: FieldData) -> Result<()> {
        match (handle, data) {
            (Some(BulkHandle::Numeric(tree)), FieldData::Numeric(value)) => {
                tree.lock().add(doc_id, value);
                Ok(())
            }
            (_, FieldData::None) => Ok(()),
            _ => Err(XiphosError::generic("Could not open numeric index for indexing")),
        }
    }
}

/// Tag fields: split into tags and added to a tag index.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagIndexer;

impl FieldIndexer for TagIndexer {
    fn field_type(&self) -> FieldType {
        FieldType::Tag
    }

    fn preprocess(
        &self,
        target: &mut PreprocessTarget<'_>,
        fs: &FieldSpec,
        value: &str,
    ) -> Result<FieldData> {
        let Some(tags) = tag::preprocess(&fs.tag_opts, value) else {
            return Ok(FieldData::None);
        };
        if fs.is_sortable() {
            target.put_sortable_str(fs, value);
        }
        Ok(FieldData::Tags(tags))
    }

    fn has_bulk(&self) -> bool {
        true
    }

    fn bulk_init(&self, registry: &dyn IndexRegistry, key: &str) -> Option<BulkHandle> {
        registry.open(FieldType::Tag, key, true)
    }

    fn bulk_add(&self, handle: Option<&BulkHandle>, doc_id: DocId, data: FieldData) -> Result<()> {
        let FieldData::Tags(tags) = data else {
            return Ok(());
        };
        match handle {
            Some(BulkHandle::Tag(index)) => {
                index.lock().index(&tags, doc_id);
                Ok(())
            }
            _ => Err(XiphosError::generic("Could not open tag index for indexing")),
        }
    }
}

/// Geo fields: split into coordinates and added to a geo index.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoIndexer;

impl FieldIndexer for GeoIndexer {
    fn field_type(&self) -> FieldType {
        FieldType::Geo
    }

    fn preprocess(
        &self,
        _target: &mut PreprocessTarget<'_>,
        fs: &FieldSpec,
        value: &str,
    ) -> Result<FieldData> {
        let (lon, lat) = value.split_once([' ', ',']).ok_or_else(|| {
            XiphosError::geo_format(format!(
                "Invalid geo value `{value}` of field `{}`: expected `lon,lat`",
                fs.name
            ))
        })?;
        Ok(FieldData::Geo {
            lon: lon.to_string(),
            lat: lat.to_string(),
        })
    }

    fn has_bulk(&self) -> bool {
        true
    }

    fn bulk_init(&self, registry: &dyn IndexRegistry, key: &str) -> Option<BulkHandle> {
        registry.open(FieldType::Geo, key, true)
    }

    fn bulk_add(&self, handle: Option<&BulkHandle>, doc_id: DocId, data: FieldData) -> Result<()> {
        let FieldData::Geo { lon, lat } = data else {
            return Ok(());
        };
        match handle {
            Some(BulkHandle::Geo(index)) => index
                .lock()
                .add_strings(doc_id, &lon, &lat)
                .map_err(|e| {
                    log::debug!("Rejected geo value of document {doc_id}: {e}");
                    XiphosError::generic("Could not index geo value")
                }),
            _ => Err(XiphosError::generic("Could not index geo value")),
        }
    }
}

/// Indexer of a field type.
pub fn indexer_for(field_type: FieldType) -> &'static dyn FieldIndexer {
    match field_type {
        FieldType::FullText => &FullTextIndexer,
        FieldType::Numeric => &NumericIndexer,
        FieldType::Tag => &TagIndexer,
        FieldType::Geo => &GeoIndexer,
    }
}

/// Parse a numeric field value. NaN is rejected.
pub(crate) fn parse_numeric(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Run the preprocessor of every bound field, in document order.
///
/// Stops at the first failing field.
pub fn preprocess_document(ctx: &mut IndexingContext) -> Result<()> {
    let schema = ctx
        .schema
        .clone()
        .ok_or_else(|| XiphosError::internal("Indexing context has no schema"))?;

    let IndexingContext {
        doc,
        bindings,
        field_data,
        fwd,
        sorting,
        byte_offsets,
        tokenizer,
        total_tokens,
        ..
    } = ctx;

    let mut target = PreprocessTarget {
        fwd,
        sorting: sorting.as_mut(),
        byte_offsets: byte_offsets.as_mut(),
        tokenizer: tokenizer.as_deref(),
        total_tokens,
    };

    for (i, field) in doc.fields.iter().enumerate() {
        let Some(fs) = bindings[i].and_then(|idx| schema.field(idx)) else {
            continue;
        };
        if !fs.is_indexable() && !fs.is_sortable() {
            continue;
        }
        let Some(value) = field.text() else {
            continue;
        };
        field_data[i] = indexer_for(fs.field_type).preprocess(&mut target, fs, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::{StopWords, TokenizerFactory};
    use crate::error::ErrorKind;
    use crate::index::registry::MemoryIndexRegistry;

    struct Target {
        fwd: ForwardIndex,
        sorting: SortingVector,
        offsets: ByteOffsets,
        tokenizer: Arc<dyn Tokenizer>,
        total: u32,
    }

    impl Target {
        fn new() -> Self {
            Target {
                fwd: ForwardIndex::new(),
                sorting: SortingVector::new(2),
                offsets: ByteOffsets::new(),
                tokenizer: TokenizerFactory::get("english", Arc::new(StopWords::empty())),
                total: 0,
            }
        }

        fn view(&mut self) -> PreprocessTarget<'_> {
            PreprocessTarget {
                fwd: &mut self.fwd,
                sorting: Some(&mut self.sorting),
                byte_offsets: Some(&mut self.offsets),
                tokenizer: Some(&*self.tokenizer),
                total_tokens: &mut self.total,
            }
        }
    }

    fn spec(fs: FieldSpec, text_id: u16, sort_idx: Option<usize>) -> FieldSpec {
        let mut fs = fs;
        fs.text_opts.id = text_id;
        fs.sort_idx = sort_idx;
        fs
    }

    #[test]
    fn test_fulltext_shares_positions_across_fields() {
        let mut target = Target::new();
        let title = spec(FieldSpec::text("title").sortable(), 0, Some(0));
        let body = spec(FieldSpec::text("body"), 1, None);

        let mut view = target.view();
        FullTextIndexer.preprocess(&mut view, &title, "Hello World").unwrap();
        FullTextIndexer.preprocess(&mut view, &body, "big world").unwrap();

        assert_eq!(target.total, 4);
        assert_eq!(target.fwd.get("world").unwrap().positions, vec![2, 4]);
        assert_eq!(target.fwd.get("world").unwrap().field_mask, 0b11);
        assert_eq!(target.sorting.get(0).unwrap().as_str(), Some("hello world"));

        let fields = target.offsets.fields();
        assert_eq!((fields[0].first_tok_pos, fields[0].last_tok_pos), (1, 2));
        assert_eq!((fields[1].first_tok_pos, fields[1].last_tok_pos), (3, 4));
        assert_eq!(target.offsets.offsets().decode().unwrap(), vec![0, 6, 0, 4]);
    }

    #[test]
    fn test_sortable_only_text_is_not_tokenized() {
        let mut target = Target::new();
        let fs = spec(FieldSpec::text("title").sortable().no_index(), 0, Some(1));
        FullTextIndexer.preprocess(&mut target.view(), &fs, "Zebra").unwrap();
        assert!(target.fwd.is_empty());
        assert_eq!(target.sorting.get(1).unwrap().as_str(), Some("zebra"));
    }

    #[test]
    fn test_numeric_preprocess() {
        let mut target = Target::new();
        let fs = spec(FieldSpec::numeric("price").sortable(), 0, Some(1));
        let data = NumericIndexer.preprocess(&mut target.view(), &fs, "39.5").unwrap();
        assert_eq!(data, FieldData::Numeric(39.5));
        assert_eq!(target.sorting.get(1).unwrap().as_num(), Some(39.5));

        let err = NumericIndexer
            .preprocess(&mut target.view(), &fs, "abc")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
        assert!(parse_numeric("NaN").is_none());
    }

    #[test]
    fn test_geo_preprocess() {
        let mut target = Target::new();
        let fs = FieldSpec::geo("loc");
        assert_eq!(
            GeoIndexer.preprocess(&mut target.view(), &fs, "-122.4,37.7").unwrap(),
            FieldData::Geo {
                lon: "-122.4".to_string(),
                lat: "37.7".to_string()
            }
        );
        assert_eq!(
            GeoIndexer.preprocess(&mut target.view(), &fs, "1.5 2.5").unwrap(),
            FieldData::Geo {
                lon: "1.5".to_string(),
                lat: "2.5".to_string()
            }
        );
        let err = GeoIndexer
            .preprocess(&mut target.view(), &fs, "notanumber")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeoFormatError);
    }

    #[test]
    fn test_empty_tags_short_circuit() {
        let mut target = Target::new();
        let fs = spec(FieldSpec::tag("tags").sortable(), 0, Some(0));
        assert_eq!(
            TagIndexer.preprocess(&mut target.view(), &fs, " , ").unwrap(),
            FieldData::None
        );
        assert!(target.sorting.get(0).unwrap().is_null());
    }

    #[test]
    fn test_bulk_add() {
        let registry = MemoryIndexRegistry::new();

        let handle = NumericIndexer.bulk_init(&registry, "nm:idx/price");
        NumericIndexer
            .bulk_add(handle.as_ref(), 3, FieldData::Numeric(9.0))
            .unwrap();
        assert_eq!(registry.numeric("nm:idx/price").unwrap().lock().len(), 1);

        let err = TagIndexer
            .bulk_add(None, 3, FieldData::Tags(vec!["a".to_string()]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Indexing error: Could not open tag index for indexing");

        let handle = GeoIndexer.bulk_init(&registry, "geo:idx/loc");
        let err = GeoIndexer
            .bulk_add(
                handle.as_ref(),
                3,
                FieldData::Geo {
                    lon: "500".to_string(),
                    lat: "1".to_string(),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(registry.geo("geo:idx/loc").unwrap().lock().is_empty());
    }

    #[test]
    fn test_indexer_for() {
        for ft in [FieldType::FullText, FieldType::Numeric, FieldType::Tag, FieldType::Geo] {
            assert_eq!(indexer_for(ft).field_type(), ft);
        }
        assert!(!indexer_for(FieldType::FullText).has_bulk());
    }
}
