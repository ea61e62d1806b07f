//! Partial updates of existing documents.
//!
//! A partial update carrying any indexable field is turned into a full
//! replacement: the stored fields of the document are loaded, the new
//! values are laid over them and the merged document is indexed under a
//! new id. An update without indexable fields only touches the metadata of
//! the existing document: score, payload and sortable values.

use bit_vec::BitVec;

use crate::context::{AddOptions, ContextFlags, IndexingContext};
use crate::dispatch::parse_numeric;
use crate::document::{DocId, Document, DocumentField};
use crate::error::{Result, XiphosError};
use crate::index::sorting::SortingVector;
use crate::schema::{FieldType, Schema};
use crate::store::{DocumentMetadata, DocumentStore};

/// How a partial update is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePath {
    /// Reload, merge and reindex the whole document.
    ReplaceMerge,
    /// Update score, payload and sortable values in place.
    MetadataOnly,
}

/// Pick the path of a prepared partial update.
pub fn decide(ctx: &IndexingContext) -> UpdatePath {
    if ctx.flags().contains(ContextFlags::INDEXABLES) {
        UpdatePath::ReplaceMerge
    } else {
        UpdatePath::MetadataOnly
    }
}

/// Replace the job's fields with the stored document merged with the
/// update, and bind the result again.
///
/// Fails with [`XiphosError::NoDocument`] when the document cannot be
/// loaded; nothing is written in that case.
pub fn replace_merge(ctx: &mut IndexingContext, store: &dyn DocumentStore) -> Result<()> {
    let schema = ctx
        .schema
        .clone()
        .ok_or_else(|| XiphosError::internal("Indexing context has no schema"))?;

    let old_field_count = ctx.doc.len();

    let names: Vec<&str> = schema.fields().iter().map(|fs| fs.name.as_str()).collect();
    let stored = store.load_fields(&ctx.doc.key, &names).map_err(|err| {
        log::debug!("Could not load {} for replace: {err}", ctx.doc.key);
        XiphosError::no_document("Could not load existing document")
    })?;
    let merged = merge_fields(&ctx.doc, stored);

    ctx.doc.clear_fields();
    for field in merged {
        ctx.doc.add_field(field);
    }
    ctx.options |= AddOptions::REPLACE;
    ctx.flags &= ContextFlags::NO_BLOCK;
    log::debug!(
        "Reindexing {} with {} merged fields",
        ctx.doc.key,
        ctx.doc.len()
    );
    ctx.set_document(&schema, old_field_count)
}

/// Stored fields with the values of `update` laid over them, followed by
/// the updated fields the document did not have.
fn merge_fields(update: &Document, stored: Vec<DocumentField>) -> Vec<DocumentField> {
    let mut merged: Vec<DocumentField> = stored
        .into_iter()
        .map(|field| match update.get_field(&field.name) {
            Some(new) => DocumentField {
                text: new.text.clone(),
                ..field
            },
            None => field,
        })
        .collect();

    for field in &update.fields {
        if !merged.iter().any(|f| f.name.eq_ignore_ascii_case(&field.name)) {
            merged.push(field.clone());
        }
    }
    merged
}

/// Update score, payload and sortable values of the existing document.
///
/// Returns the id of the updated document. Nothing is changed when any
/// sortable value is rejected.
pub fn metadata_only(ctx: &IndexingContext, store: &dyn DocumentStore) -> Result<DocId> {
    let schema = ctx
        .schema
        .as_deref()
        .ok_or_else(|| XiphosError::internal("Indexing context has no schema"))?;
    let doc = &ctx.doc;

    let doc_id = store
        .id_by_key(&doc.key)
        .ok_or_else(|| XiphosError::no_document("Couldn't load old document"))?;
    let update_sortables = ctx.flags.contains(ContextFlags::SORTABLES);

    store.update_metadata(doc_id, &mut |md: &mut DocumentMetadata| {
        if update_sortables {
            md.sort_vector = Some(updated_sorting_vector(schema, doc, md.sort_vector.clone())?);
        }
        md.score = doc.score;
        Ok(())
    })?;

    if doc.payload.is_some() {
        store.set_payload(doc_id, doc.payload.clone())?;
    }

    // Storing the updated raw fields is best-effort; the metadata update stands.
    if !ctx.options.contains(AddOptions::NOSAVE) {
        if let Err(err) = store.update_fields(&doc.key, &doc.fields) {
            log::warn!("Stored fields of {} not updated: {err}", doc.key);
        }
    }

    log::debug!("Updated metadata of {} ({doc_id})", doc.key);
    Ok(doc_id)
}

fn updated_sorting_vector(
    schema: &Schema,
    doc: &Document,
    current: Option<SortingVector>,
) -> Result<SortingVector> {
    let mut sorting = current.unwrap_or_else(|| SortingVector::new(schema.sortable_count()));
    let mut dedupe = BitVec::from_elem(schema.len(), false);

    for field in &doc.fields {
        let Some(fs) = schema.resolve_field(&field.name) else {
            continue;
        };
        if !fs.is_sortable() {
            continue;
        }
        if dedupe.get(fs.index).unwrap_or(false) {
            return Err(XiphosError::duplicate_field("Requested to index field twice"));
        }
        dedupe.set(fs.index, true);

        let (Some(idx), Some(value)) = (fs.sort_idx, field.text()) else {
            continue;
        };
        match fs.field_type {
            FieldType::FullText => sorting.put_str(idx, value),
            FieldType::Numeric => {
                let number = parse_numeric(value).ok_or_else(|| {
                    XiphosError::parse("Could not parse numeric index value")
                })?;
                sorting.put_num(idx, number);
            }
            other => {
                return Err(XiphosError::unsupported_sortable(format!(
                    "Unsupported sortable type {other} for field `{}`",
                    fs.name
                )));
            }
        }
    }
    Ok(sorting)
}
