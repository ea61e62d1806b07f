//! Document table: key to id mapping, per-document metadata and stored
//! field values.
//!
//! The pipeline only talks to the [`DocumentStore`] trait. [`DocTable`] is
//! the in-memory implementation used by default; ids start at 1 and are
//! never reused.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::document::{DocId, DocumentField};
use crate::error::{Result, XiphosError};
use crate::index::offsets::ByteOffsets;
use crate::index::sorting::SortingVector;

/// Metadata kept for every document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    /// Document id.
    pub id: DocId,
    /// Document key.
    pub key: String,
    /// Document score.
    pub score: f32,
    /// Optional payload.
    pub payload: Option<Arc<[u8]>>,
    /// Sortable values, if the document had sortable fields.
    pub sort_vector: Option<SortingVector>,
    /// Token byte offsets, if the schema stores them.
    pub byte_offsets: Option<ByteOffsets>,
    /// Set once the document was replaced or deleted.
    pub deleted: bool,
    /// Number of full-text tokens of the document.
    pub total_tokens: u32,
    /// Highest term frequency of the document.
    pub max_freq: u32,
}

/// Everything the indexer publishes for a newly indexed document.
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Id obtained from [`DocumentStore::allocate_id`].
    pub id: DocId,
    pub key: String,
    pub score: f32,
    pub payload: Option<Arc<[u8]>>,
    pub sort_vector: Option<SortingVector>,
    pub byte_offsets: Option<ByteOffsets>,
    pub total_tokens: u32,
    pub max_freq: u32,
    /// Raw fields to persist; `None` keeps nothing (NOSAVE).
    pub fields: Option<Vec<DocumentField>>,
}

/// Storage and metadata service of an index.
pub trait DocumentStore: Send + Sync {
    /// Id of the live document stored under `key`.
    fn id_by_key(&self, key: &str) -> Option<DocId>;

    /// Metadata of a document.
    fn metadata(&self, id: DocId) -> Option<DocumentMetadata>;

    /// Mutate the metadata of a live document in place.
    fn update_metadata(
        &self,
        id: DocId,
        update: &mut dyn FnMut(&mut DocumentMetadata) -> Result<()>,
    ) -> Result<()>;

    /// Replace the payload of a document.
    fn set_payload(&self, id: DocId, payload: Option<Arc<[u8]>>) -> Result<()>;

    /// Load the stored values of `names` for the document under `key`.
    ///
    /// Names without a stored value are left out. Fails with
    /// [`XiphosError::NoDocument`] if nothing is stored under `key`.
    fn load_fields(&self, key: &str, names: &[&str]) -> Result<Vec<DocumentField>>;

    /// Merge `fields` into the stored values of `key`, matching names
    /// without regard to ASCII case.
    fn update_fields(&self, key: &str, fields: &[DocumentField]) -> Result<()>;

    /// Reserve a new document id.
    fn allocate_id(&self) -> DocId;

    /// Publish a document under its key.
    ///
    /// An existing live document with the same key is marked deleted when
    /// `replace` is set, otherwise the call fails. Returns the id of the
    /// replaced document.
    fn put_document(&self, doc: NewDocument, replace: bool) -> Result<Option<DocId>>;

    /// Delete the document stored under `key`. Returns its id.
    fn delete(&self, key: &str) -> Option<DocId>;
}

#[derive(Debug, Default)]
struct DocTableInner {
    last_id: DocId,
    by_key: AHashMap<String, DocId>,
    docs: BTreeMap<DocId, DocumentMetadata>,
    fields: AHashMap<String, Vec<DocumentField>>,
}

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct DocTable {
    inner: RwLock<DocTableInner>,
}

impl DocTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.inner.read().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_key.is_empty()
    }

    /// Highest id handed out so far.
    pub fn max_id(&self) -> DocId {
        self.inner.read().last_id
    }

    /// Stored fields of a key.
    pub fn stored_fields(&self, key: &str) -> Option<Vec<DocumentField>> {
        self.inner.read().fields.get(key).cloned()
    }
}

impl DocumentStore for DocTable {
    fn id_by_key(&self, key: &str) -> Option<DocId> {
        self.inner.read().by_key.get(key).copied()
    }

    fn metadata(&self, id: DocId) -> Option<DocumentMetadata> {
        self.inner.read().docs.get(&id).cloned()
    }

    fn update_metadata(
        &self,
        id: DocId,
        update: &mut dyn FnMut(&mut DocumentMetadata) -> Result<()>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.docs.get_mut(&id) {
            Some(md) if !md.deleted => update(md),
            _ => Err(XiphosError::no_document(format!(
                "Couldn't load document metadata of id {id}"
            ))),
        }
    }

    fn set_payload(&self, id: DocId, payload: Option<Arc<[u8]>>) -> Result<()> {
        self.update_metadata(id, &mut |md: &mut DocumentMetadata| {
            md.payload = payload.clone();
            Ok(())
        })
    }

    fn load_fields(&self, key: &str, names: &[&str]) -> Result<Vec<DocumentField>> {
        let inner = self.inner.read();
        let stored = inner
            .fields
            .get(key)
            .ok_or_else(|| XiphosError::no_document("Could not load existing document"))?;

        Ok(names
            .iter()
            .filter_map(|name| {
                stored
                    .iter()
                    .find(|f| f.name.eq_ignore_ascii_case(name))
                    .cloned()
            })
            .collect())
    }

    fn update_fields(&self, key: &str, fields: &[DocumentField]) -> Result<()> {
        let mut inner = self.inner.write();
        let stored = inner
            .fields
            .get_mut(key)
            .ok_or_else(|| XiphosError::no_document(format!("Unknown document `{key}`")))?;

        for field in fields {
            match stored
                .iter_mut()
                .find(|f| f.name.eq_ignore_ascii_case(&field.name))
            {
                Some(existing) => existing.text = field.text.clone(),
                None => stored.push(field.clone()),
            }
        }
        Ok(())
    }

    fn allocate_id(&self) -> DocId {
        let mut inner = self.inner.write();
        inner.last_id += 1;
        inner.last_id
    }

    fn put_document(&self, doc: NewDocument, replace: bool) -> Result<Option<DocId>> {
        let mut inner = self.inner.write();

        let replaced = match inner.by_key.get(&doc.key).copied() {
            Some(_) if !replace => {
                return Err(XiphosError::generic("Document already exists"));
            }
            Some(old_id) => {
                if let Some(old) = inner.docs.get_mut(&old_id) {
                    old.deleted = true;
                }
                Some(old_id)
            }
            None => None,
        };

        match doc.fields {
            Some(fields) => {
                inner.fields.insert(doc.key.clone(), fields);
            }
            None => {
                inner.fields.remove(&doc.key);
            }
        }
        inner.by_key.insert(doc.key.clone(), doc.id);
        inner.docs.insert(
            doc.id,
            DocumentMetadata {
                id: doc.id,
                key: doc.key,
                score: doc.score,
                payload: doc.payload,
                sort_vector: doc.sort_vector,
                byte_offsets: doc.byte_offsets,
                deleted: false,
                total_tokens: doc.total_tokens,
                max_freq: doc.max_freq,
            },
        );
        Ok(replaced)
    }

    fn delete(&self, key: &str) -> Option<DocId> {
        let mut inner = self.inner.write();
        let id = inner.by_key.remove(key)?;
        inner.fields.remove(key);
        if let Some(md) = inner.docs.get_mut(&id) {
            md.deleted = true;
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn new_doc(table: &DocTable, key: &str, fields: Option<Vec<DocumentField>>) -> NewDocument {
        NewDocument {
            id: table.allocate_id(),
            key: key.to_string(),
            score: 1.0,
            payload: None,
            sort_vector: None,
            byte_offsets: None,
            total_tokens: 0,
            max_freq: 0,
            fields,
        }
    }

    #[test]
    fn test_put_and_lookup() {
        let table = DocTable::new();
        let doc = new_doc(&table, "doc:1", Some(vec![DocumentField::new("title", "hello")]));
        assert_eq!(doc.id, 1);
        assert_eq!(table.put_document(doc, false).unwrap(), None);

        assert_eq!(table.id_by_key("doc:1"), Some(1));
        assert_eq!(table.metadata(1).unwrap().key, "doc:1");
        let fields = table.load_fields("doc:1", &["TITLE", "body"]).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].text(), Some("hello"));
    }

    #[test]
    fn test_existing_key_requires_replace() {
        let table = DocTable::new();
        let first = new_doc(&table, "doc:1", None);
        table.put_document(first, false).unwrap();

        let again = new_doc(&table, "doc:1", None);
        let err = table.put_document(again.clone(), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.to_string(), "Indexing error: Document already exists");

        assert_eq!(table.put_document(again, true).unwrap(), Some(1));
        assert_eq!(table.id_by_key("doc:1"), Some(2));
        assert!(table.metadata(1).unwrap().deleted);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_document() {
        let table = DocTable::new();
        let err = table.load_fields("nope", &["title"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDocument);
        assert!(table.set_payload(9, None).is_err());
        assert!(table.delete("nope").is_none());
    }

    #[test]
    fn test_update_fields_merges_by_name() {
        let table = DocTable::new();
        let doc = new_doc(
            &table,
            "doc:1",
            Some(vec![
                DocumentField::new("title", "old"),
                DocumentField::new("price", "10"),
            ]),
        );
        table.put_document(doc, false).unwrap();

        table
            .update_fields(
                "doc:1",
                &[DocumentField::new("Price", "12"), DocumentField::new("tags", "a")],
            )
            .unwrap();

        let stored = table.stored_fields("doc:1").unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].text(), Some("12"));
    }
}
