//! Persistent full-text postings.
//!
//! The forward index of a document is merged here as a whole once all of
//! the document's other structures were committed.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::document::DocId;
use crate::error::Result;
use crate::index::forward::ForwardIndex;
use crate::index::offsets::ByteOffsets;

/// Receiver of a document's complete forward index.
pub trait ForwardIndexSink: Send + Sync {
    /// Merge the postings of `doc_id` into the persistent index.
    fn commit(
        &self,
        doc_id: DocId,
        forward: &ForwardIndex,
        offsets: Option<&ByteOffsets>,
    ) -> Result<()>;

    /// Remove every posting of `doc_id`. Returns the number removed.
    fn remove_doc(&self, doc_id: DocId) -> usize;
}

/// Posting of one term in one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    /// Document id.
    pub doc_id: DocId,
    /// Text fields the term occurred in.
    pub field_mask: u64,
    /// Term frequency.
    pub freq: u32,
    /// Token positions.
    pub positions: Vec<u32>,
}

#[derive(Debug, Default)]
struct FullTextInner {
    terms: BTreeMap<String, Vec<Posting>>,
    /// Serialized byte offsets per document.
    docs: BTreeMap<DocId, Option<Vec<u8>>>,
}

/// In-memory inverted index of full-text fields.
#[derive(Debug, Default)]
pub struct FullTextIndex {
    inner: RwLock<FullTextInner>,
}

impl FullTextIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Postings of a term, ordered by doc id.
    pub fn postings(&self, term: &str) -> Vec<Posting> {
        self.inner
            .read()
            .terms
            .get(term)
            .cloned()
            .unwrap_or_default()
    }

    /// Documents containing a term.
    pub fn docs(&self, term: &str) -> Vec<DocId> {
        self.inner
            .read()
            .terms
            .get(term)
            .map(|postings| postings.iter().map(|p| p.doc_id).collect())
            .unwrap_or_default()
    }

    /// Byte offsets stored for a document.
    pub fn byte_offsets(&self, doc_id: DocId) -> Result<Option<ByteOffsets>> {
        let inner = self.inner.read();
        match inner.docs.get(&doc_id) {
            Some(Some(bytes)) => ByteOffsets::read_from(&mut bytes.as_slice()).map(Some),
            _ => Ok(None),
        }
    }

    /// Number of documents with committed postings.
    pub fn doc_count(&self) -> usize {
        self.inner.read().docs.len()
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.inner.read().terms.len()
    }
}

impl ForwardIndexSink for FullTextIndex {
    fn commit(
        &self,
        doc_id: DocId,
        forward: &ForwardIndex,
        offsets: Option<&ByteOffsets>,
    ) -> Result<()> {
        let encoded = match offsets {
            Some(offsets) => {
                let mut buf = Vec::with_capacity(offsets.offsets().byte_len() + 16);
                offsets.write_to(&mut buf)?;
                Some(buf)
            }
            None => None,
        };

        let mut inner = self.inner.write();
        for entry in forward.entries() {
            let postings = inner.terms.entry(entry.term.clone()).or_default();
            let posting = Posting {
                doc_id,
                field_mask: entry.field_mask,
                freq: entry.freq,
                positions: entry.positions.clone(),
            };
            match postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
                Ok(pos) => postings[pos] = posting,
                Err(pos) => postings.insert(pos, posting),
            }
        }
        inner.docs.insert(doc_id, encoded);
        Ok(())
    }

    fn remove_doc(&self, doc_id: DocId) -> usize {
        let mut inner = self.inner.write();
        let mut removed = 0;
        inner.terms.retain(|_, postings| {
            let before = postings.len();
            postings.retain(|p| p.doc_id != doc_id);
            removed += before - postings.len();
            !postings.is_empty()
        });
        inner.docs.remove(&doc_id);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    fn forward(words: &[&str]) -> ForwardIndex {
        let mut fwd = ForwardIndex::new();
        for (i, word) in words.iter().enumerate() {
            fwd.add_token(0, 1.0, &Token::new(*word, i as u32 + 1));
        }
        fwd
    }

    #[test]
    fn test_commit_and_lookup() {
        let index = FullTextIndex::new();
        index.commit(2, &forward(&["rust", "search"]), None).unwrap();
        index.commit(1, &forward(&["rust", "rust"]), None).unwrap();

        assert_eq!(index.docs("rust"), vec![1, 2]);
        assert_eq!(index.postings("rust")[0].freq, 2);
        assert_eq!(index.postings("rust")[0].positions, vec![1, 2]);
        assert_eq!(index.doc_count(), 2);
        assert_eq!(index.term_count(), 2);
    }

    #[test]
    fn test_remove_doc() {
        let index = FullTextIndex::new();
        index.commit(1, &forward(&["rust", "search"]), None).unwrap();
        index.commit(2, &forward(&["rust"]), None).unwrap();

        assert_eq!(index.remove_doc(1), 2);
        assert_eq!(index.docs("rust"), vec![2]);
        assert!(index.docs("search").is_empty());
        assert_eq!(index.doc_count(), 1);
    }

    #[test]
    fn test_stores_byte_offsets() {
        let index = FullTextIndex::new();
        let mut offsets = ByteOffsets::new();
        let slot = offsets.add_field(0, 1);
        offsets.record(0);
        offsets.finish_field(slot, 1);

        index.commit(7, &forward(&["hello"]), Some(&offsets)).unwrap();
        assert_eq!(index.byte_offsets(7).unwrap(), Some(offsets));
        assert_eq!(index.byte_offsets(8).unwrap(), None);
    }
}
