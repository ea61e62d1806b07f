//! Tag postings for tag fields.

use std::collections::BTreeMap;

use crate::document::DocId;
use crate::schema::field::TagOptions;

/// Split a raw tag value into normalized tags.
///
/// Tags are separated by the field's separator, trimmed and lower-cased;
/// empty pieces are dropped. Returns `None` when no tag remains.
pub fn preprocess(opts: &TagOptions, value: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = value
        .split(opts.separator)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();

    if tags.is_empty() { None } else { Some(tags) }
}

/// Tag to document postings of one field.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    postings: BTreeMap<String, Vec<DocId>>,
}

impl TagIndex {
    /// Create an empty tag index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the tags of a document. Returns the number of postings added.
    pub fn index<S: AsRef<str>>(&mut self, tags: &[S], doc_id: DocId) -> usize {
        let mut added = 0;
        for tag in tags {
            let docs = self.postings.entry(tag.as_ref().to_string()).or_default();
            if !docs.contains(&doc_id) {
                docs.push(doc_id);
                added += 1;
            }
        }
        added
    }

    /// Remove a document from every tag. Returns the number of postings removed.
    pub fn remove_doc(&mut self, doc_id: DocId) -> usize {
        let mut removed = 0;
        self.postings.retain(|_, docs| {
            let before = docs.len();
            docs.retain(|&id| id != doc_id);
            removed += before - docs.len();
            !docs.is_empty()
        });
        removed
    }

    /// Documents carrying a tag.
    pub fn docs(&self, tag: &str) -> &[DocId] {
        self.postings.get(tag).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// All tags in lexical order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess() {
        let opts = TagOptions::default();
        assert_eq!(
            preprocess(&opts, " Rust, Search ,,INDEX "),
            Some(vec!["rust".to_string(), "search".to_string(), "index".to_string()])
        );
        assert_eq!(preprocess(&opts, " , ,"), None);

        let opts = TagOptions { separator: ';' };
        assert_eq!(preprocess(&opts, "a,b;c"), Some(vec!["a,b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_index_and_remove() {
        let mut index = TagIndex::new();
        assert_eq!(index.index(&["rust", "db"], 1), 2);
        assert_eq!(index.index(&["rust", "rust"], 2), 1);

        assert_eq!(index.docs("rust"), &[1, 2]);
        assert_eq!(index.tags().collect::<Vec<_>>(), vec!["db", "rust"]);

        assert_eq!(index.remove_doc(1), 2);
        assert_eq!(index.len(), 1);
        assert!(index.docs("db").is_empty());
    }
}
