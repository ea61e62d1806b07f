//! Stop-word lists.
//!
//! A schema owns one [`StopWords`] list behind an `Arc`; every indexing job
//! borrows it read-only through its tokenizer.

use ahash::AHashSet;

/// Default English stop words.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "is", "the", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in",
    "into", "it", "no", "not", "of", "on", "or", "such", "that", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// A set of lower-cased words that are never indexed.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: AHashSet<String>,
}

impl StopWords {
    /// Create a stop-word list from the given words.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StopWords {
            words: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// The default English list.
    pub fn english() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().copied())
    }

    /// An empty list.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check whether a (lower-cased) word is a stop word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
