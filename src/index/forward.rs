//! Per-document forward index.
//!
//! The forward index accumulates the postings of the document currently
//! being indexed: one entry per distinct term with the fields it occurred
//! in, its frequency, its summed field weight and its positions. Pooled
//! contexts [`reset`](ForwardIndex::reset) it between documents instead of
//! allocating a new one.

use ahash::AHashMap;

use crate::analysis::token::Token;

/// Prefix marking stemmed terms.
pub const STEM_PREFIX: char = '+';

/// Postings of one term within one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardIndexEntry {
    /// The term.
    pub term: String,
    /// Bit set of text field ids the term occurred in.
    pub field_mask: u64,
    /// Number of occurrences.
    pub freq: u32,
    /// Sum of the field weights of all occurrences.
    pub weighted_freq: f64,
    /// Token positions, in insertion order.
    pub positions: Vec<u32>,
}

/// Accumulator of the current document's postings.
#[derive(Debug, Default)]
pub struct ForwardIndex {
    lookup: AHashMap<String, usize>,
    entries: Vec<ForwardIndexEntry>,
    max_freq: u32,
    total_tokens: u32,
}

impl ForwardIndex {
    /// Create an empty forward index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one token of a text field.
    ///
    /// The stemmed form, if present, is recorded as a separate
    /// `+stem` term at the same position.
    pub fn add_token(&mut self, field_id: u16, weight: f64, token: &Token) {
        self.total_tokens += 1;
        self.add_term(&token.text, field_id, weight, token.position);
        if let Some(stem) = &token.stem {
            let term = format!("{STEM_PREFIX}{stem}");
            self.add_term(&term, field_id, weight, token.position);
        }
    }

    fn add_term(&mut self, term: &str, field_id: u16, weight: f64, position: u32) {
        let idx = match self.lookup.get(term) {
            Some(&idx) => idx,
            None => {
                self.entries.push(ForwardIndexEntry {
                    term: term.to_string(),
                    field_mask: 0,
                    freq: 0,
                    weighted_freq: 0.0,
                    positions: Vec::new(),
                });
                self.lookup.insert(term.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[idx];
        entry.field_mask |= 1u64 << (field_id as u32 % 64);
        entry.freq += 1;
        entry.weighted_freq += weight;
        entry.positions.push(position);
        self.max_freq = self.max_freq.max(entry.freq);
    }

    /// Look up the entry of a term.
    pub fn get(&self, term: &str) -> Option<&ForwardIndexEntry> {
        self.lookup.get(term).map(|&idx| &self.entries[idx])
    }

    /// Entries in first-occurrence order.
    pub fn entries(&self) -> &[ForwardIndexEntry] {
        &self.entries
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no term was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest frequency of any term.
    pub fn max_freq(&self) -> u32 {
        self.max_freq
    }

    /// Number of tokens recorded, stems excluded.
    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    /// Clear all entries, keeping the allocations for the next document.
    pub fn reset(&mut self) {
        self.lookup.clear();
        self.entries.clear();
        self.max_freq = 0;
        self.total_tokens = 0;
    }

    /// Capacity of the entry buffer.
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_terms_across_fields() {
        let mut fwd = ForwardIndex::new();
        fwd.add_token(0, 1.0, &Token::new("rust", 1));
        fwd.add_token(0, 1.0, &Token::new("book", 2));
        fwd.add_token(3, 2.0, &Token::new("rust", 3));

        assert_eq!(fwd.len(), 2);
        let rust = fwd.get("rust").unwrap();
        assert_eq!(rust.freq, 2);
        assert_eq!(rust.field_mask, 0b1001);
        assert_eq!(rust.weighted_freq, 3.0);
        assert_eq!(rust.positions, vec![1, 3]);
        assert_eq!(fwd.max_freq(), 2);
        assert_eq!(fwd.total_tokens(), 3);
    }

    #[test]
    fn test_stems_share_position() {
        let mut fwd = ForwardIndex::new();
        fwd.add_token(0, 1.0, &Token::new("books", 1).with_stem("book"));

        assert_eq!(fwd.get("books").unwrap().positions, vec![1]);
        assert_eq!(fwd.get("+book").unwrap().positions, vec![1]);
        assert_eq!(fwd.total_tokens(), 1);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut fwd = ForwardIndex::new();
        for i in 0..32 {
            fwd.add_token(0, 1.0, &Token::new(format!("t{i}"), i + 1));
        }
        let capacity = fwd.capacity();

        fwd.reset();
        assert!(fwd.is_empty());
        assert_eq!(fwd.max_freq(), 0);
        assert_eq!(fwd.capacity(), capacity);
    }
}
