//! Sorting vectors.
//!
//! A sorting vector keeps one typed value per sortable field of the schema,
//! so results can be ordered without loading documents. Strings are stored
//! lower-cased.

use std::cmp::Ordering;
use std::sync::Arc;

/// A value held in a sorting vector slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SortableValue {
    /// Empty slot.
    #[default]
    Null,
    /// Normalized string value.
    Str(Arc<str>),
    /// Numeric value.
    Num(f64),
}

impl SortableValue {
    /// Build a string value, normalizing it for sorting.
    pub fn string(value: &str) -> Self {
        SortableValue::Str(Arc::from(value.to_lowercase()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SortableValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SortableValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            SortableValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Order two values; `Null` sorts last, numbers before strings.
    pub fn compare(&self, other: &SortableValue) -> Ordering {
        match (self, other) {
            (SortableValue::Num(a), SortableValue::Num(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (SortableValue::Str(a), SortableValue::Str(b)) => a.cmp(b),
            (SortableValue::Null, SortableValue::Null) => Ordering::Equal,
            (SortableValue::Null, _) => Ordering::Greater,
            (_, SortableValue::Null) => Ordering::Less,
            (SortableValue::Num(_), SortableValue::Str(_)) => Ordering::Less,
            (SortableValue::Str(_), SortableValue::Num(_)) => Ordering::Greater,
        }
    }
}

/// Fixed-size vector of sortable values, indexed by schema sort slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortingVector {
    values: Vec<SortableValue>,
}

impl SortingVector {
    /// Create a vector with `len` empty slots.
    pub fn new(len: usize) -> Self {
        SortingVector {
            values: vec![SortableValue::Null; len],
        }
    }

    /// Store a string. Out-of-range slots are ignored.
    pub fn put_str(&mut self, idx: usize, value: &str) {
        if let Some(slot) = self.values.get_mut(idx) {
            *slot = SortableValue::string(value);
        }
    }

    /// Store a number. Out-of-range slots are ignored.
    pub fn put_num(&mut self, idx: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(idx) {
            *slot = SortableValue::Num(value);
        }
    }

    /// Get the value of a slot.
    pub fn get(&self, idx: usize) -> Option<&SortableValue> {
        self.values.get(idx)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
