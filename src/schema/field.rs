//! Field definitions for schema entries.

use std::fmt;

use bitflags::bitflags;

use crate::analysis::tokenizer::TokenizeOptions;

/// Default separator for tag fields.
pub const DEFAULT_TAG_SEPARATOR: char = ',';

/// The kind of index structure a field feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Tokenized text written through the forward index.
    FullText,
    /// Floating-point value stored in a numeric range tree.
    Numeric,
    /// Separator-delimited tags stored in tag postings.
    Tag,
    /// `lon,lat` coordinate pair stored in geo postings.
    Geo,
}

impl FieldType {
    /// Get a human-readable name for the field type.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::FullText => "TEXT",
            FieldType::Numeric => "NUMERIC",
            FieldType::Tag => "TAG",
            FieldType::Geo => "GEO",
        }
    }

    /// Whether values of this type count towards the offload threshold.
    pub fn is_tokenized(&self) -> bool {
        matches!(self, FieldType::FullText | FieldType::Tag)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

bitflags! {
    /// Per-field schema flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldOptions: u32 {
        /// Value is kept in the document's sorting vector.
        const SORTABLE = 1 << 0;
        /// Value is not written to any index structure.
        const NOT_INDEXABLE = 1 << 1;
        /// Full-text value is tokenized without stemming.
        const NO_STEM = 1 << 2;
        /// Full-text value is tokenized with phonetic forms.
        const PHONETICS = 1 << 3;
    }
}

/// Options of full-text fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOptions {
    /// Bit position of the field in term field masks.
    pub id: u16,
    /// Weight multiplied into every posting of the field.
    pub weight: f64,
}

impl Default for TextOptions {
    fn default() -> Self {
        TextOptions { id: 0, weight: 1.0 }
    }
}

/// Options of tag fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagOptions {
    /// Character separating tags in the raw value.
    pub separator: char,
}

impl Default for TagOptions {
    fn default() -> Self {
        TagOptions {
            separator: DEFAULT_TAG_SEPARATOR,
        }
    }
}

/// Schema entry for one named field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Position of the field in the schema.
    pub index: usize,
    /// Field type.
    pub field_type: FieldType,
    /// Flags.
    pub options: FieldOptions,
    /// Full-text options, meaningful for [`FieldType::FullText`].
    pub text_opts: TextOptions,
    /// Tag options, meaningful for [`FieldType::Tag`].
    pub tag_opts: TagOptions,
    /// Slot in the sorting vector, set for sortable fields.
    pub sort_idx: Option<usize>,
}

impl FieldSpec {
    /// Create a field spec. Index, text id and sort slot are assigned by the
    /// [`SchemaBuilder`](super::SchemaBuilder).
    pub fn new<S: Into<String>>(name: S, field_type: FieldType) -> Self {
        FieldSpec {
            name: name.into(),
            index: 0,
            field_type,
            options: FieldOptions::empty(),
            text_opts: TextOptions::default(),
            tag_opts: TagOptions::default(),
            sort_idx: None,
        }
    }

    /// Full-text field.
    pub fn text<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::FullText)
    }

    /// Numeric field.
    pub fn numeric<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Numeric)
    }

    /// Tag field.
    pub fn tag<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Tag)
    }

    /// Geo field.
    pub fn geo<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Geo)
    }

    /// Mark the field sortable.
    pub fn sortable(mut self) -> Self {
        self.options |= FieldOptions::SORTABLE;
        self
    }

    /// Exclude the field from all index structures.
    pub fn no_index(mut self) -> Self {
        self.options |= FieldOptions::NOT_INDEXABLE;
        self
    }

    /// Disable stemming.
    pub fn no_stem(mut self) -> Self {
        self.options |= FieldOptions::NO_STEM;
        self
    }

    /// Enable phonetic matching.
    pub fn phonetic(mut self) -> Self {
        self.options |= FieldOptions::PHONETICS;
        self
    }

    /// Set the full-text weight.
    pub fn weight(mut self, weight: f64) -> Self {
        self.text_opts.weight = weight;
        self
    }

    /// Set the tag separator.
    pub fn separator(mut self, separator: char) -> Self {
        self.tag_opts.separator = separator;
        self
    }

    pub fn is_sortable(&self) -> bool {
        self.options.contains(FieldOptions::SORTABLE)
    }

    pub fn is_indexable(&self) -> bool {
        !self.options.contains(FieldOptions::NOT_INDEXABLE)
    }

    pub fn is_no_stem(&self) -> bool {
        self.options.contains(FieldOptions::NO_STEM)
    }

    pub fn is_phonetic(&self) -> bool {
        self.options.contains(FieldOptions::PHONETICS)
    }

    /// Tokenizer switches derived from the field flags.
    pub fn tokenize_options(&self) -> TokenizeOptions {
        let mut options = TokenizeOptions::empty();
        if self.is_no_stem() {
            options |= TokenizeOptions::NO_STEM;
        }
        if self.is_phonetic() {
            options |= TokenizeOptions::PHONETICS;
        }
        options
    }
}
