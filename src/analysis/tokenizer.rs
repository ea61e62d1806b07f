//! Tokenizers that turn field values into token streams.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use xiphos::analysis::{StopWords, TokenizeOptions, Tokenizer, TokenizerFactory};
//!
//! let tokenizer = TokenizerFactory::get("english", Arc::new(StopWords::english()));
//! let tokens: Vec<_> = tokenizer
//!     .start("The quick foxes", TokenizeOptions::empty())
//!     .collect();
//!
//! assert_eq!(tokens.len(), 2);
//! assert_eq!(tokens[0].text, "quick");
//! assert_eq!(tokens[0].position, 1);
//! assert_eq!(tokens[1].stem.as_deref(), Some("fox"));
//! ```

use std::sync::Arc;

use bitflags::bitflags;
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::stemmer::{Stemmer, SuffixStemmer};
use crate::analysis::stopwords::StopWords;
use crate::analysis::token::{Token, TokenStream};

/// Default document language.
pub const DEFAULT_LANGUAGE: &str = "english";

bitflags! {
    /// Per-field switches passed to [`Tokenizer::start`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TokenizeOptions: u32 {
        /// Do not produce stemmed forms.
        const NO_STEM = 1 << 0;
        /// Request phonetic forms. The standard tokenizer does not produce
        /// them.
        const PHONETICS = 1 << 1;
    }
}

/// Trait for tokenizers used by the full-text preprocessor.
///
/// The trait requires `Send + Sync` so one tokenizer can be shared between
/// jobs running on different worker threads.
pub trait Tokenizer: Send + Sync {
    /// Start tokenizing `text`.
    ///
    /// Positions of the returned tokens start at 1 and increase by one per
    /// emitted token.
    fn start<'a>(&'a self, text: &'a str, options: TokenizeOptions) -> TokenStream<'a>;

    /// Language this tokenizer was created for.
    fn language(&self) -> &str;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Unicode word tokenizer with lower-casing, stop words and optional
/// stemming.
pub struct StandardTokenizer {
    language: String,
    stopwords: Arc<StopWords>,
    stemmer: Option<Arc<dyn Stemmer>>,
}

impl std::fmt::Debug for StandardTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardTokenizer")
            .field("language", &self.language)
            .field("stopwords", &self.stopwords.len())
            .field("stemmer", &self.stemmer.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl StandardTokenizer {
    /// Create a new standard tokenizer.
    pub fn new<S: Into<String>>(
        language: S,
        stopwords: Arc<StopWords>,
        stemmer: Option<Arc<dyn Stemmer>>,
    ) -> Self {
        StandardTokenizer {
            language: language.into(),
            stopwords,
            stemmer,
        }
    }
}

impl Tokenizer for StandardTokenizer {
    fn start<'a>(&'a self, text: &'a str, options: TokenizeOptions) -> TokenStream<'a> {
        let stemmer = if options.contains(TokenizeOptions::NO_STEM) {
            None
        } else {
            self.stemmer.as_deref()
        };
        let stopwords = &*self.stopwords;
        let mut position = 0u32;

        Box::new(text.unicode_word_indices().filter_map(move |(start, word)| {
            let normalized = word.to_lowercase();
            if stopwords.contains(&normalized) {
                return None;
            }
            position += 1;

            let end = start + word.len();
            let mut token =
                Token::with_offsets(normalized, position, start as u32, end as u32);
            if let Some(stemmer) = stemmer {
                let stem = stemmer.stem(&token.text);
                if stem != token.text {
                    token = token.with_stem(stem);
                }
            }
            Some(token)
        }))
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

/// Creates the tokenizer a job uses for its document language.
pub struct TokenizerFactory;

impl TokenizerFactory {
    /// Get a tokenizer for `language`.
    ///
    /// English (or an empty language) gets the suffix stemmer; other
    /// languages are tokenized without stemming.
    pub fn get(language: &str, stopwords: Arc<StopWords>) -> Arc<dyn Tokenizer> {
        let language = if language.is_empty() {
            DEFAULT_LANGUAGE
        } else {
            language
        };
        let stemmer: Option<Arc<dyn Stemmer>> = if language.eq_ignore_ascii_case(DEFAULT_LANGUAGE)
        {
            Some(Arc::new(SuffixStemmer::new()))
        } else {
            None
        };
        Arc::new(StandardTokenizer::new(
            language.to_lowercase(),
            stopwords,
            stemmer,
        ))
    }
}
