//! Text analysis used by the full-text preprocessor.
//!
//! The pipeline only needs a small contract from this module: given a field
//! value and a set of [`TokenizeOptions`], a [`Tokenizer`] yields a lazy,
//! finite sequence of [`Token`]s with 1-based positions and byte offsets.
//!
//! - [`token`] - Token type and token stream alias
//! - [`tokenizer`] - The tokenizer trait, the standard tokenizer and its factory
//! - [`stemmer`] - Suffix stemming applied unless a field disables it
//! - [`stopwords`] - Shared, read-only stop-word lists

pub mod stemmer;
pub mod stopwords;
pub mod token;
pub mod tokenizer;

pub use stopwords::StopWords;
pub use token::{Token, TokenStream};
pub use tokenizer::{StandardTokenizer, TokenizeOptions, Tokenizer, TokenizerFactory};
