//! Token types for text analysis.
//!
//! # Examples
//!
//! ```
//! use xiphos::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 2, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.position, 2);
//! assert_eq!(token.len(), 5);
//! ```

use serde::{Deserialize, Serialize};

/// A single unit of text produced by a [`Tokenizer`](super::Tokenizer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The normalized text of the token.
    pub text: String,

    /// Position in the token stream, starting at 1.
    pub position: u32,

    /// Byte offset where this token starts in the original text.
    pub start_offset: u32,

    /// Byte offset where this token ends in the original text.
    pub end_offset: u32,

    /// Stemmed form, when stemming is enabled and it differs from `text`.
    pub stem: Option<String>,
}

impl Token {
    /// Create a new token with the given text and position.
    pub fn new<S: Into<String>>(text: S, position: u32) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset: 0,
            end_offset: 0,
            stem: None,
        }
    }

    /// Create a new token with text, position, and byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: u32,
        start_offset: u32,
        end_offset: u32,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            stem: None,
        }
    }

    /// Attach a stemmed form.
    pub fn with_stem<S: Into<String>>(mut self, stem: S) -> Self {
        self.stem = Some(stem.into());
        self
    }

    /// Get the length of the token text.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A lazy, finite, non-restartable stream of tokens.
pub type TokenStream<'a> = Box<dyn Iterator<Item = Token> + Send + 'a>;
