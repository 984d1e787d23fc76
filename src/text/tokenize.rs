//! Word tokenization.

use serde::{Deserialize, Serialize};

use super::stop_words::is_english_stop_word;

/// Splits text into terms.
///
/// A token is a maximal run of alphanumeric or `_` characters at least
/// `min_token_len` characters long. Stop words are dropped after lowercasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenizer {
    lowercase: bool,
    stop_words: bool,
    min_token_len: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            lowercase: true,
            stop_words: true,
            min_token_len: 2,
        }
    }
}

impl Tokenizer {
    /// Default tokenizer: lowercase, English stop words, tokens of 2+ chars.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle lowercasing.
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    /// Toggle English stop-word removal.
    pub fn with_stop_words(mut self, stop_words: bool) -> Self {
        self.stop_words = stop_words;
        self
    }

    /// Set the minimum token length in characters.
    pub fn with_min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len.max(1);
        self
    }

    /// Tokenize one document.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= self.min_token_len)
            .map(|t| {
                if self.lowercase {
                    t.to_lowercase()
                } else {
                    t.to_string()
                }
            })
            .filter(|t| !(self.stop_words && is_english_stop_word(t)))
            .collect()
    }
}
