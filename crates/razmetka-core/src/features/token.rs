//! # Tokens
//!
//! Surface tokens handed to the feature calculators, and a whitespace
//! tokenizer that peels trailing punctuation off each word.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Byte span of a token in the original text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

/// A token as produced by tokenization. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token text content
    pub content: String,
    /// Punctuation marks that followed the token, in order
    pub punctuation: Vec<String>,
    /// Position in the original string
    pub source: Span,
    /// Whether whitespace followed the token in the original string
    pub is_next_space: bool,
}

impl Token {
    /// Create a token without punctuation.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let len = content.len();
        Self {
            content,
            punctuation: Vec::new(),
            source: Span { start: 0, len },
            is_next_space: true,
        }
    }

    /// Attach trailing punctuation marks.
    pub fn with_punctuation<I, S>(mut self, marks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.punctuation = marks.into_iter().map(Into::into).collect();
        self
    }
}

/// Whitespace tokenizer that moves trailing punctuation into
/// [`Token::punctuation`].
#[derive(Debug, Clone)]
pub struct Tokenizer {
    trailing: Regex,
}

impl Tokenizer {
    /// Create a new tokenizer instance.
    pub fn new() -> Result<Self> {
        Ok(Self {
            trailing: Regex::new(r"^(?s)(.*?)(\p{P}*)$")?,
        })
    }

    /// Tokenize one sentence.
    ///
    /// A word made only of punctuation is attached to the preceding token
    /// when there is one.
    ///
    /// # Examples
    /// ```
    /// use razmetka_core::features::Tokenizer;
    ///
    /// let tokens = Tokenizer::new().unwrap().tokenize("Кот, бежит!");
    /// assert_eq!(tokens[0].content, "Кот");
    /// assert_eq!(tokens[0].punctuation, [","]);
    /// assert_eq!(tokens[1].punctuation, ["!"]);
    /// ```
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut offset = 0;
        for word in text.split_whitespace() {
            let start = offset + text[offset..].find(word).unwrap_or(0);
            offset = start + word.len();
            let is_next_space = offset < text.len();

            let (content, marks) = match self.trailing.captures(word) {
                Some(caps) => (
                    caps.get(1).map_or("", |m| m.as_str()),
                    caps.get(2).map_or("", |m| m.as_str()),
                ),
                None => (word, ""),
            };
            let punctuation: Vec<String> = marks.chars().map(String::from).collect();

            if content.is_empty() {
                if let Some(previous) = tokens.last_mut() {
                    previous.punctuation.extend(punctuation);
                    previous.is_next_space = is_next_space;
                    continue;
                }
            }
            let content = if content.is_empty() { word } else { content };
            tokens.push(Token {
                content: content.to_string(),
                punctuation: if content == word { Vec::new() } else { punctuation },
                source: Span {
                    start,
                    len: content.len(),
                },
                is_next_space,
            });
        }
        tokens
    }
}
