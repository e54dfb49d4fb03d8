use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during Razmetka core operations.
#[derive(Debug, Error)]
pub enum RazmetkaError {
    /// A resource file could not be opened, read or written.
    #[error("i/o error on {path:?}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The model file could not be parsed.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The model could not be serialized.
    #[error("failed to save model: {0}")]
    ModelSave(String),

    /// A language settings file is malformed.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// The parallel sequences of a chain disagree in length.
    #[error("chain sequences differ in length: {what} has {actual} items, expected {expected}")]
    ChainLengthMismatch {
        /// Which sequence was rejected.
        what: &'static str,
        /// Length of the chain.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// A possible-state finder was built without any known label.
    #[error("label vocabulary is empty")]
    EmptyVocabulary,

    /// No settings are registered for the requested language.
    #[error("unknown language: {0:?}")]
    UnknownLanguage(String),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    RegexError(#[from] regex::Error),
}

impl RazmetkaError {
    /// Wrap an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for Razmetka operations.
pub type Result<T> = std::result::Result<T, RazmetkaError>;
