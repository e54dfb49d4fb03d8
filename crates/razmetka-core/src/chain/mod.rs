//! # Chain
//!
//! The lattice representation of one sentence: per position a token, a
//! sparse feature set, an optional gold label and the admissible label set
//! used to prune decoding. All four sequences always share one length.

pub mod reader;

pub use reader::{read_chains, ChainReader};

use crate::error::{RazmetkaError, Result};

/// One sentence turned into a taggable lattice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    tokens: Vec<String>,
    features: Vec<Vec<String>>,
    labels: Vec<String>,
    possible_states: Vec<Vec<String>>,
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RazmetkaError::ChainLengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

impl Chain {
    /// Build a chain from parallel token, feature and label data.
    ///
    /// # Errors
    /// Returns [`RazmetkaError::ChainLengthMismatch`] if the sequences differ in length.
    pub fn new(
        tokens: Vec<String>,
        features: Vec<Vec<String>>,
        labels: Vec<String>,
    ) -> Result<Self> {
        check_len("features", tokens.len(), features.len())?;
        check_len("labels", tokens.len(), labels.len())?;
        let possible_states = vec![Vec::new(); tokens.len()];
        Ok(Self {
            tokens,
            features,
            labels,
            possible_states,
        })
    }

    /// Build a chain without gold labels (every label is the empty string).
    pub fn unlabeled(tokens: Vec<String>, features: Vec<Vec<String>>) -> Result<Self> {
        let labels = vec![String::new(); tokens.len()];
        Self::new(tokens, features, labels)
    }

    /// Append one position.
    pub fn push(&mut self, token: String, features: Vec<String>, label: String) {
        self.tokens.push(token);
        self.features.push(features);
        self.labels.push(label);
        self.possible_states.push(Vec::new());
    }

    /// Add one feature to the position at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn add_feature(&mut self, index: usize, feature: String) {
        self.features[index].push(feature);
    }

    /// Replace the admissible label sets of every position.
    pub fn set_possible_states(&mut self, possible_states: Vec<Vec<String>>) -> Result<()> {
        check_len("possible states", self.len(), possible_states.len())?;
        self.possible_states = possible_states;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn features(&self) -> &[Vec<String>] {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn possible_states(&self) -> &[Vec<String>] {
        &self.possible_states
    }

    /// Whether every position carries a non-empty gold label.
    pub fn is_labeled(&self) -> bool {
        !self.labels.is_empty() && self.labels.iter().all(|label| !label.is_empty())
    }
}
