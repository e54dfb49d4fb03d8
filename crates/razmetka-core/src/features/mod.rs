//! # Feature Calculation
//!
//! Turns tokens into per-token feature sets. A [`FeatureCalculator`] is the
//! seam between tokenization and the lattice: the disambiguator only sees
//! its output.

pub mod dictionary;
pub mod schema;
pub mod token;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use dictionary::{
    Analysis, DictionaryFeatureCalculator, IdentityConverter, LexiconDictionary,
    MorphologicalDictionary, TagsetConverter,
};
pub use schema::{Schema, SchemaFeatureCalculator, SchemaType};
pub use token::{Span, Token, Tokenizer};

/// A token with its features, before disambiguation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredisambiguatedData {
    pub content: String,
    pub punctuation: Vec<String>,
    pub source: Span,
    pub is_next_space: bool,
    /// Features handed to the lattice, in emission order
    pub features: Vec<String>,
    /// Dictionary readings keyed by the model label they convert to
    pub analyses: BTreeMap<String, Vec<Analysis>>,
}

/// Produces one [`PredisambiguatedData`] per input token.
pub trait FeatureCalculator {
    fn calculate_features(&self, tokens: &[Token]) -> Vec<PredisambiguatedData>;
}

impl<F: FeatureCalculator + ?Sized> FeatureCalculator for &F {
    fn calculate_features(&self, tokens: &[Token]) -> Vec<PredisambiguatedData> {
        (**self).calculate_features(tokens)
    }
}
