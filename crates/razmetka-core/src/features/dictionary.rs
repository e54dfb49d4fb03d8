//! # Dictionary Features
//!
//! Feature calculation backed by a morphological dictionary. Every token is
//! classified in priority order:
//!
//! 1. frequent token: a single `__token__` marker, matched later against the
//!    exception lexicon,
//! 2. number: `NUM`,
//! 3. token with Latin letters: `NID`,
//! 4. otherwise the converted dictionary tags.
//!
//! Dictionary analyses are recorded for every token regardless of the class,
//! so lemmas stay available after disambiguation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alphabet::Alphabet;
use crate::error::{RazmetkaError, Result};
use crate::features::schema::punctuation_name;
use crate::features::token::Token;
use crate::features::{FeatureCalculator, PredisambiguatedData};
use crate::states::normalize_feature;

/// Feature emitted for numeric tokens.
pub const NUMBER_FEATURE: &str = "NUM";
/// Feature emitted for tokens containing Latin letters.
pub const FOREIGN_FEATURE: &str = "NID";
/// Feature emitted for capitalized tokens that do not open the sentence.
pub const UPPER_FEATURE: &str = "IS_UPPER";

/// One dictionary reading of a surface form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub lemma: String,
    /// Tag in the dictionary's own tagset
    pub tag: String,
    pub lemma_id: usize,
}

impl Analysis {
    /// Grammemes of the tag, the part of speech first.
    pub fn grammemes(&self) -> impl Iterator<Item = &str> {
        self.tag.split('@').filter(|g| !g.is_empty())
    }
}

/// Source of morphological readings.
pub trait MorphologicalDictionary {
    /// All readings of `surface`. Unknown words yield an empty list.
    fn lookup(&self, surface: &str) -> Vec<Analysis>;
}

/// Maps a dictionary tag to zero or more model labels.
pub trait TagsetConverter {
    fn partial_convert(&self, tag: &str) -> Vec<String>;
}

/// Converter for dictionaries that already speak the model's tagset.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl TagsetConverter for IdentityConverter {
    fn partial_convert(&self, tag: &str) -> Vec<String> {
        if tag.is_empty() {
            Vec::new()
        } else {
            vec![tag.to_string()]
        }
    }
}

/// In-memory dictionary read from `surface<TAB>lemma<TAB>tag` lines.
///
/// Surfaces are stored lower-cased; lemma ids are dense in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct LexiconDictionary {
    entries: HashMap<String, Vec<Analysis>>,
    lemmas: Alphabet,
}

impl LexiconDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one reading.
    pub fn insert(&mut self, surface: &str, lemma: &str, tag: &str) {
        let lemma_id = self.lemmas.lookup_or_insert(lemma);
        self.entries
            .entry(surface.to_lowercase())
            .or_default()
            .push(Analysis {
                lemma: lemma.to_string(),
                tag: tag.to_string(),
                lemma_id,
            });
    }

    /// Parse dictionary text. Lines without exactly three fields are skipped.
    pub fn parse(text: &str) -> Self {
        let mut dictionary = Self::new();
        for line in text.lines() {
            let fields: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
            if let [surface, lemma, tag] = fields.as_slice() {
                dictionary.insert(surface, lemma, tag);
            }
        }
        dictionary
    }

    /// Load a dictionary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| RazmetkaError::io(path, e))?;
        let dictionary = Self::parse(&text);
        debug!(
            path = %path.display(),
            surfaces = dictionary.len(),
            lemmas = dictionary.lemmas.len(),
            "loaded dictionary"
        );
        Ok(dictionary)
    }

    /// Number of distinct surface forms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MorphologicalDictionary for LexiconDictionary {
    fn lookup(&self, surface: &str) -> Vec<Analysis> {
        self.entries
            .get(&surface.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

/// Whether `token` is a number, possibly with `.` or `,` separators.
pub fn is_number(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

pub fn contains_latin(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic())
}

/// Feature calculator over a [`MorphologicalDictionary`].
#[derive(Debug, Clone)]
pub struct DictionaryFeatureCalculator<D, C = IdentityConverter> {
    dictionary: D,
    converter: C,
    frequent_tokens: HashSet<String>,
}

impl<D: MorphologicalDictionary> DictionaryFeatureCalculator<D, IdentityConverter> {
    pub fn new(dictionary: D) -> Self {
        Self::with_converter(dictionary, IdentityConverter)
    }
}

impl<D: MorphologicalDictionary, C: TagsetConverter> DictionaryFeatureCalculator<D, C> {
    pub fn with_converter(dictionary: D, converter: C) -> Self {
        Self {
            dictionary,
            converter,
            frequent_tokens: HashSet::new(),
        }
    }

    /// Mark tokens whose labels are resolved by the exception lexicon.
    pub fn with_frequent_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.frequent_tokens
            .extend(tokens.into_iter().map(|t| t.as_ref().to_lowercase()));
        self
    }

    pub fn dictionary(&self) -> &D {
        &self.dictionary
    }

    fn token_features(&self, token: &Token, index: usize) -> PredisambiguatedData {
        let lowered = token.content.to_lowercase();
        let mut features = Vec::new();

        let evaluated = if self.frequent_tokens.contains(&lowered) {
            features.push(format!("__{lowered}__"));
            true
        } else if is_number(&lowered) {
            features.push(NUMBER_FEATURE.to_string());
            true
        } else if contains_latin(&lowered) {
            features.push(FOREIGN_FEATURE.to_string());
            true
        } else {
            false
        };

        let mut analyses: BTreeMap<String, Vec<Analysis>> = BTreeMap::new();
        for analysis in self.dictionary.lookup(&lowered) {
            for label in self.converter.partial_convert(&analysis.tag) {
                analyses
                    .entry(normalize_feature(&label))
                    .or_default()
                    .push(analysis.clone());
                if !evaluated && !features.contains(&label) {
                    features.push(label);
                }
            }
        }

        for mark in &token.punctuation {
            let name = punctuation_name(mark);
            if !name.is_empty() {
                features.push(name.to_string());
            }
        }

        if index > 0 && token.content.chars().next().is_some_and(char::is_uppercase) {
            features.push(UPPER_FEATURE.to_string());
        }

        PredisambiguatedData {
            content: token.content.clone(),
            punctuation: token.punctuation.clone(),
            source: token.source,
            is_next_space: token.is_next_space,
            features,
            analyses,
        }
    }
}

impl<D: MorphologicalDictionary, C: TagsetConverter> FeatureCalculator
    for DictionaryFeatureCalculator<D, C>
{
    fn calculate_features(&self, tokens: &[Token]) -> Vec<PredisambiguatedData> {
        tokens
            .iter()
            .enumerate()
            .map(|(index, token)| self.token_features(token, index))
            .collect()
    }
}
