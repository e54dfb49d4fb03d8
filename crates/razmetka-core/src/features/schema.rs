//! # Schema Features
//!
//! Context features built from windows of neighbouring tokens. A
//! [`Schema`] pairs relative offsets with the [`SchemaType`] read at each
//! offset; the resulting feature for node `i` looks like
//! `schema_S@ЕД@ИМCOMMA~*~V~`, with `*` standing in for offsets that fall
//! outside the sentence.

use serde::{Deserialize, Serialize};

use crate::features::token::Token;
use crate::features::{FeatureCalculator, PredisambiguatedData};

/// Prefix of every schema feature.
pub const SCHEMA_PREFIX: &str = "schema_";
const OUT_OF_RANGE: &str = "*";
const SEPARATOR: &str = "~";

/// What a schema reads at one offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    TokenPlusPunctuation,
    Token,
    UnitedMorphologyPlusPunctuation,
    UnitedMorphology,
    UnitedPosPlusPunctuation,
    UnitedPos,
    Punctuation,
    Empty,
}

impl SchemaType {
    /// Value of this schema type for one node.
    pub fn value(self, data: &PredisambiguatedData) -> String {
        let punctuation = || punctuation_string(&data.punctuation);
        match self {
            SchemaType::TokenPlusPunctuation => format!("{}{}", data.content, punctuation()),
            SchemaType::Token => data.content.clone(),
            SchemaType::UnitedMorphologyPlusPunctuation => {
                format!("{}{}", united_label(&data.features), punctuation())
            }
            SchemaType::UnitedMorphology => united_label(&data.features),
            SchemaType::UnitedPosPlusPunctuation => {
                format!("{}{}", united_pos(&data.features), punctuation())
            }
            SchemaType::UnitedPos => united_pos(&data.features),
            SchemaType::Punctuation => punctuation(),
            SchemaType::Empty => String::new(),
        }
    }
}

/// Name of a punctuation mark, or an empty string for marks without one.
pub fn punctuation_name(mark: &str) -> &'static str {
    match mark {
        "," => "COMMA",
        ":" => "COLON",
        "-" => "DASH",
        "." => "DOT",
        "\"" => "QUOTE",
        "?" => "QUESTION",
        "!" => "EXCLAMATION",
        "PUNCTUATION" => "PUNCTUATION",
        _ => "",
    }
}

/// Concatenated names of all marks.
pub fn punctuation_string(marks: &[String]) -> String {
    marks.iter().map(|mark| punctuation_name(mark)).collect()
}

fn join_unique<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let mut items: Vec<&str> = items.collect();
    items.sort_unstable();
    items.dedup();
    items.join("_")
}

/// Sorted, deduplicated features joined by `_`.
pub fn united_label(features: &[String]) -> String {
    join_unique(features.iter().map(String::as_str))
}

/// Like [`united_label`] over the part of each feature before the first `@`.
pub fn united_pos(features: &[String]) -> String {
    join_unique(
        features
            .iter()
            .map(|f| f.split_once('@').map_or(f.as_str(), |(pos, _)| pos)),
    )
}

/// Offsets paired with the schema type read at each of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    parts: Vec<(isize, SchemaType)>,
}

impl Schema {
    pub fn new(parts: Vec<(isize, SchemaType)>) -> Self {
        Self { parts }
    }

    /// The same schema type at every offset.
    pub fn uniform(offsets: &[isize], schema_type: SchemaType) -> Self {
        Self::new(offsets.iter().map(|&o| (o, schema_type)).collect())
    }

    /// The three schemas the Russian disambiguator is trained with.
    pub fn defaults() -> Vec<Schema> {
        use SchemaType::*;
        vec![
            Schema::uniform(&[0], UnitedMorphology),
            Schema::uniform(&[-1, 0, 1], UnitedMorphologyPlusPunctuation),
            Schema::new(vec![
                (-2, UnitedPosPlusPunctuation),
                (-1, UnitedPosPlusPunctuation),
                (0, UnitedMorphology),
                (1, UnitedPosPlusPunctuation),
                (2, UnitedPosPlusPunctuation),
            ]),
        ]
    }

    pub fn parts(&self) -> &[(isize, SchemaType)] {
        &self.parts
    }

    /// Feature of node `index` given per-type values of the whole sentence.
    fn feature(
        &self,
        index: usize,
        values: &dyn Fn(SchemaType, usize) -> String,
        len: usize,
    ) -> String {
        let mut feature = String::from(SCHEMA_PREFIX);
        for &(offset, schema_type) in &self.parts {
            match index.checked_add_signed(offset).filter(|&i| i < len) {
                Some(neighbour) => feature.push_str(&values(schema_type, neighbour)),
                None => feature.push_str(OUT_OF_RANGE),
            }
            feature.push_str(SEPARATOR);
        }
        feature
    }
}

/// Appends one schema feature per schema to the output of an inner
/// calculator.
#[derive(Debug, Clone)]
pub struct SchemaFeatureCalculator<F> {
    inner: F,
    schemas: Vec<Schema>,
}

impl<F: FeatureCalculator> SchemaFeatureCalculator<F> {
    /// Wrap `inner` with the default schemas.
    pub fn new(inner: F) -> Self {
        Self::with_schemas(inner, Schema::defaults())
    }

    pub fn with_schemas(inner: F, schemas: Vec<Schema>) -> Self {
        Self { inner, schemas }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }
}

impl<F: FeatureCalculator> FeatureCalculator for SchemaFeatureCalculator<F> {
    fn calculate_features(&self, tokens: &[Token]) -> Vec<PredisambiguatedData> {
        let mut data = self.inner.calculate_features(tokens);
        // Schema values are read from the inner features only.
        let snapshot = data.clone();
        let values = |schema_type: SchemaType, index: usize| schema_type.value(&snapshot[index]);
        for (index, node) in data.iter_mut().enumerate() {
            for schema in &self.schemas {
                node.features
                    .push(schema.feature(index, &values, snapshot.len()));
            }
        }
        data
    }
}
