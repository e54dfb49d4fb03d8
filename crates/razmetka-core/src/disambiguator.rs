//! # Disambiguator
//!
//! End-to-end tagging of a tokenized sentence: features, lattice, decode,
//! then a per-language post rule on every label.

use serde::{Deserialize, Serialize};

use crate::applier::CrfApplier;
use crate::chain::Chain;
use crate::crf::{CrfModel, Decoder};
use crate::error::Result;
use crate::features::{Analysis, FeatureCalculator, Span, Token};

/// Leading grammemes that make an analysis a verb form. Matched as prefixes
/// except for the tagset code `V`.
const VERB_GRAMMEMES: [&str; 2] = ["глагол", "причастие"];
const VERB_CODE: &str = "V";
const TRANSITIVE_GRAMMEMES: [&str; 2] = ["переходный", "PEREH"];
pub const TRANSITIVE_SUFFIX: &str = "@ПЕРЕХ";
pub const INTRANSITIVE_SUFFIX: &str = "@НЕПЕРЕХ";

/// Label rewrite applied after decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostRule {
    #[default]
    None,
    /// Restore verb transitivity that the model's tagset does not carry.
    Transitivity,
}

fn is_verb(analysis: &Analysis) -> bool {
    analysis.grammemes().next().is_some_and(|pos| {
        pos == VERB_CODE || VERB_GRAMMEMES.iter().any(|verb| pos.starts_with(verb))
    })
}

fn is_transitive(analysis: &Analysis) -> bool {
    analysis
        .grammemes()
        .any(|g| TRANSITIVE_GRAMMEMES.contains(&g))
}

impl PostRule {
    /// Rewrite `label` given the dictionary analysis chosen for its token.
    ///
    /// With [`PostRule::Transitivity`], a label whose analysis is a verb or
    /// participle always gains exactly one of `@ПЕРЕХ` and `@НЕПЕРЕХ`.
    /// Tokens without an analysis keep their label.
    pub fn apply(self, label: &str, analysis: Option<&Analysis>) -> String {
        match (self, analysis) {
            (PostRule::Transitivity, Some(analysis)) if is_verb(analysis) => {
                if is_transitive(analysis) {
                    format!("{label}{TRANSITIVE_SUFFIX}")
                } else {
                    format!("{label}{INTRANSITIVE_SUFFIX}")
                }
            }
            _ => label.to_string(),
        }
    }
}

/// A token with its chosen label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisambiguatedData {
    pub content: String,
    pub punctuation: Vec<String>,
    pub source: Span,
    pub is_next_space: bool,
    pub lemma: String,
    pub label: String,
    /// Decoder confidence at this position
    pub weight: f64,
    /// Dictionary id of the lemma, `None` when no analysis matched
    pub lemma_id: Option<usize>,
}

/// Tokens in, labelled tokens out.
pub struct Disambiguator<'m, F: FeatureCalculator, D: Decoder = CrfModel> {
    calculator: F,
    applier: CrfApplier<'m, D>,
    post_rule: PostRule,
}

impl<'m, F: FeatureCalculator, D: Decoder> Disambiguator<'m, F, D> {
    pub fn new(calculator: F, applier: CrfApplier<'m, D>, post_rule: PostRule) -> Self {
        Self {
            calculator,
            applier,
            post_rule,
        }
    }

    pub fn post_rule(&self) -> PostRule {
        self.post_rule
    }

    /// Label every token of one sentence.
    pub fn disambiguate(&self, tokens: &[Token]) -> Result<Vec<DisambiguatedData>> {
        let data = self.calculator.calculate_features(tokens);
        let chain = Chain::unlabeled(
            data.iter().map(|d| d.content.clone()).collect(),
            data.iter().map(|d| d.features.clone()).collect(),
        )?;
        let applied = self.applier.apply(&chain)?;

        Ok(data
            .into_iter()
            .zip(applied.labels)
            .zip(applied.weights)
            .map(|((data, label), weight)| {
                let analysis = data.analyses.get(&label).and_then(|a| a.first());
                let lemma = analysis
                    .map_or_else(|| data.content.to_lowercase(), |a| a.lemma.clone());
                let lemma_id = analysis.map(|a| a.lemma_id);
                let label = self.post_rule.apply(&label, analysis);
                DisambiguatedData {
                    content: data.content,
                    punctuation: data.punctuation,
                    source: data.source,
                    is_next_space: data.is_next_space,
                    lemma,
                    label,
                    weight,
                    lemma_id,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{DictionaryFeatureCalculator, LexiconDictionary};
    use crate::states::{ExceptionLexicon, FinderStrategy, PossibleStateFinder};
    use crate::transform::ChainTransformer;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const DICTIONARY: &str = "кот\tкот\tS@ЕД@ИМ\n\
                              ест\tесть\tV@НАСТ@PEREH\n\
                              ест\tест\tS@ЕД@ИМ\n\
                              спит\tспать\tV@НАСТ\n";

    fn model() -> CrfModel {
        let mut model = CrfModel::new();
        for label in ["S@ЕД@ИМ", "V@НАСТ"] {
            model.register_label(label);
        }
        model.add_transition_weight(0, 1, 1.0);
        model
    }

    fn disambiguator(
        model: &CrfModel,
        post_rule: PostRule,
    ) -> Disambiguator<'_, impl FeatureCalculator> {
        let calculator = DictionaryFeatureCalculator::new(LexiconDictionary::parse(DICTIONARY));
        let finder = PossibleStateFinder::new(
            FinderStrategy::Default,
            strings(&["S@ЕД@ИМ", "V@НАСТ"]),
            ExceptionLexicon::new(),
        )
        .unwrap();
        let applier = CrfApplier::new(model, ChainTransformer::Identity, finder).unwrap();
        Disambiguator::new(calculator, applier, post_rule)
    }

    fn analysis(tag: &str) -> Analysis {
        Analysis {
            lemma: "x".into(),
            tag: tag.into(),
            lemma_id: 0,
        }
    }

    #[test]
    fn test_post_rules() {
        let transitive = analysis("V@НАСТ@PEREH");
        assert_eq!(PostRule::None.apply("V@НАСТ", Some(&transitive)), "V@НАСТ");
        assert_eq!(
            PostRule::Transitivity.apply("V@НАСТ", Some(&transitive)),
            "V@НАСТ@ПЕРЕХ"
        );
        assert_eq!(
            PostRule::Transitivity.apply("V@НАСТ", Some(&analysis("V@НАСТ@NEPEREH"))),
            "V@НАСТ@НЕПЕРЕХ"
        );
        assert_eq!(
            PostRule::Transitivity.apply("S@ЕД@ИМ", Some(&analysis("S@ЕД@ИМ"))),
            "S@ЕД@ИМ"
        );
        assert_eq!(PostRule::Transitivity.apply("V@НАСТ", None), "V@НАСТ");
    }

    #[test]
    fn test_verb_without_marker_is_intransitive() {
        assert_eq!(
            PostRule::Transitivity.apply("V@НАСТ", Some(&analysis("V@НАСТ"))),
            "V@НАСТ@НЕПЕРЕХ"
        );
    }

    #[test]
    fn test_dictionary_grammemes_drive_transitivity() {
        let participle = analysis("причастие@действительный@переходный");
        assert_eq!(
            PostRule::Transitivity.apply("V@ПРИЧ", Some(&participle)),
            "V@ПРИЧ@ПЕРЕХ"
        );
        let verb = analysis("глагол@несовершенный@непереходный");
        assert_eq!(
            PostRule::Transitivity.apply("V@НАСТ", Some(&verb)),
            "V@НАСТ@НЕПЕРЕХ"
        );
        let noun = analysis("существительное@переходный");
        assert_eq!(PostRule::Transitivity.apply("S", Some(&noun)), "S");
    }

    #[test]
    fn test_disambiguate_sentence() {
        let model = model();
        let disambiguator = disambiguator(&model, PostRule::Transitivity);
        let tokens = [Token::new("Кот"), Token::new("ест").with_punctuation(["."])];

        let result = disambiguator.disambiguate(&tokens).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].label, "S@ЕД@ИМ");
        assert_eq!(result[0].lemma, "кот");
        assert_eq!(result[0].lemma_id, Some(0));
        assert_eq!(result[1].label, "V@НАСТ@ПЕРЕХ");
        assert_eq!(result[1].lemma, "есть");
        assert_eq!(result[1].punctuation, ["."]);
        assert_eq!(result[1].weight, 1.0);
    }

    #[test]
    fn test_unmarked_verb_in_sentence() {
        let model = model();
        let disambiguator = disambiguator(&model, PostRule::Transitivity);
        let result = disambiguator
            .disambiguate(&[Token::new("кот"), Token::new("спит")])
            .unwrap();
        assert_eq!(result[0].label, "S@ЕД@ИМ");
        assert_eq!(result[1].label, "V@НАСТ@НЕПЕРЕХ");
        assert_eq!(result[1].lemma, "спать");
    }

    #[test]
    fn test_unknown_word_keeps_lowercased_content() {
        let model = model();
        let disambiguator = disambiguator(&model, PostRule::None);
        let result = disambiguator.disambiguate(&[Token::new("Мурзик")]).unwrap();
        assert_eq!(result[0].lemma, "мурзик");
        assert_eq!(result[0].lemma_id, None);
        assert!(disambiguator.disambiguate(&[]).unwrap().is_empty());
    }
}
