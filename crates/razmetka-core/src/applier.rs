//! # CRF Applier
//!
//! Labels a single unlabeled chain: forward transform, candidate pruning,
//! encoding, decoding and the backward transform of labels and weights.

use tracing::debug;

use crate::chain::Chain;
use crate::crf::{encode_lattice, CrfModel, Decoder};
use crate::error::Result;
use crate::states::PossibleStateFinder;
use crate::transform::ChainTransformer;

/// Labels and confidence weights at the original chain length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub labels: Vec<String>,
    pub weights: Vec<f64>,
}

/// Inference over one chain at a time.
#[derive(Debug, Clone)]
pub struct CrfApplier<'m, D: Decoder = CrfModel> {
    decoder: &'m D,
    transformer: ChainTransformer,
    finder: PossibleStateFinder,
}

impl<'m, D: Decoder> CrfApplier<'m, D> {
    /// Build an applier, restricting `finder` to the labels `decoder` knows.
    pub fn new(
        decoder: &'m D,
        transformer: ChainTransformer,
        mut finder: PossibleStateFinder,
    ) -> Result<Self> {
        finder.connect_with_model(decoder.output_alphabet())?;
        Ok(Self {
            decoder,
            transformer,
            finder,
        })
    }

    pub fn transformer(&self) -> &ChainTransformer {
        &self.transformer
    }

    pub fn finder(&self) -> &PossibleStateFinder {
        &self.finder
    }

    /// Label `chain`. An empty chain yields empty output.
    pub fn apply(&self, chain: &Chain) -> Result<Applied> {
        if chain.is_empty() {
            return Ok(Applied::default());
        }
        let mut transformed = self.transformer.forward(chain);
        self.finder.find_possible_states(&mut transformed)?;
        let lattice = encode_lattice(
            self.decoder.input_alphabet(),
            self.decoder.output_alphabet(),
            &transformed,
            |position| self.finder.fallback_states(position),
        );
        let decoded = self
            .decoder
            .decode(&lattice.features, &lattice.possible_states);
        debug!(
            positions = chain.len(),
            lattice = transformed.len(),
            "decoded chain"
        );

        let output = self.decoder.output_alphabet();
        let labels = self
            .transformer
            .backward(&decoded.labels)
            .into_iter()
            .map(|id| output.resolve(id).to_string())
            .collect();
        let weights = self.transformer.backward(&decoded.weights);
        Ok(Applied { labels, weights })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::{ExceptionLexicon, FinderStrategy};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// `suffix=т` votes for the verb, `POS_S -> V@НАСТ` is a likely transition.
    fn model() -> CrfModel {
        let mut model = CrfModel::new();
        for label in ["S@ЕД@ИМ", "V@НАСТ", "POS_S", "POS_V"] {
            model.register_label(label);
        }
        let suffix = model.register_feature("suffix=т");
        model.add_state_weight(1, suffix, 3.0);
        model.add_transition_weight(2, 1, 0.5);
        model
    }

    fn finder(strategy: FinderStrategy) -> PossibleStateFinder {
        PossibleStateFinder::new(strategy, strings(&["S@ЕД@ИМ", "V@НАСТ"]), ExceptionLexicon::new())
            .unwrap()
    }

    #[test]
    fn test_apply_doubled_lattice() {
        let model = model();
        let applier = CrfApplier::new(
            &model,
            ChainTransformer::FullMorphology,
            finder(FinderStrategy::FullMorphology),
        )
        .unwrap();
        let chain = Chain::unlabeled(
            strings(&["кот", "бежит"]),
            vec![strings(&["S@ЕД@ИМ"]), strings(&["S@ЕД@ИМ", "V@НАСТ", "suffix=т"])],
        )
        .unwrap();

        let applied = applier.apply(&chain).unwrap();
        assert_eq!(applied.labels, ["S@ЕД@ИМ", "V@НАСТ"]);
        assert_eq!(applied.weights.len(), 2);
        assert_eq!(applied.weights[1], 3.5);
    }

    #[test]
    fn test_unknown_features_open_all_tags() {
        let model = model();
        let applier =
            CrfApplier::new(&model, ChainTransformer::Identity, finder(FinderStrategy::Default))
                .unwrap();
        let chain = Chain::unlabeled(strings(&["идёт"]), vec![strings(&["suffix=т"])]).unwrap();
        assert_eq!(applier.apply(&chain).unwrap().labels, ["V@НАСТ"]);
    }

    #[test]
    fn test_finder_is_connected_to_model() {
        let model = model();
        let applier =
            CrfApplier::new(&model, ChainTransformer::Identity, finder(FinderStrategy::Default))
                .unwrap();
        assert_eq!(applier.finder().all_tags().len(), 2);
        assert!(applier.apply(&Chain::default()).unwrap().labels.is_empty());
    }

    #[test]
    fn test_unseen_exception_labels_fall_back_to_full_tags() {
        let mut model = CrfModel::new();
        model.register_label("S@ЕД");
        let pos = model.register_label("POS_S");
        model.add_initial_weight(pos, 10.0);

        let mut exceptions = ExceptionLexicon::new();
        exceptions.insert("кот".into(), strings(&["X@UNSEEN"]));
        let finder =
            PossibleStateFinder::new(FinderStrategy::FullMorphology, strings(&["S@ЕД"]), exceptions)
                .unwrap();
        let applier = CrfApplier::new(&model, ChainTransformer::FullMorphology, finder).unwrap();

        let single = Chain::unlabeled(strings(&["кот"]), vec![strings(&["__кот__"])]).unwrap();
        assert_eq!(applier.apply(&single).unwrap().labels, ["S@ЕД"]);

        let pair = Chain::unlabeled(
            strings(&["кот", "кот"]),
            vec![strings(&["__кот__"]), strings(&["__кот__"])],
        )
        .unwrap();
        assert_eq!(applier.apply(&pair).unwrap().labels, ["S@ЕД", "S@ЕД"]);
    }
}
