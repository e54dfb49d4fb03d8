//! Training data preparation: chains to encoded lattices.

use std::collections::BTreeSet;

use razmetka_core::states::{ExceptionLexicon, FinderStrategy, PossibleStateFinder};
use razmetka_core::transform::{COPY_PREFIX, POS_PREFIX};
use razmetka_core::{Chain, ChainTransformer, CrfModel};
use tracing::debug;

/// One training sentence on the transformed lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingExample {
    pub features: Vec<Vec<usize>>,
    pub possible_states: Vec<Vec<usize>>,
    /// Gold label ids, one per lattice position
    pub gold: Vec<usize>,
}

impl TrainingExample {
    pub fn len(&self) -> usize {
        self.gold.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gold.is_empty()
    }
}

/// Full tags seen in `chains`: gold labels that are not synthetic.
pub fn collect_tags(chains: &[Chain]) -> BTreeSet<String> {
    chains
        .iter()
        .flat_map(|chain| chain.labels())
        .filter(|label| {
            !label.is_empty() && !label.starts_with(COPY_PREFIX) && !label.starts_with(POS_PREFIX)
        })
        .cloned()
        .collect()
}

/// Build the finder used during training from the tags seen in `chains`.
pub fn training_finder(
    strategy: FinderStrategy,
    chains: &[Chain],
    exceptions: ExceptionLexicon,
) -> razmetka_core::Result<PossibleStateFinder> {
    PossibleStateFinder::new(strategy, collect_tags(chains), exceptions)
}

/// Transform, prune and encode `chains`, growing the alphabets of `model`.
///
/// The gold label is added to a position's candidates when pruning removed
/// it, so every example is reachable by the decoder.
pub fn prepare_examples(
    chains: &[Chain],
    transformer: &ChainTransformer,
    finder: &PossibleStateFinder,
    model: &mut CrfModel,
) -> razmetka_core::Result<Vec<TrainingExample>> {
    let mut examples = Vec::with_capacity(chains.len());
    let mut restored = 0usize;
    for chain in chains.iter().filter(|chain| !chain.is_empty()) {
        let mut lattice = transformer.forward(chain);
        finder.find_possible_states(&mut lattice)?;

        let gold: Vec<usize> = lattice
            .labels()
            .iter()
            .map(|label| model.register_label(label))
            .collect();
        let features: Vec<Vec<usize>> = lattice
            .features()
            .iter()
            .map(|features| features.iter().map(|f| model.register_feature(f)).collect())
            .collect();
        let possible_states: Vec<Vec<usize>> = lattice
            .possible_states()
            .iter()
            .zip(&gold)
            .map(|(states, &gold)| {
                let mut ids: Vec<usize> =
                    states.iter().map(|s| model.register_label(s)).collect();
                if !ids.contains(&gold) {
                    ids.push(gold);
                    restored += 1;
                }
                ids
            })
            .collect();

        examples.push(TrainingExample {
            features,
            possible_states,
            gold,
        });
    }
    debug!(
        examples = examples.len(),
        restored_gold = restored,
        labels = model.num_labels(),
        features = model.input_alphabet().len(),
        "prepared training examples"
    );
    Ok(examples)
}
