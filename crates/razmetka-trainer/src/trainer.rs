//! Training loop for the CRF model.
//!
//! A mistake-driven structured perceptron: each example is decoded with the
//! current weights under its candidate constraints, and when the best path
//! differs from the gold path the gold features are rewarded and the
//! predicted ones penalized.

use std::path::{Path, PathBuf};

use anyhow::Context;
use razmetka_core::states::{load_exception_lexicon, ExceptionLexicon, FinderStrategy};
use razmetka_core::{read_chains, Chain, ChainTransformer, CrfModel, ViterbiDecoder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{prepare_examples, training_finder, TrainingExample};

/// Training hyper-parameters and pipeline choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub transformer: ChainTransformer,
    pub finder: FinderStrategy,
    /// Maximum number of chains read from the training file
    pub max_chains: usize,
    /// Exception lexicon shared with inference
    pub exceptions: Option<PathBuf>,
    /// Weights below this magnitude are dropped after training
    pub truncation: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            learning_rate: 1.0,
            transformer: ChainTransformer::FullMorphology,
            finder: FinderStrategy::FullMorphology,
            max_chains: usize::MAX,
            exceptions: None,
            truncation: 0.0,
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_transformer(mut self, transformer: ChainTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_finder(mut self, finder: FinderStrategy) -> Self {
        self.finder = finder;
        self
    }

    pub fn with_max_chains(mut self, max_chains: usize) -> Self {
        self.max_chains = max_chains;
        self
    }

    pub fn with_exceptions(mut self, exceptions: impl Into<PathBuf>) -> Self {
        self.exceptions = Some(exceptions.into());
        self
    }

    pub fn with_truncation(mut self, truncation: f64) -> Self {
        self.truncation = truncation;
        self
    }
}

/// Counts for one pass over the training set, at the original chain length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub correct: usize,
    pub total: usize,
    /// Examples whose prediction differed from gold
    pub updates: usize,
}

impl EpochReport {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

pub struct Trainer {
    config: TrainerConfig,
    model: CrfModel,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            model: CrfModel::new(),
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn model(&self) -> &CrfModel {
        &self.model
    }

    pub fn into_model(self) -> CrfModel {
        self.model
    }

    /// Train on a chain file.
    pub fn train_on_file<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<Vec<EpochReport>> {
        let path = path.as_ref();
        let chains = read_chains(path, self.config.max_chains)
            .with_context(|| format!("failed to read training chains from {}", path.display()))?;
        info!(path = %path.display(), chains = chains.len(), "loaded training data");
        self.train(&chains)
    }

    /// Train on in-memory chains.
    pub fn train(&mut self, chains: &[Chain]) -> anyhow::Result<Vec<EpochReport>> {
        let exceptions = match &self.config.exceptions {
            Some(path) => load_exception_lexicon(path)
                .with_context(|| format!("failed to load exceptions from {}", path.display()))?,
            None => ExceptionLexicon::new(),
        };
        let finder = training_finder(self.config.finder, chains, exceptions)
            .context("training data has no labels")?;
        let examples =
            prepare_examples(chains, &self.config.transformer, &finder, &mut self.model)?;
        info!(
            examples = examples.len(),
            labels = self.model.num_labels(),
            features = self.model.input_alphabet().len(),
            "starting perceptron training"
        );

        let mut reports = Vec::with_capacity(self.config.epochs);
        for epoch in 0..self.config.epochs {
            let report = self.run_epoch(epoch, &examples);
            info!(
                epoch = epoch + 1,
                epochs = self.config.epochs,
                accuracy = report.accuracy(),
                updates = report.updates,
                "epoch complete"
            );
            reports.push(report);
        }

        if self.config.truncation > 0.0 {
            let removed = self.model.truncate(self.config.truncation);
            info!(removed, remaining = self.model.num_weights(), "truncated small weights");
        }
        Ok(reports)
    }

    fn run_epoch(&mut self, epoch: usize, examples: &[TrainingExample]) -> EpochReport {
        let mut report = EpochReport {
            epoch,
            ..EpochReport::default()
        };

        // Shuffle
        let mut indices: Vec<usize> = (0..examples.len()).collect();
        for i in (1..indices.len()).rev() {
            let j = (epoch * 17 + i * 13) % (i + 1);
            indices.swap(i, j);
        }

        for &index in &indices {
            let example = &examples[index];
            let predicted = ViterbiDecoder::new(&self.model)
                .decode(&example.features, &example.possible_states)
                .labels;

            let gold = self.config.transformer.backward(&example.gold);
            let original = self.config.transformer.backward(&predicted);
            report.total += gold.len();
            report.correct += gold.iter().zip(&original).filter(|(g, p)| g == p).count();

            if predicted != example.gold {
                report.updates += 1;
                self.update(example, &predicted);
            }
        }
        report
    }

    fn update(&mut self, example: &TrainingExample, predicted: &[usize]) {
        let rate = self.config.learning_rate;
        let gold = &example.gold;
        let model = &mut self.model;

        for (position, features) in example.features.iter().enumerate() {
            let (g, p) = (gold[position], predicted[position]);
            if g != p {
                for &feature in features {
                    model.add_state_weight(g, feature, rate);
                    model.add_state_weight(p, feature, -rate);
                }
            }
            if position == 0 {
                if g != p {
                    model.add_initial_weight(g, rate);
                    model.add_initial_weight(p, -rate);
                }
            } else {
                let (gp, pp) = (gold[position - 1], predicted[position - 1]);
                if (gp, g) != (pp, p) {
                    model.add_transition_weight(gp, g, rate);
                    model.add_transition_weight(pp, p, -rate);
                }
            }
        }

        if let (Some(&g), Some(&p)) = (gold.last(), predicted.last()) {
            if g != p {
                model.add_final_weight(g, rate);
                model.add_final_weight(p, -rate);
            }
        }
    }

    /// Save the trained model as JSON.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        self.model
            .save(path)
            .with_context(|| format!("failed to save model to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use razmetka_core::states::PossibleStateFinder;
    use razmetka_core::tester::ChainCollectionTester;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// "стали" is ambiguous; the left neighbour decides.
    fn chains() -> Vec<Chain> {
        let row = |tokens: &[&str], features: &[&[&str]], labels: &[&str]| {
            Chain::new(
                strings(tokens),
                features.iter().map(|f| strings(f)).collect(),
                strings(labels),
            )
            .unwrap()
        };
        vec![
            row(
                &["мы", "стали"],
                &[&["SPRO@МН"], &["S@МН@ИМ", "V@ПРОШ"]],
                &["SPRO@МН", "V@ПРОШ"],
            ),
            row(
                &["новые", "стали"],
                &[&["A@МН"], &["S@МН@ИМ", "V@ПРОШ"]],
                &["A@МН", "S@МН@ИМ"],
            ),
            row(
                &["они", "стали"],
                &[&["SPRO@МН"], &["S@МН@ИМ", "V@ПРОШ"]],
                &["SPRO@МН", "V@ПРОШ"],
            ),
        ]
    }

    #[test]
    fn test_perceptron_learns_context() {
        let chains = chains();
        let mut trainer = Trainer::new(TrainerConfig::new().with_epochs(10));
        let reports = trainer.train(&chains).unwrap();
        assert_eq!(reports.len(), 10);
        assert_eq!(reports.last().unwrap().accuracy(), 1.0);
        assert_eq!(reports.last().unwrap().updates, 0);

        let model = trainer.into_model();
        let finder = PossibleStateFinder::from_output_alphabet(
            FinderStrategy::FullMorphology,
            model.output_alphabet(),
            ExceptionLexicon::new(),
        )
        .unwrap();
        let mut tester =
            ChainCollectionTester::new(&model, &finder, ChainTransformer::FullMorphology);
        tester.initialize_from_chains(chains).unwrap();
        assert_eq!(tester.test().accuracy(), 1.0);
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let first = Trainer::new(TrainerConfig::new().with_epochs(3))
            .train(&chains())
            .unwrap();
        let second = Trainer::new(TrainerConfig::new().with_epochs(3))
            .train(&chains())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_train_on_file_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("train.txt");
        std::fs::write(
            &data,
            "мы\tSPRO@МН\tSPRO@МН\nстали\tS@МН@ИМ,V@ПРОШ\tV@ПРОШ\n\n\
             новые\tA@МН\tA@МН\nстали\tS@МН@ИМ,V@ПРОШ\tS@МН@ИМ\n",
        )
        .unwrap();
        let mut trainer = Trainer::new(
            TrainerConfig::new()
                .with_epochs(5)
                .with_transformer(ChainTransformer::Identity)
                .with_finder(FinderStrategy::Default),
        );
        trainer.train_on_file(&data).unwrap();

        let path = dir.path().join("model.json");
        trainer.save_model(&path).unwrap();
        let loaded = CrfModel::load(&path).unwrap();
        assert_eq!(&loaded, trainer.model());
    }

    #[test]
    fn test_missing_training_file() {
        let mut trainer = Trainer::new(TrainerConfig::default());
        let error = trainer.train_on_file("/nonexistent/train.txt").unwrap_err();
        assert!(error.to_string().contains("failed to read training chains"));
    }

    #[test]
    fn test_truncation() {
        let mut trainer = Trainer::new(TrainerConfig::new().with_epochs(3).with_truncation(1e9));
        trainer.train(&chains()).unwrap();
        assert_eq!(trainer.model().num_weights(), 0);
    }
}
