//! # Chain Collection Tester
//!
//! Evaluates a [`Decoder`] on a labelled chain file. Chains are loaded and
//! encoded once by [`ChainCollectionTester::initialize`]; each `test*` call
//! then decodes every instance, maps the labels back to the original
//! positions and compares them with the gold labels.
//!
//! ```no_run
//! use razmetka_core::states::{FinderStrategy, PossibleStateFinder};
//! use razmetka_core::tester::ChainCollectionTester;
//! use razmetka_core::{ChainTransformer, CrfModel};
//!
//! let model = CrfModel::load("model.json")?;
//! let finder = PossibleStateFinder::from_output_alphabet(
//!     FinderStrategy::FullMorphology,
//!     model.output_alphabet(),
//!     Default::default(),
//! )?;
//! let mut tester = ChainCollectionTester::new(&model, &finder, ChainTransformer::FullMorphology);
//! tester.initialize("test.txt")?;
//! println!("{}", tester.test());
//! # Ok::<(), razmetka_core::RazmetkaError>(())
//! ```

pub mod report;

pub use report::{write_sorted_table, ConfusionTable};

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::chain::{Chain, ChainReader};
use crate::crf::{encode_lattice, Decoder};
use crate::error::{RazmetkaError, Result};
use crate::states::PossibleStateFinder;
use crate::transform::ChainTransformer;

/// Default cap on the number of chains read from a test file.
pub const MAX_NUMBER_IN_TEST_SET: usize = 100_000;

/// Name of the confusion table written by [`ChainCollectionTester::test_to_folder`].
pub const STATISTICS_FILE: &str = "CRF_TEST_STATISTICS.txt";

/// Shared flag that stops a running evaluation between sentences.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration for [`ChainCollectionTester`].
#[derive(Debug, Clone)]
pub struct TesterConfig {
    /// Maximum number of chains read by `initialize`
    pub max_chains: usize,
    /// Decode instances on the rayon pool
    pub parallel: bool,
    pub cancellation: CancellationToken,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            max_chains: MAX_NUMBER_IN_TEST_SET,
            parallel: false,
            cancellation: CancellationToken::default(),
        }
    }
}

impl TesterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chains(mut self, max_chains: usize) -> Self {
        self.max_chains = max_chains;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// A chain in decoder form: transformed, pruned and encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedInstance {
    pub features: Vec<Vec<usize>>,
    pub possible_states: Vec<Vec<usize>>,
    /// Gold label ids at the original length; `None` for labels the model
    /// does not know.
    pub gold: Vec<Option<usize>>,
}

/// The untransformed tokens and gold labels of a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedInstance {
    pub tokens: Vec<String>,
    pub labels: Vec<String>,
}

/// Aggregated evaluation counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestedResults {
    pub correct: usize,
    pub total: usize,
    pub fully_correct: usize,
    pub chains: usize,
    /// Mispredictions only: predicted label -> gold label -> count
    pub confusion: ConfusionTable,
}

impl TestedResults {
    /// Token accuracy, 0.0 for an empty run.
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    /// Fraction of chains labelled without a single error, 0.0 for an
    /// empty run.
    pub fn sentence_accuracy(&self) -> f64 {
        ratio(self.fully_correct, self.chains)
    }

    /// Add the counts of `other` to `self`.
    pub fn merge(&mut self, other: TestedResults) {
        self.correct += other.correct;
        self.total += other.total;
        self.fully_correct += other.fully_correct;
        self.chains += other.chains;
        for (predicted, row) in other.confusion {
            let target = self.confusion.entry(predicted).or_default();
            for (gold, count) in row {
                *target.entry(gold).or_insert(0) += count;
            }
        }
    }

    fn record_error(&mut self, predicted: &str, gold: &str) {
        *self
            .confusion
            .entry(predicted.to_string())
            .or_default()
            .entry(gold.to_string())
            .or_insert(0) += 1;
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for TestedResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Number of correct = {}; Total number = {}; Fraction = {:.4}",
            self.correct,
            self.total,
            self.accuracy()
        )?;
        write!(
            f,
            "Number of fully correct chains = {}; Number of chains = {}; Fraction = {:.4}",
            self.fully_correct,
            self.chains,
            self.sentence_accuracy()
        )
    }
}

/// Decoded labels of one instance at the original length.
#[derive(Debug, Clone)]
struct Prediction {
    ids: Vec<usize>,
    labels: Vec<String>,
}

/// Evaluation driver over a borrowed decoder and finder.
pub struct ChainCollectionTester<'a, D: Decoder> {
    decoder: &'a D,
    finder: &'a PossibleStateFinder,
    transformer: ChainTransformer,
    config: TesterConfig,
    encoded: Vec<EncodedInstance>,
    decoded: Vec<DecodedInstance>,
}

impl<'a, D: Decoder + Sync> ChainCollectionTester<'a, D> {
    pub fn new(
        decoder: &'a D,
        finder: &'a PossibleStateFinder,
        transformer: ChainTransformer,
    ) -> Self {
        Self {
            decoder,
            finder,
            transformer,
            config: TesterConfig::default(),
            encoded: Vec::new(),
            decoded: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TesterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    /// Number of loaded instances.
    pub fn len(&self) -> usize {
        self.encoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }

    pub fn encoded(&self) -> &[EncodedInstance] {
        &self.encoded
    }

    pub fn decoded(&self) -> &[DecodedInstance] {
        &self.decoded
    }

    /// Load and encode up to `max_chains` chains from a chain file,
    /// replacing anything loaded before. Returns the number of instances.
    pub fn initialize<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let reader = ChainReader::open(path)?;
        let mut chains = Vec::new();
        for chain in reader.take(self.config.max_chains) {
            chains.push(chain.map_err(|e| RazmetkaError::io(path, e))?);
        }
        let loaded = self.initialize_from_chains(chains)?;
        info!(path = %path.display(), chains = loaded, "loaded test set");
        Ok(loaded)
    }

    /// Encode in-memory chains, replacing anything loaded before.
    pub fn initialize_from_chains<I>(&mut self, chains: I) -> Result<usize>
    where
        I: IntoIterator<Item = Chain>,
    {
        self.encoded.clear();
        self.decoded.clear();
        for chain in chains.into_iter().take(self.config.max_chains) {
            let (encoded, decoded) = self.encode(&chain)?;
            self.encoded.push(encoded);
            self.decoded.push(decoded);
        }
        debug!(chains = self.encoded.len(), "encoded test instances");
        Ok(self.encoded.len())
    }

    fn encode(&self, chain: &Chain) -> Result<(EncodedInstance, DecodedInstance)> {
        let output = self.decoder.output_alphabet();
        let gold = chain.labels().iter().map(|l| output.lookup(l)).collect();

        let mut transformed = self.transformer.forward(chain);
        self.finder.find_possible_states(&mut transformed)?;
        let lattice = encode_lattice(
            self.decoder.input_alphabet(),
            output,
            &transformed,
            |position| self.finder.fallback_states(position),
        );

        Ok((
            EncodedInstance {
                features: lattice.features,
                possible_states: lattice.possible_states,
                gold,
            },
            DecodedInstance {
                tokens: chain.tokens().to_vec(),
                labels: chain.labels().to_vec(),
            },
        ))
    }

    fn predict(&self, instance: &EncodedInstance) -> Prediction {
        let decoded = self
            .decoder
            .decode(&instance.features, &instance.possible_states);
        let ids = self.transformer.backward(&decoded.labels);
        let output = self.decoder.output_alphabet();
        let labels = ids.iter().map(|&id| output.resolve(id).to_string()).collect();
        Prediction { ids, labels }
    }

    /// Predictions in input order. A cancelled run stops early; in parallel
    /// mode the instances not yet started are skipped.
    fn predict_all(&self) -> Vec<(usize, Prediction)> {
        let cancellation = &self.config.cancellation;
        let predictions: Vec<(usize, Prediction)> = if self.config.parallel {
            self.encoded
                .par_iter()
                .enumerate()
                .filter_map(|(index, instance)| {
                    (!cancellation.is_cancelled()).then(|| (index, self.predict(instance)))
                })
                .collect()
        } else {
            let mut predictions = Vec::with_capacity(self.encoded.len());
            for (index, instance) in self.encoded.iter().enumerate() {
                if cancellation.is_cancelled() {
                    break;
                }
                predictions.push((index, self.predict(instance)));
            }
            predictions
        };
        if predictions.len() < self.encoded.len() {
            warn!(
                evaluated = predictions.len(),
                total = self.encoded.len(),
                "evaluation cancelled, returning partial results"
            );
        }
        predictions
    }

    fn score(&self, index: usize, prediction: &Prediction) -> TestedResults {
        let gold = &self.encoded[index].gold;
        let gold_labels = &self.decoded[index].labels;
        let mut results = TestedResults {
            total: gold.len(),
            chains: 1,
            ..TestedResults::default()
        };
        for (position, (&predicted, expected)) in prediction.ids.iter().zip(gold).enumerate() {
            if Some(predicted) == *expected {
                results.correct += 1;
            } else {
                results.record_error(&prediction.labels[position], &gold_labels[position]);
            }
        }
        if results.correct == results.total {
            results.fully_correct = 1;
        }
        results
    }

    /// Decode every instance and return the aggregated counts.
    pub fn test(&self) -> TestedResults {
        let mut results = TestedResults::default();
        for (index, prediction) in self.predict_all() {
            results.merge(self.score(index, &prediction));
        }
        info!(
            correct = results.correct,
            total = results.total,
            accuracy = results.accuracy(),
            fully_correct = results.fully_correct,
            chains = results.chains,
            "evaluation finished"
        );
        results
    }

    /// Like [`test`](Self::test), also writing one
    /// `1|0<TAB>token<TAB>predicted<TAB>gold` line per token to `path`, with
    /// a blank line after every sentence.
    pub fn test_to_file<P: AsRef<Path>>(&self, path: P) -> Result<TestedResults> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| RazmetkaError::io(path, e))?;
        let mut out = BufWriter::new(file);
        let mut results = TestedResults::default();
        for (index, prediction) in self.predict_all() {
            let decoded = &self.decoded[index];
            for ((token, gold), predicted) in decoded
                .tokens
                .iter()
                .zip(&decoded.labels)
                .zip(&prediction.labels)
            {
                let hit = u8::from(predicted == gold);
                writeln!(out, "{hit}\t{token}\t{predicted}\t{gold}")
                    .map_err(|e| RazmetkaError::io(path, e))?;
            }
            writeln!(out).map_err(|e| RazmetkaError::io(path, e))?;
            results.merge(self.score(index, &prediction));
        }
        out.flush().map_err(|e| RazmetkaError::io(path, e))?;
        info!(path = %path.display(), accuracy = results.accuracy(), "wrote per-token report");
        Ok(results)
    }

    /// Like [`test`](Self::test), also writing the confusion table to
    /// `dir/CRF_TEST_STATISTICS.txt` and, for every mispredicted pair, a
    /// `Predicted = X; Real = Y.txt` file listing the sentences it occurred in.
    pub fn test_to_folder<P: AsRef<Path>>(&self, dir: P) -> Result<TestedResults> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| RazmetkaError::io(dir, e))?;

        let mut results = TestedResults::default();
        let mut examples: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        for (index, prediction) in self.predict_all() {
            let sentence = self.score(index, &prediction);
            for (predicted, row) in &sentence.confusion {
                for gold in row.keys() {
                    examples
                        .entry((predicted.clone(), gold.clone()))
                        .or_default()
                        .push(index);
                }
            }
            results.merge(sentence);
        }

        let statistics = dir.join(STATISTICS_FILE);
        let file = File::create(&statistics).map_err(|e| RazmetkaError::io(&statistics, e))?;
        write_sorted_table(BufWriter::new(file), &results.confusion, '\t')
            .map_err(|e| RazmetkaError::io(&statistics, e))?;

        for ((predicted, gold), sentences) in &examples {
            let path = dir.join(format!(
                "Predicted = {}; Real = {}.txt",
                file_safe(predicted),
                file_safe(gold)
            ));
            let mut text = String::new();
            for &index in sentences {
                text.push_str(&self.decoded[index].tokens.join(" "));
                text.push('\n');
            }
            fs::write(&path, text).map_err(|e| RazmetkaError::io(&path, e))?;
        }
        info!(
            dir = %dir.display(),
            pairs = examples.len(),
            labels = report::labels(&results.confusion).len(),
            "wrote confusion report"
        );
        Ok(results)
    }
}

/// Replace path separators so a label can be used in a file name.
fn file_safe(label: &str) -> String {
    label.replace(['/', '\\'], "_")
}
