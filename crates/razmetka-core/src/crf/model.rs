//! Linear-chain CRF parameters and their JSON persistence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alphabet::Alphabet;
use crate::error::{RazmetkaError, Result};

/// First-order linear-chain CRF over sparse string features.
///
/// The score of a labelling `y` for feature sets `x` is
/// `initial(y0) + sum state(y_t, x_t) + sum transition(y_t-1, y_t) + final(y_last)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrfModel {
    input: Alphabet,
    output: Alphabet,
    /// Per label: feature id -> weight.
    state_weights: Vec<HashMap<usize, f64>>,
    /// Per previous label: next label -> weight.
    transitions: Vec<HashMap<usize, f64>>,
    initial: Vec<f64>,
    #[serde(rename = "final")]
    final_weights: Vec<f64>,
}

impl CrfModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zero-weight model over existing alphabets.
    pub fn with_alphabets(input: Alphabet, output: Alphabet) -> Self {
        let mut model = Self {
            input,
            output,
            ..Self::default()
        };
        model.grow_label_tables();
        model
    }

    pub fn input_alphabet(&self) -> &Alphabet {
        &self.input
    }

    pub fn output_alphabet(&self) -> &Alphabet {
        &self.output
    }

    pub fn num_labels(&self) -> usize {
        self.output.len()
    }

    /// Register a feature string, returning its id.
    pub fn register_feature(&mut self, feature: &str) -> usize {
        self.input.lookup_or_insert(feature)
    }

    /// Register a label string, returning its id.
    pub fn register_label(&mut self, label: &str) -> usize {
        let id = self.output.lookup_or_insert(label);
        self.grow_label_tables();
        id
    }

    fn grow_label_tables(&mut self) {
        let labels = self.output.len();
        self.state_weights.resize_with(labels, HashMap::new);
        self.transitions.resize_with(labels, HashMap::new);
        self.initial.resize(labels, 0.0);
        self.final_weights.resize(labels, 0.0);
    }

    /// Sum of the weights of `features` for `label`.
    pub fn state_score(&self, label: usize, features: &[usize]) -> f64 {
        self.state_weights.get(label).map_or(0.0, |weights| {
            features
                .iter()
                .filter_map(|feature| weights.get(feature))
                .sum()
        })
    }

    pub fn transition_weight(&self, prev: usize, next: usize) -> f64 {
        self.transitions
            .get(prev)
            .and_then(|row| row.get(&next))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn initial_weight(&self, label: usize) -> f64 {
        self.initial.get(label).copied().unwrap_or(0.0)
    }

    pub fn final_weight(&self, label: usize) -> f64 {
        self.final_weights.get(label).copied().unwrap_or(0.0)
    }

    /// Add `delta` to the weight of `feature` for `label`.
    ///
    /// # Panics
    /// Panics if `label` was not registered.
    pub fn add_state_weight(&mut self, label: usize, feature: usize, delta: f64) {
        *self.state_weights[label].entry(feature).or_insert(0.0) += delta;
    }

    /// # Panics
    /// Panics if `prev` was not registered.
    pub fn add_transition_weight(&mut self, prev: usize, next: usize, delta: f64) {
        *self.transitions[prev].entry(next).or_insert(0.0) += delta;
    }

    /// # Panics
    /// Panics if `label` was not registered.
    pub fn add_initial_weight(&mut self, label: usize, delta: f64) {
        self.initial[label] += delta;
    }

    /// # Panics
    /// Panics if `label` was not registered.
    pub fn add_final_weight(&mut self, label: usize, delta: f64) {
        self.final_weights[label] += delta;
    }

    /// Score of one complete labelling.
    pub fn score_path(&self, features: &[Vec<usize>], labels: &[usize]) -> f64 {
        let mut score = 0.0;
        for (position, (&label, features)) in labels.iter().zip(features).enumerate() {
            score += self.state_score(label, features);
            score += match position {
                0 => self.initial_weight(label),
                _ => self.transition_weight(labels[position - 1], label),
            };
        }
        if let Some(&last) = labels.last() {
            score += self.final_weight(last);
        }
        score
    }

    /// Drop state and transition weights whose magnitude is below `level`.
    /// Returns the number of removed weights.
    pub fn truncate(&mut self, level: f64) -> usize {
        let mut removed = 0;
        for table in self.state_weights.iter_mut().chain(self.transitions.iter_mut()) {
            let before = table.len();
            table.retain(|_, weight| weight.abs() >= level);
            removed += before - table.len();
        }
        removed
    }

    /// Number of non-zero state and transition weights.
    pub fn num_weights(&self) -> usize {
        self.state_weights
            .iter()
            .chain(self.transitions.iter())
            .map(HashMap::len)
            .sum()
    }

    /// Save the model as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| RazmetkaError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)
            .map_err(|e| RazmetkaError::ModelSave(format!("{}: {e}", path.display())))?;
        writer.flush().map_err(|e| RazmetkaError::io(path, e))?;
        info!(path = %path.display(), labels = self.num_labels(), "saved CRF model");
        Ok(())
    }

    /// Load a model saved with [`CrfModel::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RazmetkaError::io(path, e))?;
        let mut model: CrfModel = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| RazmetkaError::ModelLoad(format!("{}: {e}", path.display())))?;
        model.grow_label_tables();
        info!(
            path = %path.display(),
            features = model.input.len(),
            labels = model.output.len(),
            "loaded CRF model"
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model() -> CrfModel {
        let mut model = CrfModel::new();
        let noun = model.register_label("S");
        let verb = model.register_label("V");
        let ends_t = model.register_feature("suffix=т");
        model.add_state_weight(verb, ends_t, 2.0);
        model.add_transition_weight(noun, verb, 1.0);
        model.add_initial_weight(noun, 0.5);
        model.add_final_weight(verb, 0.25);
        model
    }

    #[test]
    fn test_register_grows_tables() {
        let model = toy_model();
        assert_eq!(model.num_labels(), 2);
        assert_eq!(model.input_alphabet().len(), 1);
        assert_eq!(model.initial_weight(0), 0.5);
        assert_eq!(model.final_weight(1), 0.25);
        assert_eq!(model.final_weight(7), 0.0);
    }

    #[test]
    fn test_score_path() {
        let model = toy_model();
        let features = vec![vec![], vec![0]];
        // initial(S) + transition(S, V) + state(V, suffix) + final(V)
        assert_eq!(model.score_path(&features, &[0, 1]), 0.5 + 1.0 + 2.0 + 0.25);
        assert_eq!(model.score_path(&[], &[]), 0.0);
    }

    #[test]
    fn test_truncate() {
        let mut model = toy_model();
        model.add_state_weight(0, 0, 0.001);
        assert_eq!(model.num_weights(), 3);
        assert_eq!(model.truncate(0.01), 1);
        assert_eq!(model.num_weights(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = toy_model();
        model.save(&path).unwrap();

        let loaded = CrfModel::load(&path).unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.output_alphabet().lookup("V"), Some(1));
    }

    #[test]
    fn test_load_errors_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            CrfModel::load(&path),
            Err(RazmetkaError::ModelLoad(_))
        ));
        assert!(matches!(
            CrfModel::load(dir.path().join("absent.json")),
            Err(RazmetkaError::Io { .. })
        ));
    }
}
