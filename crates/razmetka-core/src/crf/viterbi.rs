//! # Constrained Viterbi Decoding
//!
//! Finds the best label sequence of a [`CrfModel`] when every position may
//! only take one of its admissible labels.

use crate::crf::model::CrfModel;
use crate::crf::Decoded;

/// Viterbi decoder restricted to per-position candidate sets.
#[derive(Debug, Clone, Copy)]
pub struct ViterbiDecoder<'m> {
    model: &'m CrfModel,
}

/// Best score reaching one candidate and the candidate it came from.
#[derive(Debug, Clone, Copy)]
struct PathState {
    score: f64,
    prev: Option<usize>,
}

impl<'m> ViterbiDecoder<'m> {
    pub fn new(model: &'m CrfModel) -> Self {
        Self { model }
    }

    /// Decode the best sequence of label ids.
    ///
    /// # Arguments
    /// * `features` - Feature ids of each position
    /// * `possible_states` - Admissible label ids of each position
    ///
    /// # Returns
    /// The best label per position and the cumulative path score at each
    /// chosen node (the last one includes the final weight).
    ///
    /// # Panics
    /// Panics if the two inputs differ in length or if any position has no
    /// admissible label; candidate pruning never produces either.
    pub fn decode(&self, features: &[Vec<usize>], possible_states: &[Vec<usize>]) -> Decoded {
        assert_eq!(
            features.len(),
            possible_states.len(),
            "features and possible states must cover the same positions"
        );
        let seq_len = possible_states.len();
        if seq_len == 0 {
            return Decoded::default();
        }
        for (position, candidates) in possible_states.iter().enumerate() {
            assert!(
                !candidates.is_empty(),
                "position {position} has no admissible labels"
            );
        }

        let model = self.model;
        let mut lattice: Vec<Vec<PathState>> = Vec::with_capacity(seq_len);

        // Initialize first position
        lattice.push(
            possible_states[0]
                .iter()
                .map(|&label| PathState {
                    score: model.initial_weight(label) + model.state_score(label, &features[0]),
                    prev: None,
                })
                .collect(),
        );

        // Forward pass
        for pos in 1..seq_len {
            let previous = &lattice[pos - 1];
            let prev_labels = &possible_states[pos - 1];
            let layer = possible_states[pos]
                .iter()
                .map(|&label| {
                    let mut best_score = f64::NEG_INFINITY;
                    let mut best_prev = None;
                    for (index, (state, &prev_label)) in previous.iter().zip(prev_labels).enumerate()
                    {
                        let score = state.score + model.transition_weight(prev_label, label);
                        if best_prev.is_none() || score > best_score {
                            best_score = score;
                            best_prev = Some(index);
                        }
                    }
                    PathState {
                        score: best_score + model.state_score(label, &features[pos]),
                        prev: best_prev,
                    }
                })
                .collect();
            lattice.push(layer);
        }

        // Find best final candidate
        let last = seq_len - 1;
        let mut best_final = 0;
        let mut best_final_score = f64::NEG_INFINITY;
        for (index, (state, &label)) in lattice[last].iter().zip(&possible_states[last]).enumerate() {
            let score = state.score + model.final_weight(label);
            if index == 0 || score > best_final_score {
                best_final_score = score;
                best_final = index;
            }
        }

        // Backtrack
        let mut labels = vec![0; seq_len];
        let mut weights = vec![0.0; seq_len];
        let mut current = best_final;
        for pos in (0..seq_len).rev() {
            labels[pos] = possible_states[pos][current];
            weights[pos] = lattice[pos][current].score;
            current = lattice[pos][current].prev.unwrap_or(0);
        }
        weights[last] = best_final_score;

        Decoded { labels, weights }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Labels: 0 = S, 1 = V, 2 = A. Feature 0 votes for V, feature 1 for A.
    fn model() -> CrfModel {
        let mut model = CrfModel::new();
        for label in ["S", "V", "A"] {
            model.register_label(label);
        }
        model.register_feature("suffix=т");
        model.register_feature("suffix=ый");
        model.add_state_weight(1, 0, 2.0);
        model.add_state_weight(2, 1, 2.0);
        model.add_transition_weight(2, 0, 1.5);
        model.add_transition_weight(0, 1, 1.0);
        model
    }

    #[test]
    fn test_decode_empty() {
        let model = model();
        let decoded = ViterbiDecoder::new(&model).decode(&[], &[]);
        assert!(decoded.labels.is_empty());
        assert!(decoded.weights.is_empty());
    }

    #[test]
    fn test_decode_prefers_best_path() {
        let model = model();
        let all = vec![0, 1, 2];
        let features = vec![vec![1], vec![], vec![0]];
        let decoded =
            ViterbiDecoder::new(&model).decode(&features, &[all.clone(), all.clone(), all]);
        // A (2.0) -> S (+1.5) -> V (+1.0 +2.0)
        assert_eq!(decoded.labels, vec![2, 0, 1]);
        assert_eq!(decoded.weights, vec![2.0, 3.5, 6.5]);
        assert_eq!(model.score_path(&features, &decoded.labels), 6.5);
    }

    #[test]
    fn test_decode_respects_candidates() {
        let model = model();
        let features = vec![vec![1], vec![], vec![0]];
        let decoded = ViterbiDecoder::new(&model).decode(&features, &[vec![0], vec![2], vec![0, 2]]);
        assert_eq!(decoded.labels[0], 0);
        assert_eq!(decoded.labels[1], 2);
        // only A -> S carries a transition weight
        assert_eq!(decoded.labels[2], 0);
    }

    #[test]
    fn test_singleton_candidates_are_forced() {
        let model = model();
        let features = vec![vec![0], vec![0]];
        let decoded = ViterbiDecoder::new(&model).decode(&features, &[vec![2], vec![0]]);
        assert_eq!(decoded.labels, vec![2, 0]);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let model = CrfModel::with_alphabets(
            ["f"].into_iter().collect(),
            ["X", "Y"].into_iter().collect(),
        );
        let decoded = ViterbiDecoder::new(&model).decode(&[vec![], vec![]], &[vec![1, 0], vec![0, 1]]);
        assert_eq!(decoded.labels, vec![1, 0]);
    }

    #[test]
    #[should_panic(expected = "no admissible labels")]
    fn test_empty_candidate_set_panics() {
        let model = model();
        ViterbiDecoder::new(&model).decode(&[vec![], vec![]], &[vec![0], vec![]]);
    }
}
