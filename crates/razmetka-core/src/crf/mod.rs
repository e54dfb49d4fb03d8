//! # Decoder Contract
//!
//! A decoder turns the integer-encoded lattice of one chain into the best
//! label sequence. [`CrfModel`] is the in-crate implementation; the tester
//! and the applier only rely on the [`Decoder`] trait.

pub mod model;
pub mod viterbi;

pub use model::CrfModel;
pub use viterbi::ViterbiDecoder;

use tracing::debug;

use crate::alphabet::Alphabet;
use crate::chain::Chain;

/// Output of one decode call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// Best output-alphabet id per position.
    pub labels: Vec<usize>,
    /// Confidence trace, one value per position.
    pub weights: Vec<f64>,
}

/// Anything that can label an encoded lattice.
pub trait Decoder {
    /// Alphabet used to encode feature strings.
    fn input_alphabet(&self) -> &Alphabet;

    /// Alphabet used to encode and resolve labels.
    fn output_alphabet(&self) -> &Alphabet;

    /// Return the best labelling consistent with `possible_states`.
    ///
    /// Must be deterministic. Callers never pass an empty candidate set.
    fn decode(&self, features: &[Vec<usize>], possible_states: &[Vec<usize>]) -> Decoded;
}

impl Decoder for CrfModel {
    fn input_alphabet(&self) -> &Alphabet {
        CrfModel::input_alphabet(self)
    }

    fn output_alphabet(&self) -> &Alphabet {
        CrfModel::output_alphabet(self)
    }

    fn decode(&self, features: &[Vec<usize>], possible_states: &[Vec<usize>]) -> Decoded {
        ViterbiDecoder::new(self).decode(features, possible_states)
    }
}

/// Integer form of a pruned chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedLattice {
    pub features: Vec<Vec<usize>>,
    pub possible_states: Vec<Vec<usize>>,
}

/// Encode the features and possible states of `chain`, dropping strings the
/// alphabets do not know.
///
/// A position whose candidates are all unknown to the output alphabet takes
/// `fallback(position)` instead. Only when that is unknown too is the
/// position opened to every label the alphabet holds, so the decoder always
/// receives a non-empty set for a non-empty alphabet.
pub fn encode_lattice<F>(
    input: &Alphabet,
    output: &Alphabet,
    chain: &Chain,
    fallback: F,
) -> EncodedLattice
where
    F: Fn(usize) -> Vec<String>,
{
    let features = chain
        .features()
        .iter()
        .map(|features| input.encode_known(features))
        .collect();
    let possible_states = chain
        .possible_states()
        .iter()
        .enumerate()
        .map(|(position, states)| {
            let encoded = output.encode_known(states);
            if !encoded.is_empty() {
                return encoded;
            }
            let vocabulary = output.encode_known(&fallback(position));
            if vocabulary.is_empty() {
                debug!(position, "no candidate known to the model, opening position");
                (0..output.len()).collect()
            } else {
                debug!(position, "no candidate known to the model, using vocabulary");
                vocabulary
            }
        })
        .collect();
    EncodedLattice {
        features,
        possible_states,
    }
}
