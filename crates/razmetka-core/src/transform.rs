//! # Chain Transformers
//!
//! Lattice transformations applied before decoding and inverted afterwards.
//! The doubling variants interleave a synthetic position after every real
//! one so that a single linear-chain model can predict coarse tags at the
//! synthetic positions and full tags at the real ones.

use serde::{Deserialize, Serialize};

use crate::chain::Chain;

/// Prefix of the synthetic token and label copies.
pub const COPY_PREFIX: &str = "copy_";
/// Prefix of the part-of-speech labels at synthetic positions.
pub const POS_PREFIX: &str = "POS_";

/// Return the part-of-speech label of a full tag: the text before the first
/// `@`, prefixed with [`POS_PREFIX`].
pub fn pos_label(label: &str) -> String {
    let pos = label.split_once('@').map_or(label, |(pos, _)| pos);
    format!("{POS_PREFIX}{pos}")
}

/// The closed set of lattice transformations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainTransformer {
    /// Leaves the chain untouched.
    #[default]
    Identity,
    /// N positions become 2N; each position is followed by a `copy_` twin
    /// without features.
    Doubling,
    /// N positions become 2N-1; synthetic positions carry the features of
    /// their predecessor and its `POS_` label.
    FullMorphology,
    /// Each position also receives the features of its neighbours at the
    /// given offsets, suffixed with `#offset`.
    Conjunctions { offsets: Vec<isize> },
}

impl ChainTransformer {
    /// Whether the transformation inserts synthetic positions.
    pub fn is_doubling(&self) -> bool {
        matches!(self, Self::Doubling | Self::FullMorphology)
    }

    /// Transform `chain` into the lattice the decoder works on.
    pub fn forward(&self, chain: &Chain) -> Chain {
        match self {
            Self::Identity => chain.clone(),
            Self::Doubling => double(chain),
            Self::FullMorphology => double_with_pos(chain),
            Self::Conjunctions { offsets } => conjoin(chain, offsets),
        }
    }

    /// Map a sequence predicted on the transformed lattice back onto the
    /// original positions.
    ///
    /// Doubling variants keep the even indices, so a sequence of length `L`
    /// yields `ceil(L / 2)` items. The other variants return the input as is.
    pub fn backward<T: Clone>(&self, sequence: &[T]) -> Vec<T> {
        if self.is_doubling() {
            sequence.iter().step_by(2).cloned().collect()
        } else {
            sequence.to_vec()
        }
    }
}

fn double(chain: &Chain) -> Chain {
    let mut doubled = Chain::default();
    for ((token, features), label) in chain
        .tokens()
        .iter()
        .zip(chain.features())
        .zip(chain.labels())
    {
        doubled.push(token.clone(), features.clone(), label.clone());
        doubled.push(
            format!("{COPY_PREFIX}{token}"),
            Vec::new(),
            format!("{COPY_PREFIX}{label}"),
        );
    }
    doubled
}

fn double_with_pos(chain: &Chain) -> Chain {
    let size = chain.len();
    let mut doubled = Chain::default();
    for index in 0..size {
        let token = &chain.tokens()[index];
        let features = &chain.features()[index];
        let label = &chain.labels()[index];
        doubled.push(token.clone(), features.clone(), label.clone());
        if index + 1 < size {
            let synthetic_label = if label.is_empty() {
                String::new()
            } else {
                pos_label(label)
            };
            doubled.push(
                format!("{COPY_PREFIX}{token}"),
                features.clone(),
                synthetic_label,
            );
        }
    }
    doubled
}

fn conjoin(chain: &Chain, offsets: &[isize]) -> Chain {
    let original = chain.features();
    let mut conjoined = chain.clone();
    for index in 0..chain.len() {
        for &offset in offsets {
            let Some(neighbour) = index.checked_add_signed(offset) else {
                continue;
            };
            if let Some(neighbour_features) = original.get(neighbour) {
                for feature in neighbour_features {
                    conjoined.add_feature(index, format!("{feature}#{offset}"));
                }
            }
        }
    }
    conjoined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn cat_runs() -> Chain {
        Chain::new(
            strings(&["кот", "бежит"]),
            vec![strings(&["Ж"]), vec![]],
            strings(&["S@ЕД@ИМ", "V@НАСТ"]),
        )
        .unwrap()
    }

    #[test]
    fn test_pos_label() {
        assert_eq!(pos_label("S@ЕД@ИМ"), "POS_S");
        assert_eq!(pos_label("CONJ"), "POS_CONJ");
        assert_eq!(pos_label("@X"), "POS_");
    }

    #[test]
    fn test_full_morphology_forward() {
        let doubled = ChainTransformer::FullMorphology.forward(&cat_runs());
        assert_eq!(doubled.len(), 3);
        assert_eq!(doubled.tokens(), ["кот", "copy_кот", "бежит"]);
        assert_eq!(doubled.labels(), ["S@ЕД@ИМ", "POS_S", "V@НАСТ"]);
        assert_eq!(doubled.features()[1], ["Ж"]);
        // the last position is an exact copy of the last original one
        assert_eq!(doubled.tokens()[2], cat_runs().tokens()[1]);
        assert_eq!(doubled.features()[2], cat_runs().features()[1]);
        assert_eq!(doubled.labels()[2], cat_runs().labels()[1]);
    }

    #[test]
    fn test_full_morphology_lengths() {
        let transformer = ChainTransformer::FullMorphology;
        assert_eq!(transformer.forward(&Chain::default()), Chain::default());
        for size in 1..6 {
            let tokens: Vec<String> = (0..size).map(|i| format!("t{i}")).collect();
            let labels: Vec<String> = (0..size).map(|i| format!("L{i}@x")).collect();
            let chain = Chain::new(tokens, vec![vec![]; size], labels).unwrap();
            let doubled = transformer.forward(&chain);
            assert_eq!(doubled.len(), 2 * size - 1);
            assert_eq!(transformer.backward(doubled.labels()), chain.labels());
        }
    }

    #[test]
    fn test_backward_selects_even_positions() {
        let transformer = ChainTransformer::FullMorphology;
        let ids = vec![4, 9, 5, 9, 6];
        let weights = vec![0.5, -1.0, 1.5, -1.0, 2.5];
        assert_eq!(transformer.backward(&ids), vec![4, 5, 6]);
        assert_eq!(transformer.backward(&weights), vec![0.5, 1.5, 2.5]);
        assert_eq!(transformer.backward::<i32>(&[]), Vec::<i32>::new());
    }

    #[test]
    fn test_doubling_forward() {
        let doubled = ChainTransformer::Doubling.forward(&cat_runs());
        assert_eq!(doubled.len(), 4);
        assert_eq!(doubled.labels()[1], "copy_S@ЕД@ИМ");
        assert_eq!(doubled.labels()[3], "copy_V@НАСТ");
        assert!(doubled.features()[1].is_empty());
        assert_eq!(
            ChainTransformer::Doubling.backward(doubled.labels()),
            cat_runs().labels()
        );
    }

    #[test]
    fn test_unlabeled_chain_keeps_empty_labels() {
        let chain = Chain::unlabeled(strings(&["a", "b"]), vec![vec![], vec![]]).unwrap();
        let doubled = ChainTransformer::FullMorphology.forward(&chain);
        assert!(doubled.labels().iter().all(String::is_empty));
    }

    #[test]
    fn test_conjunctions_forward() {
        let chain = Chain::new(
            strings(&["a", "b", "c"]),
            vec![strings(&["fa"]), strings(&["fb"]), strings(&["fc"])],
            strings(&["X", "Y", "Z"]),
        )
        .unwrap();
        let transformer = ChainTransformer::Conjunctions {
            offsets: vec![-1, 1],
        };
        let conjoined = transformer.forward(&chain);
        assert_eq!(conjoined.features()[0], ["fa", "fb#1"]);
        assert_eq!(conjoined.features()[1], ["fb", "fa#-1", "fc#1"]);
        assert_eq!(conjoined.features()[2], ["fc", "fb#-1"]);
        assert_eq!(transformer.backward(&[1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn test_identity_round_trip() {
        let chain = cat_runs();
        assert_eq!(ChainTransformer::Identity.forward(&chain), chain);
        assert!(!ChainTransformer::Identity.is_doubling());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ChainTransformer::FullMorphology).unwrap();
        assert_eq!(json, "\"full_morphology\"");
    }
}
