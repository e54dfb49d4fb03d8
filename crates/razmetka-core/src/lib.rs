//! # Razmetka Core
//!
//! The heart of the Razmetka morphological disambiguator. Provides the
//! chain data model, lattice doubling, candidate-state pruning, a
//! linear-chain CRF with constrained Viterbi decoding, and the evaluation
//! harness.
//!
//! ## Quick Start
//!
//! ```rust
//! use razmetka_core::states::{ExceptionLexicon, FinderStrategy, PossibleStateFinder};
//! use razmetka_core::{Chain, ChainTransformer, CrfApplier, CrfModel};
//!
//! let mut model = CrfModel::new();
//! for label in ["S@ЕД@ИМ", "V@НАСТ", "POS_S", "POS_V"] {
//!     model.register_label(label);
//! }
//! let finder = PossibleStateFinder::new(
//!     FinderStrategy::FullMorphology,
//!     ["S@ЕД@ИМ".to_string(), "V@НАСТ".to_string()],
//!     ExceptionLexicon::new(),
//! )
//! .unwrap();
//! let applier = CrfApplier::new(&model, ChainTransformer::FullMorphology, finder).unwrap();
//!
//! let chain = Chain::unlabeled(
//!     vec!["кот".into(), "бежит".into()],
//!     vec![vec!["S@ЕД@ИМ".into()], vec!["V@НАСТ".into()]],
//! )
//! .unwrap();
//! let applied = applier.apply(&chain).unwrap();
//!
//! assert_eq!(applied.labels, ["S@ЕД@ИМ", "V@НАСТ"]);
//! ```
pub mod alphabet;
pub mod applier;
pub mod chain;
pub mod crf;
pub mod disambiguator;
pub mod error;
pub mod features;
pub mod settings;
pub mod states;
pub mod tester;
pub mod transform;

// Re-export primary API
pub use alphabet::Alphabet;
pub use applier::{Applied, CrfApplier};
pub use chain::{read_chains, Chain, ChainReader};
pub use crf::{encode_lattice, CrfModel, Decoded, Decoder, ViterbiDecoder};
pub use disambiguator::{DisambiguatedData, Disambiguator, PostRule};
pub use error::{RazmetkaError, Result};
pub use features::{FeatureCalculator, PredisambiguatedData, Token, Tokenizer};
pub use settings::{LanguageRegistry, LanguageSettings};
pub use states::{FinderStrategy, PossibleStateFinder};
pub use tester::{ChainCollectionTester, TestedResults, TesterConfig};
pub use transform::ChainTransformer;
