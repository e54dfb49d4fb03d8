//! # Possible State Finder
//!
//! Computes, for every lattice position, the subset of the label vocabulary
//! the decoder may choose from. Each position is pruned by, in order:
//!
//! 1. the exception lexicon (closed label lists for irregular surface forms),
//! 2. the dictionary analyses carried as features, filtered by the known
//!    label vocabulary,
//! 3. the whole vocabulary when nothing survived.
//!
//! Synthetic positions of a doubled lattice derive their labels from the
//! full-tag labels. No position is ever left without candidates.

pub mod lexicon;

pub use lexicon::{load_exception_lexicon, load_tag_list, ExceptionLexicon};

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alphabet::Alphabet;
use crate::chain::Chain;
use crate::error::{RazmetkaError, Result};
use crate::transform::{pos_label, COPY_PREFIX, POS_PREFIX};

/// Suffixes removed from a feature before it is matched against the vocabulary.
pub const TRANSITION_MARKERS: [&str; 3] = ["@PEREH", "@NEPEREH", "@STRAD"];

/// The only token a bare `V` feature is accepted for.
pub const PARTICLE_NE: &str = "не";

/// Which positions are full-tag positions and how synthetic ones are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinderStrategy {
    /// Every position is a full-tag position.
    #[default]
    Default,
    /// Even positions are full-tag positions; each odd position receives the
    /// `copy_` variants of its even predecessor.
    Doubling,
    /// Every position is pruned on its own: even ones against the full-tag
    /// vocabulary, odd ones against the `POS_` vocabulary.
    FullMorphology,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionKind {
    FullTag,
    Pos,
}

/// Per-position candidate pruning over a fixed label vocabulary.
#[derive(Debug, Clone)]
pub struct PossibleStateFinder {
    strategy: FinderStrategy,
    all_tags: BTreeSet<String>,
    all_pos: BTreeSet<String>,
    exceptions: ExceptionLexicon,
    pos_exceptions: ExceptionLexicon,
}

/// Remove every transition marker from `feature`.
pub fn normalize_feature(feature: &str) -> String {
    TRANSITION_MARKERS
        .iter()
        .fold(feature.to_string(), |acc, marker| acc.replace(marker, ""))
}

/// Strip two characters from each end of a feature of at least four
/// characters.
pub fn exception_core(feature: &str) -> Option<&str> {
    let count = feature.chars().count();
    if count < 4 {
        return None;
    }
    let start = feature.char_indices().nth(2)?.0;
    let end = feature.char_indices().nth(count - 2)?.0;
    Some(&feature[start..end])
}

fn derive_pos(tags: &BTreeSet<String>) -> BTreeSet<String> {
    tags.iter().map(|tag| pos_label(tag)).collect()
}

fn derive_pos_exceptions(exceptions: &ExceptionLexicon) -> ExceptionLexicon {
    exceptions
        .iter()
        .map(|(key, tags)| {
            let pos: BTreeSet<String> = tags.iter().map(|tag| pos_label(tag)).collect();
            (key.clone(), pos.into_iter().collect())
        })
        .collect()
}

impl PossibleStateFinder {
    /// Build a finder over `tags` with an exception lexicon.
    ///
    /// # Errors
    /// Returns [`RazmetkaError::EmptyVocabulary`] if `tags` is empty.
    pub fn new<I>(strategy: FinderStrategy, tags: I, exceptions: ExceptionLexicon) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let all_tags: BTreeSet<String> = tags.into_iter().collect();
        if all_tags.is_empty() {
            return Err(RazmetkaError::EmptyVocabulary);
        }
        let all_pos = derive_pos(&all_tags);
        let pos_exceptions = derive_pos_exceptions(&exceptions);
        Ok(Self {
            strategy,
            all_tags,
            all_pos,
            exceptions,
            pos_exceptions,
        })
    }

    /// Build a finder from a tag list file and an optional exception file.
    pub fn from_files(
        strategy: FinderStrategy,
        tags: impl AsRef<Path>,
        exceptions: Option<&Path>,
    ) -> Result<Self> {
        let tags = load_tag_list(tags)?;
        let exceptions = match exceptions {
            Some(path) => load_exception_lexicon(path)?,
            None => ExceptionLexicon::new(),
        };
        Self::new(strategy, tags, exceptions)
    }

    /// Build a finder whose vocabulary is the full-tag part of a model's
    /// output alphabet.
    pub fn from_output_alphabet(
        strategy: FinderStrategy,
        output: &Alphabet,
        exceptions: ExceptionLexicon,
    ) -> Result<Self> {
        Self::new(strategy, full_tags_of(output), exceptions)
    }

    /// Re-derive the vocabulary from a trained model's output alphabet.
    ///
    /// Synthetic `copy_` and `POS_` labels are not full tags and are left
    /// out. POS labels the model never saw are dropped from the POS
    /// vocabulary when the model knows any POS label at all.
    pub fn connect_with_model(&mut self, output: &Alphabet) -> Result<()> {
        let all_tags: BTreeSet<String> = full_tags_of(output).collect();
        if all_tags.is_empty() {
            return Err(RazmetkaError::EmptyVocabulary);
        }
        let mut all_pos = derive_pos(&all_tags);
        if output.labels().iter().any(|l| l.starts_with(POS_PREFIX)) {
            all_pos.retain(|pos| output.contains(pos));
        }
        if all_pos.is_empty() {
            all_pos = derive_pos(&all_tags);
        }
        debug!(
            tags = all_tags.len(),
            pos = all_pos.len(),
            "connected possible state finder to model"
        );
        self.all_tags = all_tags;
        self.all_pos = all_pos;
        Ok(())
    }

    pub fn strategy(&self) -> FinderStrategy {
        self.strategy
    }

    pub fn all_tags(&self) -> &BTreeSet<String> {
        &self.all_tags
    }

    pub fn all_pos(&self) -> &BTreeSet<String> {
        &self.all_pos
    }

    /// Fill the possible states of every position of `chain`.
    pub fn find_possible_states(&self, chain: &mut Chain) -> Result<()> {
        let states = match self.strategy {
            FinderStrategy::Default => self.default_states(chain),
            FinderStrategy::Doubling => self.doubling_states(chain),
            FinderStrategy::FullMorphology => self.full_morphology_states(chain),
        };
        chain.set_possible_states(states)
    }

    /// Vocabulary a position of a lattice built for this strategy falls back
    /// to: the full tags, their `copy_` variants at odd positions when
    /// doubling, or the `POS_` labels at odd positions with full morphology.
    pub fn fallback_states(&self, position: usize) -> Vec<String> {
        match (self.strategy, position % 2) {
            (FinderStrategy::Doubling, 1) => self
                .all_tags
                .iter()
                .map(|tag| format!("{COPY_PREFIX}{tag}"))
                .collect(),
            (FinderStrategy::FullMorphology, 1) => self.all_pos.iter().cloned().collect(),
            _ => self.all_tags.iter().cloned().collect(),
        }
    }

    fn default_states(&self, chain: &Chain) -> Vec<Vec<String>> {
        chain
            .tokens()
            .iter()
            .zip(chain.features())
            .map(|(token, features)| self.candidates_at(token, features, PositionKind::FullTag))
            .collect()
    }

    fn doubling_states(&self, chain: &Chain) -> Vec<Vec<String>> {
        let size = chain.len();
        let mut states = vec![Vec::new(); size];
        for index in (0..size).step_by(2) {
            let full = self.candidates_at(
                &chain.tokens()[index],
                &chain.features()[index],
                PositionKind::FullTag,
            );
            if index + 1 < size {
                states[index + 1] = full.iter().map(|s| format!("{COPY_PREFIX}{s}")).collect();
            }
            states[index] = full;
        }
        states
    }

    fn full_morphology_states(&self, chain: &Chain) -> Vec<Vec<String>> {
        chain
            .tokens()
            .iter()
            .zip(chain.features())
            .enumerate()
            .map(|(index, (token, features))| {
                let kind = if index % 2 == 0 {
                    PositionKind::FullTag
                } else {
                    PositionKind::Pos
                };
                self.candidates_at(token, features, kind)
            })
            .collect()
    }

    fn candidates_at(&self, token: &str, features: &[String], kind: PositionKind) -> Vec<String> {
        let (exceptions, fallback) = match kind {
            PositionKind::FullTag => (&self.exceptions, &self.all_tags),
            PositionKind::Pos => (&self.pos_exceptions, &self.all_pos),
        };
        let lowered = token.to_lowercase();
        let accepts_bare_verb = match kind {
            PositionKind::FullTag => lowered == PARTICLE_NE,
            PositionKind::Pos => lowered == format!("{COPY_PREFIX}{PARTICLE_NE}"),
        };

        let mut found = BTreeSet::new();
        for feature in features {
            if let Some(listed) = exception_core(feature).and_then(|core| exceptions.get(core)) {
                if listed.is_empty() {
                    break;
                }
                return listed.clone();
            }
            if feature == "V" && !accepts_bare_verb {
                continue;
            }
            let normalized = normalize_feature(feature);
            if !self.all_tags.contains(&normalized) {
                continue;
            }
            match kind {
                PositionKind::FullTag => {
                    found.insert(normalized);
                }
                PositionKind::Pos => {
                    let pos = pos_label(&normalized);
                    if self.all_pos.contains(&pos) {
                        found.insert(pos);
                    }
                }
            }
        }

        if found.is_empty() {
            fallback.iter().cloned().collect()
        } else {
            found.into_iter().collect()
        }
    }
}

fn full_tags_of(output: &Alphabet) -> impl Iterator<Item = String> + '_ {
    output
        .labels()
        .iter()
        .filter(|label| !label.starts_with(COPY_PREFIX) && !label.starts_with(POS_PREFIX))
        .cloned()
}
