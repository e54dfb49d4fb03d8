//! # Razmetka Trainer
//!
//! Trains [`razmetka_core::CrfModel`] files from labelled chain files with a
//! structured perceptron. Training runs the same forward transform and
//! candidate pruning as inference, so a model only learns to choose among
//! the labels it will be offered at decode time.

pub mod data;
pub mod trainer;

pub use data::{collect_tags, prepare_examples, training_finder, TrainingExample};
pub use trainer::{EpochReport, Trainer, TrainerConfig};
