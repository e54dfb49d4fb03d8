//! Train a Razmetka CRF model from a chain file.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use razmetka_core::{ChainTransformer, FinderStrategy};
use razmetka_trainer::{Trainer, TrainerConfig};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransformerArg {
    Identity,
    Doubling,
    FullMorphology,
    Conjunctions,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FinderArg {
    Default,
    Doubling,
    FullMorphology,
}

/// CLI arguments
#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train a morphological disambiguation model")]
#[command(version)]
struct Cli {
    /// Training chain file
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the model (JSON)
    #[arg(short, long)]
    output: PathBuf,

    /// Number of passes over the training data
    #[arg(short, long, default_value_t = 5)]
    epochs: usize,

    /// Perceptron step size
    #[arg(long, default_value_t = 1.0)]
    learning_rate: f64,

    /// Lattice transformation
    #[arg(long, value_enum, default_value = "full-morphology")]
    transformer: TransformerArg,

    /// Neighbour offsets for the conjunctions transformer
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "-1,1")]
    offsets: Vec<isize>,

    /// Candidate pruning strategy
    #[arg(long, value_enum, default_value = "full-morphology")]
    finder: FinderArg,

    /// Exception lexicon (key<TAB>label,label)
    #[arg(long)]
    exceptions: Option<PathBuf>,

    /// Maximum number of training chains
    #[arg(long)]
    max_chains: Option<usize>,

    /// Drop weights whose magnitude is below this value
    #[arg(long, default_value_t = 0.0)]
    truncate: f64,

    /// Write per-epoch statistics as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> TrainerConfig {
        let transformer = match self.transformer {
            TransformerArg::Identity => ChainTransformer::Identity,
            TransformerArg::Doubling => ChainTransformer::Doubling,
            TransformerArg::FullMorphology => ChainTransformer::FullMorphology,
            TransformerArg::Conjunctions => ChainTransformer::Conjunctions {
                offsets: self.offsets.clone(),
            },
        };
        let finder = match self.finder {
            FinderArg::Default => FinderStrategy::Default,
            FinderArg::Doubling => FinderStrategy::Doubling,
            FinderArg::FullMorphology => FinderStrategy::FullMorphology,
        };
        let mut config = TrainerConfig::new()
            .with_epochs(self.epochs)
            .with_learning_rate(self.learning_rate)
            .with_transformer(transformer)
            .with_finder(finder)
            .with_truncation(self.truncate);
        if let Some(max_chains) = self.max_chains {
            config = config.with_max_chains(max_chains);
        }
        if let Some(exceptions) = &self.exceptions {
            config = config.with_exceptions(exceptions);
        }
        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut trainer = Trainer::new(cli.config());
    let reports = trainer.train_on_file(&cli.input)?;
    trainer.save_model(&cli.output)?;
    info!(path = %cli.output.display(), "model saved");

    if let Some(path) = &cli.report {
        let file = File::create(path)
            .with_context(|| format!("failed to create report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &reports)
            .context("failed to write training report")?;
    }
    Ok(())
}
