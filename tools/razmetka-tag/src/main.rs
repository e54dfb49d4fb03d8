use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use razmetka_core::features::{
    DictionaryFeatureCalculator, LexiconDictionary, SchemaFeatureCalculator,
};
use razmetka_core::{
    CrfApplier, DisambiguatedData, Disambiguator, FeatureCalculator, LanguageRegistry, Tokenizer,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct TagOutput {
    pub input: String,
    pub tokens: Vec<DisambiguatedData>,
    pub error: Option<String>,
}

#[derive(Parser)]
#[command(name = "razmetka-tag")]
#[command(about = "Disambiguate sentences read from stdin")]
#[command(version)]
struct Cli {
    /// Language settings file
    #[arg(short, long)]
    settings: PathBuf,

    #[arg(short, long, default_value = "ru")]
    language: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    let registry = LanguageRegistry::from_json_file(&cli.settings)
        .with_context(|| format!("failed to load settings from {}", cli.settings.display()))?;
    let settings = registry.get(&cli.language)?;

    let model = settings
        .load_model()
        .with_context(|| format!("failed to load model {}", settings.model.display()))?;
    let finder = settings.build_finder(&model)?;
    let applier = CrfApplier::new(&model, settings.transformer.clone(), finder)?;

    let exceptions = settings.load_exceptions()?;
    let dictionary = settings.load_dictionary()?.unwrap_or_default();
    info!(
        language = %cli.language,
        dictionary = dictionary.len(),
        exceptions = exceptions.len(),
        "tagger ready"
    );
    let base = DictionaryFeatureCalculator::<LexiconDictionary>::new(dictionary)
        .with_frequent_tokens(exceptions.keys());
    let calculator: Box<dyn FeatureCalculator> = if settings.schema_features {
        Box::new(SchemaFeatureCalculator::new(base))
    } else {
        Box::new(base)
    };
    let disambiguator = Disambiguator::new(&*calculator, applier, settings.post_rule);
    let tokenizer = Tokenizer::new()?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let output = match disambiguator.disambiguate(&tokenizer.tokenize(line)) {
            Ok(tokens) => TagOutput {
                input: line.to_string(),
                tokens,
                error: None,
            },
            Err(e) => TagOutput {
                input: line.to_string(),
                tokens: Vec::new(),
                error: Some(e.to_string()),
            },
        };

        serde_json::to_writer(&mut stdout, &output)?;
        writeln!(stdout)?;
    }

    Ok(())
}
