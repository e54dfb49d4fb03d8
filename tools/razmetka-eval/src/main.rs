//! Razmetka evaluation tool
//!
//! Decodes a labelled test file with a trained model and reports per-token
//! and per-chain accuracy, optionally with a confusion table.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use razmetka_core::tester::MAX_NUMBER_IN_TEST_SET;
use razmetka_core::{ChainCollectionTester, CrfModel, LanguageRegistry, TesterConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "razmetka-eval")]
#[command(about = "Measure tagging accuracy on a labelled chain file")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Language settings file
    #[arg(short, long)]
    settings: PathBuf,

    /// Language code from the settings file
    #[arg(short, long, default_value = "ru")]
    language: String,

    /// Test chains
    #[arg(short, long)]
    test_file: PathBuf,

    /// Decode sequentially instead of on the thread pool
    #[arg(long)]
    sequential: bool,

    #[arg(long, default_value_t = MAX_NUMBER_IN_TEST_SET)]
    max_chains: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Print accuracy
    Test,
    /// Write a per-token `correct<TAB>token<TAB>predicted<TAB>gold` report to a file
    Report(OutputArgs),
    /// Write the report plus one file per confused tag pair
    Folder(OutputArgs),
}

#[derive(Args)]
struct OutputArgs {
    /// Output path
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let registry = LanguageRegistry::from_json_file(&cli.settings)
        .with_context(|| format!("failed to load settings from {}", cli.settings.display()))?;
    let settings = registry.get(&cli.language)?;

    let model: CrfModel = settings
        .load_model()
        .with_context(|| format!("failed to load model {}", settings.model.display()))?;
    let mut finder = settings.build_finder(&model)?;
    finder.connect_with_model(model.output_alphabet())?;

    let config = TesterConfig::new()
        .with_parallel(!cli.sequential)
        .with_max_chains(cli.max_chains);
    let mut tester = ChainCollectionTester::new(&model, &finder, settings.transformer.clone())
        .with_config(config);
    let count = tester
        .initialize(&cli.test_file)
        .with_context(|| format!("failed to read test chains from {}", cli.test_file.display()))?;
    info!(chains = count, language = %cli.language, "test set ready");

    let results = match cli.command {
        Commands::Test => tester.test(),
        Commands::Report(args) => tester
            .test_to_file(&args.output)
            .with_context(|| format!("failed to write report to {}", args.output.display()))?,
        Commands::Folder(args) => tester
            .test_to_folder(&args.output)
            .with_context(|| format!("failed to write reports to {}", args.output.display()))?,
    };
    println!("{results}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "razmetka-eval",
            "--settings",
            "settings.json",
            "--test-file",
            "test.txt",
            "report",
            "--output",
            "report.txt",
        ])
        .unwrap();
        assert_eq!(cli.language, "ru");
        assert_eq!(cli.max_chains, MAX_NUMBER_IN_TEST_SET);
        assert!(!cli.sequential);
        assert!(matches!(
            cli.command,
            Commands::Report(ref args) if args.output == PathBuf::from("report.txt")
        ));
    }

    #[test]
    fn test_report_help_describes_per_token_file() {
        let command = Cli::command();
        let about = command
            .find_subcommand("report")
            .and_then(|report| report.get_about())
            .unwrap()
            .to_string();
        assert!(about.contains("per-token"));
    }

    #[test]
    fn test_cli_requires_test_file() {
        assert!(Cli::try_parse_from(["razmetka-eval", "--settings", "s.json", "test"]).is_err());
    }
}
