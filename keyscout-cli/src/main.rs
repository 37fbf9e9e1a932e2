use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use itertools::Itertools;
use keyscout::{
    search, CliOverrides, EncodingMode, PartitionStrategy, SearchConfig, SearchOutcome,
};
use std::{num::NonZeroUsize, path::PathBuf};
use tracing_subscriber::EnvFilter;

/// Find which files under a directory contain each of a set of keywords
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source directory to search in
    #[arg(short = 's', long = "source")]
    source: Option<PathBuf>,

    /// Keywords to search for (case-insensitive)
    #[arg(short = 'k', long = "keywords", num_args = 1..)]
    keywords: Vec<String>,

    /// How to split work between threads (chunked|per-directory)
    #[arg(long)]
    strategy: Option<PartitionStrategy>,

    /// Number of threads to use
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long)]
    encoding: Option<EncodingMode>,

    /// File extensions to include (e.g. txt,md)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Patterns to ignore (glob format)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Also print scan statistics
    #[arg(long)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            keywords: self.keywords.clone(),
            root_path: self.source.clone(),
            strategy: self.strategy,
            file_extensions: self.extensions.as_ref().map(|e| {
                e.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            }),
            ignore_patterns: self.ignore.clone(),
            thread_count: self.threads,
            encoding_mode: self.encoding,
            log_level: match self.verbose {
                0 => None,
                1 => Some("info".to_string()),
                2 => Some("debug".to_string()),
                _ => Some("trace".to_string()),
            },
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();
}

fn main() -> anyhow::Result<()> {
    run()
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = SearchConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?
        .merge_with_cli(cli.to_overrides());
    init_logging(&config.log_level);
    tracing::debug!("Effective configuration: {:?}", config);

    let outcome = search(&config)
        .with_context(|| format!("Search in {} failed", config.root_path.display()))?;

    if cli.json {
        print_json(&outcome)?;
    } else {
        print_search_results(&outcome, cli.stats);
    }
    Ok(())
}

fn print_search_results(outcome: &SearchOutcome, show_stats: bool) {
    for (keyword, files) in outcome.iter() {
        println!(
            "Keyword '{}' found in files: {}",
            keyword.green(),
            files.iter().map(|p| p.display()).join(", ")
        );
    }

    if show_stats {
        let stats = outcome.stats;
        println!(
            "Scanned {} of {} files in {} work units ({} skipped, {} bytes read)",
            stats.files_scanned,
            stats.files_enumerated,
            stats.units_dispatched,
            stats.files_skipped,
            stats.bytes_read
        );
        for unit in &outcome.units {
            println!(
                "  unit {}: {} scanned, {} skipped, {} matches",
                unit.unit_id, unit.scanned, unit.skipped, unit.matches
            );
        }
    }

    println!("Total time taken: {} seconds", outcome.elapsed_secs());
}

fn print_json(outcome: &SearchOutcome) -> anyhow::Result<()> {
    let matches: serde_json::Map<String, serde_json::Value> = outcome
        .iter()
        .map(|(keyword, files)| {
            let paths = files
                .iter()
                .map(|p| serde_json::Value::String(p.display().to_string()))
                .collect();
            (keyword.to_string(), serde_json::Value::Array(paths))
        })
        .collect();

    let report = serde_json::json!({
        "matches": matches,
        "elapsed_secs": outcome.elapsed_secs(),
        "stats": outcome.stats,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
