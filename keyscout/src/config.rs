use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

/// How the discovered files are split into work units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionStrategy {
    /// Flatten the tree, then split the file list into `min(threads, files)`
    /// contiguous chunks. Workers hand private results to the aggregator over
    /// a channel.
    #[default]
    Chunked,
    /// One unit per directory (root included), covering only that directory's
    /// direct files. Workers insert into one shared concurrent map.
    ///
    /// Parallelism is bounded by the number of directories, so a flat tree
    /// with many files gets a single unit.
    PerDirectory,
}

impl std::str::FromStr for PartitionStrategy {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chunked" => Ok(Self::Chunked),
            "per-directory" | "per_directory" | "directory" => Ok(Self::PerDirectory),
            other => Err(SearchError::config_error(format!(
                "Unknown strategy '{other}' (expected chunked|per-directory)"
            ))),
        }
    }
}

/// How file bytes that are not valid UTF-8 are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Skip the file and report the decode error
    #[default]
    FailFast,
    /// Replace invalid sequences and scan what remains
    Lossy,
}

impl std::str::FromStr for EncodingMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "failfast" => Ok(Self::FailFast),
            "lossy" => Ok(Self::Lossy),
            other => Err(SearchError::config_error(format!(
                "Unknown encoding mode '{other}' (expected failfast|lossy)"
            ))),
        }
    }
}

/// Configuration for a keyword scan.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations, later ones
/// overriding earlier ones:
/// 1. Global `$CONFIG_DIR/keyscout/config.yaml`
/// 2. Local `.keyscout.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line arguments take precedence over every file (see
/// [`SearchConfig::merge_with_cli`]).
///
/// # Configuration Format
///
/// ```yaml
/// keywords: ["hello", "bye"]
/// root_path: "."
/// strategy: per-directory   # or chunked
/// file_extensions: ["txt", "md"]
/// ignore_patterns: ["**/*.tmp"]
/// thread_count: 4
/// encoding_mode: lossy      # or failfast
/// log_level: "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Keywords to look for, matched case-insensitively
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Root directory to start the scan from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Work partitioning strategy
    #[serde(default)]
    pub strategy: PartitionStrategy,

    /// Optional list of file extensions to include (e.g., ["txt", "md"])
    /// If None, every regular file is scanned
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    /// Glob patterns for files to leave out
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of worker threads, also the chunk count ceiling
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Handling of invalid UTF-8
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Values given on the command line. `None` (or an empty list) means the
/// flag was not passed.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub keywords: Vec<String>,
    pub root_path: Option<PathBuf>,
    pub strategy: Option<PartitionStrategy>,
    pub file_extensions: Option<Vec<String>>,
    pub ignore_patterns: Vec<String>,
    pub thread_count: Option<NonZeroUsize>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            root_path: default_root_path(),
            strategy: PartitionStrategy::default(),
            file_extensions: None,
            ignore_patterns: Vec::new(),
            thread_count: default_thread_count(),
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Creates a configuration with defaults for everything but the root and keywords
    pub fn new<I, S>(root_path: impl Into<PathBuf>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            root_path: root_path.into(),
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_thread_count(mut self, thread_count: NonZeroUsize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_encoding_mode(mut self, encoding_mode: EncodingMode) -> Self {
        self.encoding_mode = encoding_mode;
        self
    }

    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(SearchError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }

        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("keyscout/config.yaml")),
            Some(PathBuf::from(".keyscout.yaml")),
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SearchError::config_error(e.to_string()))
    }

    /// Merges CLI arguments with configuration file values.
    ///
    /// Every value the command line set wins; anything it left out keeps the
    /// file value.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if !cli.keywords.is_empty() {
            self.keywords = cli.keywords;
        }
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if let Some(strategy) = cli.strategy {
            self.strategy = strategy;
        }
        if cli.file_extensions.is_some() {
            self.file_extensions = cli.file_extensions;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(encoding_mode) = cli.encoding_mode {
            self.encoding_mode = encoding_mode;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Checks everything that must hold before any worker starts.
    pub fn validate(&self) -> SearchResult<()> {
        if self.keywords.is_empty() {
            return Err(SearchError::NoKeywords);
        }
        if self.keywords.iter().any(|k| k.is_empty()) {
            return Err(SearchError::config_error("Keywords must not be empty strings"));
        }

        match fs::metadata(&self.root_path) {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(SearchError::invalid_root(&self.root_path)),
        }
        if fs::read_dir(&self.root_path).is_err() {
            return Err(SearchError::invalid_root(&self.root_path));
        }

        Ok(())
    }

    /// Keywords with repeats removed, first occurrence kept.
    pub fn unique_keywords(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.keywords
            .iter()
            .filter(|k| seen.insert(k.as_str()))
            .cloned()
            .collect()
    }
}
