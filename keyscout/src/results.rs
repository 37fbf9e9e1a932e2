//! Result types for a keyword scan.
//!
//! A [`PartialResult`] belongs to exactly one worker until it is handed to the
//! aggregator, which folds every partial into one [`FinalResult`]. Keywords
//! that matched nothing are absent from both maps rather than present with an
//! empty list.
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::metrics::ScanStats;
use crate::search::UnitReport;

/// Destination for matches found by a worker.
pub trait MatchSink {
    /// Records that `path` contains `keyword`
    fn record(&mut self, keyword: &str, path: &Path);
}

/// One worker's keyword -> files map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialResult {
    matches: HashMap<String, Vec<PathBuf>>,
}

impl PartialResult {
    /// Creates a new empty partial result
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of keyword hits across all files
    pub fn total_matches(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }

    pub fn files_for(&self, keyword: &str) -> Option<&[PathBuf]> {
        self.matches.get(keyword).map(Vec::as_slice)
    }

    pub fn into_matches(self) -> HashMap<String, Vec<PathBuf>> {
        self.matches
    }
}

impl MatchSink for PartialResult {
    fn record(&mut self, keyword: &str, path: &Path) {
        match self.matches.get_mut(keyword) {
            Some(files) => files.push(path.to_path_buf()),
            None => {
                self.matches
                    .insert(keyword.to_string(), vec![path.to_path_buf()]);
            }
        }
    }
}

impl From<HashMap<String, Vec<PathBuf>>> for PartialResult {
    fn from(matches: HashMap<String, Vec<PathBuf>>) -> Self {
        Self { matches }
    }
}

/// A keyword -> files map shared by concurrently running workers.
///
/// Each insert locks only the shard holding the keyword, and only for a
/// single push. It is created per scan and passed explicitly to workers.
#[derive(Debug, Default)]
pub struct ConcurrentResults {
    matches: DashMap<String, Vec<PathBuf>>,
}

impl ConcurrentResults {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&self, keyword: &str, path: &Path) {
        self.matches
            .entry(keyword.to_string())
            .or_default()
            .push(path.to_path_buf());
    }

    pub fn total_matches(&self) -> usize {
        self.matches.iter().map(|entry| entry.value().len()).sum()
    }

    /// Takes the accumulated matches once every writer is done
    pub fn into_partial(self) -> PartialResult {
        PartialResult::from(self.matches.into_iter().collect::<HashMap<_, _>>())
    }
}

impl MatchSink for &ConcurrentResults {
    fn record(&mut self, keyword: &str, path: &Path) {
        self.insert(keyword, path);
    }
}

/// The merged keyword -> files map for a whole scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalResult {
    matches: HashMap<String, Vec<PathBuf>>,
}

impl FinalResult {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends every path of `partial` to the matching keyword lists
    pub fn absorb(&mut self, partial: PartialResult) {
        for (keyword, files) in partial.into_matches() {
            self.matches.entry(keyword).or_default().extend(files);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn keyword_count(&self) -> usize {
        self.matches.len()
    }

    pub fn total_matches(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }

    pub fn files_for(&self, keyword: &str) -> Option<&[PathBuf]> {
        self.matches.get(keyword).map(Vec::as_slice)
    }

    pub fn matches(&self) -> &HashMap<String, Vec<PathBuf>> {
        &self.matches
    }

    pub fn into_matches(self) -> HashMap<String, Vec<PathBuf>> {
        self.matches
    }
}

/// Everything a finished scan reports.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Merged matches
    pub result: FinalResult,
    /// Wall-clock time from enumeration start to aggregation end
    pub elapsed: Duration,
    /// Counters collected while scanning
    pub stats: ScanStats,
    /// One report per dispatched work unit, by unit id
    pub units: Vec<UnitReport>,
    keyword_order: Vec<String>,
}

impl SearchOutcome {
    pub fn new(
        result: FinalResult,
        elapsed: Duration,
        stats: ScanStats,
        keyword_order: Vec<String>,
    ) -> Self {
        Self {
            result,
            elapsed,
            stats,
            units: Vec::new(),
            keyword_order,
        }
    }

    pub fn with_units(mut self, units: Vec<UnitReport>) -> Self {
        self.units = units;
        self
    }

    /// Matched keywords in the order they were requested, with their files
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> + '_ {
        self.keyword_order.iter().filter_map(|keyword| {
            self.result
                .files_for(keyword)
                .map(|files| (keyword.as_str(), files))
        })
    }

    pub fn files_for(&self, keyword: &str) -> Option<&[PathBuf]> {
        self.result.files_for(keyword)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}
