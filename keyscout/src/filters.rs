/// File filtering applied identically by both partitioning strategies, so
/// the set of scanned files never depends on how the work is split.
use glob::Pattern;
use std::path::Path;

use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};

/// Checks if a file should be included in the search based on its extension
pub fn has_valid_extension(path: &Path, extensions: &Option<Vec<String>>) -> bool {
    match extensions {
        None => true,
        Some(exts) => {
            if let Some(ext) = path.extension() {
                if let Some(ext_str) = ext.to_str() {
                    return exts.iter().any(|e| e.eq_ignore_ascii_case(ext_str));
                }
            }
            false
        }
    }
}

/// Precompiled extension and glob filters.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    extensions: Option<Vec<String>>,
    ignore_patterns: Vec<Pattern>,
}

impl FileFilter {
    /// Compiles the ignore globs; a malformed glob is a configuration error.
    pub fn new(extensions: Option<Vec<String>>, ignore_patterns: &[String]) -> SearchResult<Self> {
        let ignore_patterns = ignore_patterns
            .iter()
            .map(|p| {
                Pattern::new(p)
                    .map_err(|e| SearchError::invalid_pattern(format!("'{p}': {e}")))
            })
            .collect::<SearchResult<Vec<_>>>()?;

        let extensions = extensions.map(|exts| {
            exts.into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect()
        });

        Ok(Self {
            extensions,
            ignore_patterns,
        })
    }

    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        Self::new(config.file_extensions.clone(), &config.ignore_patterns)
    }

    /// Checks if a file matches one of the ignore globs
    pub fn should_ignore(&self, path: &Path) -> bool {
        if self.ignore_patterns.is_empty() {
            return false;
        }
        let normalized_path = path.to_string_lossy().replace('\\', "/");
        self.ignore_patterns
            .iter()
            .any(|p| p.matches(&normalized_path))
    }

    /// Determines if a file should be scanned
    pub fn should_include_file(&self, path: &Path) -> bool {
        has_valid_extension(path, &self.extensions) && !self.should_ignore(path)
    }
}
