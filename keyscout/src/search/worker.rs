use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, trace, warn};

use super::matcher::KeywordMatcher;
use super::partition::WorkUnit;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::ScanMetrics;
use crate::results::{MatchSink, PartialResult};

const BUFFER_CAPACITY: usize = 65536;
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// Decodes file bytes according to the encoding mode
fn decode_bytes<'b>(
    bytes: &'b [u8],
    path: &Path,
    encoding_mode: EncodingMode,
) -> SearchResult<Cow<'b, str>> {
    match encoding_mode {
        EncodingMode::FailFast => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| SearchError::encoding_error(path, e)),
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            // Owned means at least one sequence was replaced
            if let Cow::Owned(_) = cow {
                warn!("Invalid UTF-8 replaced in file: {}", path.display());
            }
            Ok(cow)
        }
    }
}

/// What one worker did with its unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitReport {
    pub unit_id: usize,
    pub scanned: usize,
    pub skipped: usize,
    pub matches: usize,
}

/// Scans the files of a work unit for the configured keywords.
///
/// One `SearchWorker` is shared by reference across all tasks of a scan; it
/// holds no per-unit state, so every task writes only to the sink it is given.
#[derive(Debug)]
pub struct SearchWorker {
    matcher: KeywordMatcher,
    encoding_mode: EncodingMode,
    metrics: ScanMetrics,
}

impl SearchWorker {
    pub fn new(matcher: KeywordMatcher, encoding_mode: EncodingMode, metrics: ScanMetrics) -> Self {
        Self {
            matcher,
            encoding_mode,
            metrics,
        }
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Reads a file and returns its decoded content, lower-cased.
    ///
    /// Files of at least [`LARGE_FILE_THRESHOLD`] bytes are memory mapped.
    fn read_lowered(&self, path: &Path, size: u64) -> SearchResult<String> {
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;

        if size >= LARGE_FILE_THRESHOLD {
            trace!("Memory mapping {}", path.display());
            // SAFETY: the map is read-only and dropped before this call returns
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SearchError::from_io(path, e))?;
            return Ok(decode_bytes(&mmap, path, self.encoding_mode)?.to_lowercase());
        }

        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut bytes = Vec::with_capacity(size as usize);
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| SearchError::from_io(path, e))?;
        Ok(decode_bytes(&bytes, path, self.encoding_mode)?.to_lowercase())
    }

    /// Scans one file, recording each contained keyword into `sink`.
    ///
    /// Returns the number of keywords found.
    pub fn scan_file<S: MatchSink>(&self, path: &Path, sink: &mut S) -> SearchResult<usize> {
        trace!("Scanning file: {}", path.display());
        let size = fs::metadata(path)
            .map_err(|e| SearchError::from_io(path, e))?
            .len();

        let content = self.read_lowered(path, size)?;
        self.metrics.record_scanned(size);

        let hits = self.matcher.matching_lowered(&content);
        for keyword in &hits {
            sink.record(keyword, path);
        }
        Ok(hits.len())
    }

    /// Scans every file of `unit`. A file that cannot be read or decoded is
    /// logged and skipped; the unit always runs to the end.
    pub fn scan_unit<S: MatchSink>(&self, unit: &WorkUnit, sink: &mut S) -> UnitReport {
        let mut report = UnitReport {
            unit_id: unit.id,
            ..Default::default()
        };

        for path in &unit.files {
            match self.scan_file(path, sink) {
                Ok(hits) => {
                    report.scanned += 1;
                    report.matches += hits;
                }
                Err(e) => {
                    warn!("Error reading file {}: {}", path.display(), e);
                    self.metrics.record_skipped();
                    report.skipped += 1;
                }
            }
        }

        debug!(
            "Unit {} done: {} scanned, {} skipped, {} matches",
            report.unit_id, report.scanned, report.skipped, report.matches
        );
        report
    }

    /// Scans `unit` into a fresh worker-local result
    pub fn scan_unit_private(&self, unit: &WorkUnit) -> (PartialResult, UnitReport) {
        let mut partial = PartialResult::new();
        let report = self.scan_unit(unit, &mut partial);
        (partial, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ConcurrentResults;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn worker(keywords: &[&str], mode: EncodingMode) -> SearchWorker {
        SearchWorker::new(
            KeywordMatcher::new(keywords.iter().copied()),
            mode,
            ScanMetrics::new(),
        )
    }

    fn unit(files: Vec<PathBuf>) -> WorkUnit {
        WorkUnit {
            id: 7,
            directory: None,
            files,
        }
    }

    #[test]
    fn test_scan_unit_records_matches() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "Hello World").unwrap();
        fs::write(&b, "goodbye").unwrap();

        let worker = worker(&["hello", "bye"], EncodingMode::FailFast);
        let (partial, report) = worker.scan_unit_private(&unit(vec![a.clone(), b.clone()]));

        assert_eq!(partial.files_for("hello").unwrap(), &[a]);
        assert_eq!(partial.files_for("bye").unwrap(), &[b]);
        assert_eq!(
            report,
            UnitReport {
                unit_id: 7,
                scanned: 2,
                skipped: 0,
                matches: 2
            }
        );
    }

    #[test]
    fn test_invalid_utf8_is_skipped_in_failfast_mode() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.txt");
        let good = dir.path().join("good.txt");
        fs::write(&bad, b"hello \xff\xfe world").unwrap();
        fs::write(&good, "hello").unwrap();

        let worker = worker(&["hello"], EncodingMode::FailFast);
        let (partial, report) = worker.scan_unit_private(&unit(vec![bad, good.clone()]));

        assert_eq!(partial.files_for("hello").unwrap(), &[good]);
        assert_eq!(report.skipped, 1);
        assert_eq!(worker.metrics().get_stats().files_skipped, 1);
    }

    #[test]
    fn test_invalid_utf8_is_scanned_in_lossy_mode() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.txt");
        fs::write(&bad, b"hello \xff\xfe world").unwrap();

        let worker = worker(&["hello"], EncodingMode::Lossy);
        let (partial, report) = worker.scan_unit_private(&unit(vec![bad.clone()]));

        assert_eq!(partial.files_for("hello").unwrap(), &[bad]);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_vanished_file_does_not_stop_unit() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("gone.txt");
        let present = dir.path().join("present.txt");
        fs::write(&present, "BYE now").unwrap();

        let worker = worker(&["bye"], EncodingMode::FailFast);
        let (partial, report) = worker.scan_unit_private(&unit(vec![gone.clone(), present.clone()]));

        assert_eq!(partial.files_for("bye").unwrap(), &[present]);
        assert_eq!(report.scanned, 1);
        assert_eq!(report.skipped, 1);

        let err = worker.scan_file(&gone, &mut PartialResult::new()).unwrap_err();
        assert!(matches!(err, SearchError::FileNotFound(_)));
    }

    #[test]
    fn test_scan_into_shared_results() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, "hello bye").unwrap();

        let shared = ConcurrentResults::new();
        let worker = worker(&["hello", "bye", "absent"], EncodingMode::FailFast);
        let report = worker.scan_unit(&unit(vec![a.clone()]), &mut &shared);

        assert_eq!(report.matches, 2);
        let partial = shared.into_partial();
        assert_eq!(partial.files_for("hello").unwrap(), &[a.clone()]);
        assert_eq!(partial.files_for("bye").unwrap(), &[a]);
        assert!(partial.files_for("absent").is_none());
    }

    #[test]
    fn test_large_file_is_memory_mapped() {
        let dir = tempdir().unwrap();
        let big = dir.path().join("big.txt");
        let mut content = vec![b'x'; LARGE_FILE_THRESHOLD as usize];
        content.extend_from_slice(b"Needle");
        fs::write(&big, &content).unwrap();

        let worker = worker(&["needle"], EncodingMode::FailFast);
        let (partial, _) = worker.scan_unit_private(&unit(vec![big.clone()]));

        assert_eq!(partial.files_for("needle").unwrap(), &[big]);
        assert_eq!(worker.metrics().get_stats().mmap_files, 1);
    }
}
