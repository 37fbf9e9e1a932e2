use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::search::worker::LARGE_FILE_THRESHOLD;

/// Counters shared by every worker of one scan.
///
/// Clones share the same counters. Workers only increment; totals are read
/// after the join barrier.
#[derive(Debug, Clone, Default)]
pub struct ScanMetrics {
    files_enumerated: Arc<AtomicU64>,
    units_dispatched: Arc<AtomicU64>,
    files_scanned: Arc<AtomicU64>,
    files_skipped: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
    mmap_files: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enumerated(&self, count: usize) {
        self.files_enumerated
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self, units: usize) {
        self.units_dispatched
            .fetch_add(units as u64, Ordering::Relaxed);
    }

    /// Records a file that was read and decoded
    pub fn record_scanned(&self, bytes: u64) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        if bytes >= LARGE_FILE_THRESHOLD {
            self.mmap_files.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a file left out because it could not be read or decoded
    pub fn record_skipped(&self) {
        let skipped = self.files_skipped.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Skipped files so far: {}", skipped);
    }

    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            files_enumerated: self.files_enumerated.load(Ordering::Relaxed),
            units_dispatched: self.units_dispatched.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            mmap_files: self.mmap_files.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Files enumerated: {}\n\
             Work units dispatched: {}\n\
             Files scanned/skipped: {}/{}\n\
             Bytes read: {} ({} memory mapped files)",
            stats.files_enumerated,
            stats.units_dispatched,
            stats.files_scanned,
            stats.files_skipped,
            stats.bytes_read,
            stats.mmap_files
        );
    }
}

/// Point-in-time copy of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub files_enumerated: u64,
    pub units_dispatched: u64,
    pub files_scanned: u64,
    pub files_skipped: u64,
    pub bytes_read: u64,
    pub mmap_files: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_tracking() {
        let metrics = ScanMetrics::new();

        metrics.record_enumerated(3);
        metrics.record_dispatched(2);
        metrics.record_scanned(100);
        metrics.record_scanned(LARGE_FILE_THRESHOLD);
        metrics.record_skipped();

        let stats = metrics.get_stats();
        assert_eq!(stats.files_enumerated, 3);
        assert_eq!(stats.units_dispatched, 2);
        assert_eq!(stats.files_scanned, 2);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.bytes_read, 100 + LARGE_FILE_THRESHOLD);
        assert_eq!(stats.mmap_files, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = ScanMetrics::new();
        let worker_view = metrics.clone();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let m = worker_view.clone();
                s.spawn(move || {
                    for _ in 0..25 {
                        m.record_scanned(1);
                    }
                });
            }
        });

        assert_eq!(metrics.get_stats().files_scanned, 100);
        assert_eq!(metrics.get_stats().bytes_read, 100);
    }
}
