use std::sync::mpsc::Receiver;
use tracing::{debug, error};

use super::worker::UnitReport;
use crate::errors::{SearchError, SearchResult};
use crate::results::{ConcurrentResults, FinalResult, PartialResult};

/// Message a worker sends exactly once, when its unit is finished.
///
/// Chunked workers carry their private result; per-directory workers have
/// already written into the shared map and send only their report.
#[derive(Debug)]
pub struct Completion {
    pub report: UnitReport,
    pub partial: Option<PartialResult>,
}

/// Folds worker results into one [`FinalResult`] and checks that every
/// dispatched unit reported back.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    result: FinalResult,
    reports: Vec<UnitReport>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Merges one partial result; lists for a shared keyword are concatenated
    pub fn absorb(&mut self, partial: PartialResult) {
        self.result.absorb(partial);
    }

    /// Accepts one worker completion
    pub fn accept(&mut self, completion: Completion) {
        if let Some(partial) = completion.partial {
            self.absorb(partial);
        }
        self.reports.push(completion.report);
    }

    /// Drains `completions` until every sender is gone
    pub fn collect(&mut self, completions: Receiver<Completion>) {
        for completion in completions {
            self.accept(completion);
        }
    }

    /// Merges the map written in place by per-directory workers
    pub fn absorb_shared(&mut self, shared: ConcurrentResults) {
        self.absorb(shared.into_partial());
    }

    pub fn received(&self) -> usize {
        self.reports.len()
    }

    pub fn reports(&self) -> &[UnitReport] {
        &self.reports
    }

    /// Returns the merged result if exactly `expected` workers reported
    pub fn finish(self, expected: usize) -> SearchResult<FinalResult> {
        let received = self.received();
        if received != expected {
            error!(
                "Expected {} worker results but received {}",
                expected, received
            );
            return Err(SearchError::IncompleteAggregation { expected, received });
        }

        debug!(
            "Aggregated {} worker results into {} keywords ({} matches)",
            received,
            self.result.keyword_count(),
            self.result.total_matches()
        );
        Ok(self.result)
    }
}
