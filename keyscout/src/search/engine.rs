use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::aggregator::{Completion, ResultAggregator};
use super::enumerator::{enumerate_directories, enumerate_files};
use super::matcher::KeywordMatcher;
use super::partition::{partition_chunks, partition_directories, WorkUnit};
use super::worker::SearchWorker;
use crate::config::{PartitionStrategy, SearchConfig};
use crate::errors::{SearchError, SearchResult};
use crate::filters::FileFilter;
use crate::metrics::ScanMetrics;
use crate::results::{ConcurrentResults, SearchOutcome};

/// Lifecycle of one scan. Phases are entered strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Enumerating,
    Partitioning,
    Dispatching,
    AwaitingCompletion,
    Aggregating,
    Done,
}

impl ScanPhase {
    /// The only phase that may follow this one
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Enumerating),
            Self::Enumerating => Some(Self::Partitioning),
            Self::Partitioning => Some(Self::Dispatching),
            Self::Dispatching => Some(Self::AwaitingCompletion),
            Self::AwaitingCompletion => Some(Self::Aggregating),
            Self::Aggregating => Some(Self::Done),
            Self::Done => None,
        }
    }
}

/// Output of the enumeration phase, tagged by strategy
enum Enumerated {
    Files(Vec<PathBuf>),
    Directories(Vec<PathBuf>),
}

/// Drives enumerate -> partition -> dispatch -> await -> aggregate for one
/// validated configuration.
#[derive(Debug)]
pub struct Orchestrator {
    config: SearchConfig,
    filter: FileFilter,
    keywords: Vec<String>,
    phase: ScanPhase,
    history: Vec<ScanPhase>,
}

impl Orchestrator {
    /// Validates `config`; nothing is dispatched if this fails.
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        let filter = FileFilter::from_config(&config)?;
        let keywords = config.unique_keywords();

        Ok(Self {
            config,
            filter,
            keywords,
            phase: ScanPhase::Idle,
            history: vec![ScanPhase::Idle],
        })
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Phases visited by the latest run, `Idle` first
    pub fn history(&self) -> &[ScanPhase] {
        &self.history
    }

    fn advance(&mut self, to: ScanPhase) {
        debug_assert_eq!(
            self.phase.next(),
            Some(to),
            "illegal phase transition {:?} -> {:?}",
            self.phase,
            to
        );
        debug!("Phase {:?} -> {:?}", self.phase, to);
        self.phase = to;
        self.history.push(to);
    }

    /// Runs a complete scan. Calling it again starts over from `Idle`.
    pub fn run(&mut self) -> SearchResult<SearchOutcome> {
        self.phase = ScanPhase::Idle;
        self.history = vec![ScanPhase::Idle];

        info!(
            "Starting scan of {} for {} keywords ({:?} strategy, {} threads)",
            self.config.root_path.display(),
            self.keywords.len(),
            self.config.strategy,
            self.config.thread_count
        );
        let start = Instant::now();
        let metrics = ScanMetrics::new();

        self.advance(ScanPhase::Enumerating);
        let enumerated = self.enumerate();

        self.advance(ScanPhase::Partitioning);
        let units = self.partition(enumerated);
        metrics.record_enumerated(units.iter().map(WorkUnit::len).sum());

        self.advance(ScanPhase::Dispatching);
        let expected = units.len();
        let worker = SearchWorker::new(
            KeywordMatcher::new(self.keywords.iter().cloned()),
            self.config.encoding_mode,
            metrics.clone(),
        );
        let shared = ConcurrentResults::new();
        let (tx, rx) = mpsc::channel();
        self.dispatch(units, &worker, &shared, tx)?;
        metrics.record_dispatched(expected);

        self.advance(ScanPhase::Aggregating);
        let mut aggregator = ResultAggregator::new();
        aggregator.collect(rx);
        if self.config.strategy == PartitionStrategy::PerDirectory {
            debug!("Shared map holds {} matches", shared.total_matches());
        }
        aggregator.absorb_shared(shared);
        let mut unit_reports = aggregator.reports().to_vec();
        unit_reports.sort_by_key(|r| r.unit_id);
        let result = aggregator.finish(expected)?;

        self.advance(ScanPhase::Done);
        let elapsed = start.elapsed();
        metrics.log_stats();

        let stats = metrics.get_stats();
        if stats.files_skipped > 0 {
            warn!("{} files could not be read and were skipped", stats.files_skipped);
        }
        info!(
            "Scan complete in {:.3}s: {} keywords matched, {} matches",
            elapsed.as_secs_f64(),
            result.keyword_count(),
            result.total_matches()
        );

        Ok(SearchOutcome::new(
            result,
            elapsed,
            stats,
            self.keywords.clone(),
        )
        .with_units(unit_reports))
    }

    fn enumerate(&self) -> Enumerated {
        let root = &self.config.root_path;
        match self.config.strategy {
            PartitionStrategy::Chunked => Enumerated::Files(enumerate_files(root, &self.filter)),
            PartitionStrategy::PerDirectory => {
                Enumerated::Directories(enumerate_directories(root))
            }
        }
    }

    fn partition(&self, enumerated: Enumerated) -> Vec<WorkUnit> {
        match enumerated {
            Enumerated::Files(files) => partition_chunks(files, self.config.thread_count),
            Enumerated::Directories(dirs) => partition_directories(dirs, &self.filter),
        }
    }

    /// Spawns one task per unit and returns once all of them finished.
    ///
    /// Chunked tasks send their private result through `tx`; per-directory
    /// tasks write into `shared` and send only their report.
    fn dispatch(
        &mut self,
        units: Vec<WorkUnit>,
        worker: &SearchWorker,
        shared: &ConcurrentResults,
        tx: Sender<Completion>,
    ) -> SearchResult<()> {
        if units.is_empty() {
            debug!("No work units, skipping worker pool");
            self.advance(ScanPhase::AwaitingCompletion);
            return Ok(());
        }

        let pool = build_pool(pool_size(self.config.thread_count, units.len()))?;
        let strategy = self.config.strategy;
        debug!("Dispatching {} work units", units.len());

        pool.scope(move |s| {
            for unit in units {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let completion = match strategy {
                        PartitionStrategy::Chunked => {
                            let (partial, report) = worker.scan_unit_private(&unit);
                            Completion {
                                report,
                                partial: Some(partial),
                            }
                        }
                        PartitionStrategy::PerDirectory => {
                            let mut sink = shared;
                            let report = worker.scan_unit(&unit, &mut sink);
                            Completion {
                                report,
                                partial: None,
                            }
                        }
                    };
                    if tx.send(completion).is_err() {
                        warn!("Aggregator gone before unit {} reported", unit.id);
                    }
                });
            }
            self.advance(ScanPhase::AwaitingCompletion);
        });

        debug!("All workers joined");
        Ok(())
    }
}

/// Threads beyond the number of units would never receive work.
fn pool_size(threads: NonZeroUsize, units: usize) -> NonZeroUsize {
    NonZeroUsize::new(units).map_or(threads, |units| threads.min(units))
}

fn build_pool(threads: NonZeroUsize) -> SearchResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.get())
        .thread_name(|i| format!("keyscout-worker-{i}"))
        .build()
        .map_err(|e| SearchError::dispatch_error(e.to_string()))
}

/// Scans `config.root_path` for `config.keywords`
pub fn search(config: &SearchConfig) -> SearchResult<SearchOutcome> {
    let mut orchestrator = Orchestrator::new(config.clone())?;
    orchestrator.run()
}
