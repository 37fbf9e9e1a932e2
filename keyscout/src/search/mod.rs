//! The concurrent scan engine.
//!
//! A scan runs in fixed phases: the [`enumerator`] walks the tree on the
//! calling thread, the [`partition`] step turns the result into disjoint
//! [`WorkUnit`]s, the [`engine`] runs one [`SearchWorker`] task per unit on a
//! rayon pool and the [`aggregator`] merges what the workers found.
//!
//! Two strategies share that pipeline (see [`crate::PartitionStrategy`]):
//!
//! - **Chunked**: the flat file list is cut into `min(threads, files)`
//!   contiguous chunks. Each worker fills a private [`crate::PartialResult`]
//!   and sends it once over an mpsc channel, so no lock is involved.
//! - **Per-directory**: one unit per directory covering its direct files.
//!   Workers insert into a single [`crate::ConcurrentResults`] map whose lock
//!   is held for one push at a time.
//!
//! Both produce the same keyword -> files sets for the same tree.
pub mod aggregator;
pub mod engine;
pub mod enumerator;
pub mod matcher;
pub mod partition;
pub mod worker;

pub use aggregator::{Completion, ResultAggregator};
pub use engine::{search, Orchestrator, ScanPhase};
pub use matcher::KeywordMatcher;
pub use partition::WorkUnit;
pub use worker::{SearchWorker, UnitReport};
