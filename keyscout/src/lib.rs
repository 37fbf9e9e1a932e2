pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::{CliOverrides, EncodingMode, PartitionStrategy, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use metrics::{ScanMetrics, ScanStats};
pub use results::{ConcurrentResults, FinalResult, MatchSink, PartialResult, SearchOutcome};
pub use search::search;
