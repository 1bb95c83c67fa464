//! Screening services
//!
//! - `cross_duplicate`: matches answers against other participants' history
//! - `grouping`: picks a response group from scored matches
//! - `metrics_worker`: local and remote metric computation
//! - `screening`: request-level checks, timeout and persistence
//! - `self_duplicate`: matches a participant's answers against each other
//! - `statistics`: counters for degraded paths

pub mod cross_duplicate;
pub mod grouping;
pub mod metrics_worker;
pub mod screening;
pub mod self_duplicate;
pub mod statistics;

pub use cross_duplicate::CrossDuplicateChecker;
pub use grouping::{GroupingResolver, Resolution};
pub use metrics_worker::{HttpMetricsWorker, LocalMetricsWorker, MetricsWorker, WorkerError};
pub use screening::{ScreeningError, ScreeningOutcome, ScreeningRequest, ScreeningService};
pub use self_duplicate::check_for_self_duplicate_responses;
pub use statistics::{ScreeningStats, StatsSnapshot};
