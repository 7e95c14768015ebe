//! Action tracking and rate computation

mod calculator;
mod ledger;
mod snapshot;
mod stats;

pub use calculator::ApmCalculator;
pub use ledger::ActionLedger;
pub use snapshot::LedgerSnapshot;
pub use stats::Statistics;

// Constants for rate computation
pub(crate) const DEFAULT_WINDOW: std::time::Duration = std::time::Duration::from_secs(60);

/// Width of the actions-per-second slice.
pub(crate) const RATE_SLICE: std::time::Duration = std::time::Duration::from_secs(1);

/// Extra history tolerated in the ledger between snapshots. Strict
/// trimming happens on the snapshot copy, outside the lock.
pub(crate) const EVICTION_SLACK: std::time::Duration = std::time::Duration::from_secs(10);
