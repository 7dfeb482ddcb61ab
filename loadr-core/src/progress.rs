use std::sync::Arc;
use std::time::Duration;

use crate::stats::StatsSnapshot;

/// Periodic live view of a running scenario, emitted roughly once a second.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub scenario: String,
    /// Outcomes recorded so far.
    pub completed: u64,
    /// Configured total for the scenario.
    pub total: u64,
    pub elapsed: Duration,
    pub snapshot: StatsSnapshot,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
