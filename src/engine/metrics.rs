//! Resolution run metrics.
//!
//! Opt-in timing data for one host's resolution pass. The default
//! [`crate::resolve_host`] path records only the total; the verbose path
//! keeps per-stage durations for profiling batch runs and debugging slow
//! rules (regex evaluation is the only real latency risk).

use std::time::Duration;

/// Per-stage timings for one resolution pass.
#[derive(Debug, Default, Clone)]
pub struct ResolveMetrics {
    /// Total elapsed time for the pass.
    pub total: Duration,
    /// Time spent in the label transform pipeline.
    pub labels: Duration,
    /// Time spent walking the action rules.
    pub evaluate: Duration,
    /// Time spent folding outcomes (including pool store round-trips).
    pub outcomes: Duration,
}
