//! Rebalance metrics

use metrics::Counter;
use metrics_derive::Metrics;

/// Metrics for rebalance cycles.
#[derive(Metrics)]
#[metrics(scope = "rebalance")]
pub struct RebalanceMetrics {
    /// Number of rebalance cycles run.
    pub cycles: Counter,
    /// Number of candidate routes priced.
    pub routes_priced: Counter,
    /// Number of candidate routes dropped because pricing failed.
    pub route_estimation_failures: Counter,
    /// Number of routes executed to completion.
    pub routes_completed: Counter,
    /// Number of routes abandoned after a failed step.
    pub routes_failed: Counter,
    /// Number of routes skipped without submitting anything.
    pub routes_skipped: Counter,
    /// Number of tokens swapped into the native token by consolidation.
    pub consolidations: Counter,
}
