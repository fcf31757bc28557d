//! Fee accrual metrics

use metrics::Counter;
use metrics_derive::Metrics;

/// Metrics for a [`FeeAccrualLedger`](super::FeeAccrualLedger).
#[derive(Metrics)]
#[metrics(scope = "fee_ledger")]
pub struct LedgerMetrics {
    /// Number of fee events recorded.
    pub events: Counter,
    /// Number of accrual windows opened.
    pub windows_opened: Counter,
    /// Number of rebalance cycles triggered by crossing a threshold.
    pub rebalances_triggered: Counter,
    /// Number of rebalance cycles that could not run.
    pub rebalance_failures: Counter,
    /// Number of events dropped because the lock could not be acquired.
    pub lock_failures: Counter,
    /// Number of events aborted because the lock lapsed.
    pub locks_lost: Counter,
    /// Number of windows that could not be closed after a rebalance.
    pub persistence_failures: Counter,
}
