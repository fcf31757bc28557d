//! Price metrics

use metrics::{Counter, Gauge};
use metrics_derive::Metrics;

/// Metrics for a cached USD price.
#[derive(Metrics)]
#[metrics(scope = "oracle")]
pub(crate) struct UsdPriceMetrics {
    /// Last USD rate seen.
    pub rate: Gauge,
    /// Number of lookups that found an expired rate.
    pub expired_hits: Counter,
}
