//! Cross-network rebalancing of the master funding account.

mod balance;
pub use balance::{BalanceAggregator, CrossNetworkBalanceValuer};
pub mod bridge;
mod delta;
pub use delta::{DeltaCalculator, DeltaMap};
mod executor;
pub use executor::{
    ConsolidationOutcome, RebalanceExecutor, RebalanceReport, RouteOutcome, RouteResult,
    SkipReason,
};
mod metrics;
pub use metrics::RebalanceMetrics;
mod rebalance;
pub use rebalance::{Rebalance, Rebalancer};
mod route;
pub use route::{RouteFinder, RoutePlan, rank_routes};
pub mod swap;
mod tokens;
pub use tokens::{SupportedTokens, bridge_tokens_key, swap_tokens_key};
