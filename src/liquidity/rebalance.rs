use super::{
    CrossNetworkBalanceValuer, DeltaCalculator, RebalanceExecutor, RebalanceMetrics,
    RebalanceReport, RouteFinder,
};
use crate::types::FeeMode;
use alloy::primitives::ChainId;
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tracing::{info, instrument, warn};

/// A rebalance cycle run when a network's accrued fees cross its threshold.
#[async_trait]
pub trait Rebalance: Debug + Send + Sync {
    /// Rebalances the master funding account into `chain_id`.
    ///
    /// Per-route failures are part of the returned report. An error means the cycle could not
    /// run at all.
    async fn rebalance(&self, chain_id: ChainId, mode: FeeMode) -> eyre::Result<RebalanceReport>;
}

/// A service that rebalances the master funding account across networks.
///
/// One cycle takes a balance snapshot, computes the delta against target funding, prices the
/// candidate routes and executes them cheapest first.
#[derive(Debug, Clone)]
pub struct Rebalancer {
    valuer: CrossNetworkBalanceValuer,
    delta: DeltaCalculator,
    finder: RouteFinder,
    executor: RebalanceExecutor,
    metrics: Arc<RebalanceMetrics>,
}

impl Rebalancer {
    /// Creates a new [`Rebalancer`].
    pub fn new(
        valuer: CrossNetworkBalanceValuer,
        delta: DeltaCalculator,
        finder: RouteFinder,
        executor: RebalanceExecutor,
        metrics: Arc<RebalanceMetrics>,
    ) -> Self {
        Self { valuer, delta, finder, executor, metrics }
    }
}

#[async_trait]
impl Rebalance for Rebalancer {
    #[instrument(skip(self))]
    async fn rebalance(&self, chain_id: ChainId, mode: FeeMode) -> eyre::Result<RebalanceReport> {
        self.metrics.cycles.increment(1);

        let mut report = RebalanceReport::default();
        if mode == FeeMode::SingleNetwork {
            report.consolidations = self.executor.consolidate(chain_id).await;
        }

        let balances = self.valuer.snapshot().await;
        if balances.is_empty() {
            eyre::bail!("balances unknown on every network");
        }
        if !balances.contains_key(&chain_id) {
            eyre::bail!("balance of chain {chain_id} is unknown");
        }

        let delta = self.delta.compute(&balances, chain_id);
        if delta.deficit.is_empty() {
            info!(chain_id, "Trigger network is funded, nothing to rebalance");
            return Ok(report);
        }
        if delta.surplus.is_empty() {
            warn!(
                chain_id,
                deficit = ?delta.deficit,
                "No network has surplus to cover the deficit"
            );
            report.remaining = delta.deficit;
            return Ok(report);
        }

        let routes = self.finder.find_routes(&delta, chain_id).await;
        let executed = self.executor.execute(&routes, &delta).await;
        report.outcomes = executed.outcomes;
        report.remaining = executed.remaining;

        info!(
            chain_id,
            completed = report.completed(),
            failed = report.failures().count(),
            remaining = ?report.remaining,
            "Rebalance cycle finished"
        );
        Ok(report)
    }
}
