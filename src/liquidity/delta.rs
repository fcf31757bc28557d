use crate::config::FeeManagerConfig;
use alloy::primitives::ChainId;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Networks below and above their target funding, in USD.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaMap {
    /// USD needed to bring a network back to its target.
    pub deficit: BTreeMap<ChainId, Decimal>,
    /// USD held above a network's target, available to be moved.
    pub surplus: BTreeMap<ChainId, Decimal>,
}

impl DeltaMap {
    /// Whether there is anything to move.
    pub fn is_actionable(&self) -> bool {
        !self.deficit.is_empty() && !self.surplus.is_empty()
    }
}

/// Partitions networks into deficit and surplus against their target funding.
#[derive(Debug, Clone, Default)]
pub struct DeltaCalculator {
    targets: BTreeMap<ChainId, Decimal>,
}

impl DeltaCalculator {
    /// Creates a calculator with the given per-network targets.
    pub fn new(targets: impl IntoIterator<Item = (ChainId, Decimal)>) -> Self {
        Self { targets: targets.into_iter().collect() }
    }

    /// Creates a calculator from the configured target funding levels.
    pub fn from_config(config: &FeeManagerConfig) -> Self {
        Self::new(config.chains.iter().filter_map(|(chain_id, chain)| {
            chain.target_funding_usd.map(|target| (*chain_id, target))
        }))
    }

    /// Computes the [`DeltaMap`] for a rebalance triggered by `trigger`.
    ///
    /// Only the trigger network can be in deficit, so concurrent cycles never compete for the
    /// same surplus to fill different deficits. Every network above target is in surplus.
    /// Networks without a target are excluded.
    pub fn compute(&self, balances: &BTreeMap<ChainId, Decimal>, trigger: ChainId) -> DeltaMap {
        let mut delta = DeltaMap::default();

        for (chain_id, balance) in balances {
            let Some(target) = self.targets.get(chain_id) else {
                debug!(chain_id, "No target funding, excluded from rebalance");
                continue;
            };

            let diff = target - balance;
            if diff > Decimal::ZERO {
                if *chain_id == trigger {
                    delta.deficit.insert(*chain_id, diff);
                }
            } else if diff < Decimal::ZERO {
                delta.surplus.insert(*chain_id, -diff);
            }
        }

        debug!(trigger, ?delta, "Computed delta");
        delta
    }
}
