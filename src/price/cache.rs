use super::{PriceOracle, metrics::UsdPriceMetrics};
use alloy::primitives::{Address, ChainId};
use async_trait::async_trait;
use dashmap::DashMap;
use metrics::Label;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::trace;

/// USD rate taken a certain timestamp.
#[derive(Debug, Clone, Copy)]
struct RateTick {
    /// Price rate.
    rate: Decimal,
    /// Timestamp when we received the rate.
    timestamp: Instant,
}

/// Key of a cached price.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PriceKey {
    Symbol(String),
    Token(ChainId, Address),
}

impl PriceKey {
    fn labels(&self) -> Vec<Label> {
        match self {
            Self::Symbol(symbol) => vec![Label::new("symbol", symbol.clone())],
            Self::Token(chain_id, token) => vec![
                Label::new("chain_id", chain_id.to_string()),
                Label::new("token", token.to_string()),
            ],
        }
    }
}

/// Tracks values for a price key.
#[derive(Debug)]
struct CachedRate {
    /// The tracked rate.
    rate: RateTick,
    /// Metrics for this key.
    metrics: UsdPriceMetrics,
}

/// Configuration for the price cache.
#[derive(Debug, Clone)]
pub struct PriceOracleConfig {
    /// Duration after which a rate is considered expired.
    pub rate_ttl: Duration,
}

impl Default for PriceOracleConfig {
    fn default() -> Self {
        Self { rate_ttl: Duration::from_secs(300) }
    }
}

/// A [`PriceOracle`] that keeps rates from an upstream oracle for a while.
///
/// Lookups within the TTL of the last tick are answered from memory. Expired rates are
/// refreshed from upstream and only served if upstream has no answer.
#[derive(Debug)]
pub struct CachedPriceOracle {
    upstream: Arc<dyn PriceOracle>,
    config: PriceOracleConfig,
    rates: DashMap<PriceKey, CachedRate>,
    /// Constant rate which will be the fallback on a lookup that does not return a price. For
    /// testing only.
    constant_rate: Option<Decimal>,
}

impl CachedPriceOracle {
    /// Return a new [`CachedPriceOracle`].
    pub fn new(upstream: Arc<dyn PriceOracle>, config: PriceOracleConfig) -> Self {
        Self { upstream, config, rates: DashMap::default(), constant_rate: None }
    }

    /// Returns [`Self`] with a constant rate to fallback to.
    pub fn with_constant_rate(mut self, rate: Decimal) -> Self {
        self.constant_rate = Some(rate);
        self
    }

    async fn lookup(&self, key: PriceKey) -> Option<Decimal> {
        if let Some(cached) = self.rates.get(&key) {
            if cached.rate.timestamp.elapsed() < self.config.rate_ttl {
                return Some(cached.rate.rate);
            }
            cached.metrics.expired_hits.increment(1);
        }

        let fresh = match &key {
            PriceKey::Symbol(symbol) => self.upstream.usd_price(symbol).await,
            PriceKey::Token(chain_id, token) => {
                self.upstream.usd_price_by_address(*chain_id, *token).await
            }
        };

        match fresh {
            Some(rate) => {
                trace!(?key, %rate, "USD price update");
                let tick = RateTick { rate, timestamp: Instant::now() };
                let mut entry = self.rates.entry(key.clone()).or_insert_with(|| CachedRate {
                    rate: tick,
                    metrics: UsdPriceMetrics::new_with_labels(key.labels()),
                });
                entry.rate = tick;
                entry.metrics.rate.set(rate.to_f64().unwrap_or_default());
                Some(rate)
            }
            None => self
                .rates
                .get(&key)
                .map(|cached| cached.rate.rate)
                .or(self.constant_rate),
        }
    }
}

#[async_trait]
impl PriceOracle for CachedPriceOracle {
    async fn usd_price(&self, symbol: &str) -> Option<Decimal> {
        self.lookup(PriceKey::Symbol(symbol.to_string())).await
    }

    async fn usd_price_by_address(&self, chain_id: ChainId, token: Address) -> Option<Decimal> {
        self.lookup(PriceKey::Token(chain_id, token)).await
    }
}
