//! USD price lookups.

use alloy::primitives::{Address, ChainId};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt::Debug;

mod cache;
pub use cache::{CachedPriceOracle, PriceOracleConfig};

mod metrics;

/// Source of USD prices.
#[async_trait]
pub trait PriceOracle: Debug + Send + Sync {
    /// Returns the USD price of one whole unit of the token with the given symbol.
    async fn usd_price(&self, symbol: &str) -> Option<Decimal>;

    /// Returns the USD price of one whole unit of the token at `token` on `chain_id`.
    async fn usd_price_by_address(&self, chain_id: ChainId, token: Address) -> Option<Decimal>;
}
