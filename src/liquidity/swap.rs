//! Types and traits for swap aggregators used to convert tokens within a network.

use crate::types::TxRequest;
use alloy::primitives::{Address, ChainId, U256, map::HashMap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Token address per symbol.
pub type SwapTokenList = HashMap<String, Address>;

/// Parameters for pricing a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapCostParams {
    /// Network of the swap.
    pub chain_id: ChainId,
    /// Token sold.
    pub from_token: Address,
    /// Token bought.
    pub to_token: Address,
    /// Amount sold.
    pub amount: U256,
}

/// A swap quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    /// Amount bought.
    pub to_amount: U256,
    /// Gas the swap is expected to consume.
    pub estimated_gas: u64,
}

/// Parameters for a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParams {
    /// Network of the swap.
    pub chain_id: ChainId,
    /// Token sold.
    pub from_token: Address,
    /// Token bought.
    pub to_token: Address,
    /// Amount sold.
    pub amount: U256,
    /// Account selling and receiving.
    pub account: Address,
}

/// An abstraction over a swap aggregator able to quote and build swaps.
#[async_trait]
pub trait Swapper: Debug + Send + Sync {
    /// Returns the tokens tradable on `chain_id` by symbol.
    async fn supported_tokens(&self, chain_id: ChainId) -> eyre::Result<SwapTokenList>;

    /// Quotes a swap.
    async fn quote(&self, params: &SwapCostParams) -> eyre::Result<SwapQuote>;

    /// Returns the address that must be approved to pull sold tokens on `chain_id`.
    async fn spender(&self, chain_id: ChainId) -> eyre::Result<Address>;

    /// Builds the swap transaction.
    async fn swap(&self, params: &SwapParams) -> eyre::Result<TxRequest>;
}
