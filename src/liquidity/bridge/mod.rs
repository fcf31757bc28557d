//! Types and traits for bridges used to move funds between networks.

use crate::types::TxRequest;
use alloy::primitives::{Address, ChainId, U256, map::HashMap};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Destination token per destination network, for each token accepted on a source network.
pub type BridgeTokenMap = HashMap<Address, HashMap<ChainId, Address>>;

/// Parameters for pricing the deposit leg of a bridge transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositCostParams {
    /// Source network.
    pub from_chain: ChainId,
    /// Destination network.
    pub to_chain: ChainId,
    /// Token deposited on the source network.
    pub token: Address,
    /// Amount deposited.
    pub amount: U256,
    /// Account sending and receiving the funds.
    pub account: Address,
}

/// Parameters for pricing the exit leg of a bridge transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitCostParams {
    /// Source network.
    pub from_chain: ChainId,
    /// Destination network.
    pub to_chain: ChainId,
    /// Token deposited on the source network.
    pub token: Address,
    /// Amount deposited.
    pub amount: U256,
}

/// Parameters for a bridge deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositParams {
    /// Source network.
    pub from_chain: ChainId,
    /// Destination network.
    pub to_chain: ChainId,
    /// Token deposited on the source network.
    pub token: Address,
    /// Amount deposited.
    pub amount: U256,
    /// Account sending the deposit.
    pub sender: Address,
    /// Account receiving the funds on the destination network.
    pub receiver: Address,
}

/// An abstraction over a bridge able to price and build cross-network transfers.
#[async_trait]
pub trait Bridge: Debug + Send + Sync {
    /// Returns the bridge identifier.
    fn id(&self) -> &'static str;

    /// Returns the tokens accepted on `chain_id` and what they arrive as on each destination.
    async fn supported_tokens(&self, chain_id: ChainId) -> eyre::Result<BridgeTokenMap>;

    /// Returns the cost of the deposit transaction in USD.
    async fn deposit_cost(&self, params: &DepositCostParams) -> eyre::Result<Decimal>;

    /// Returns the fee taken on exit, in base units of the destination token.
    async fn exit_cost(&self, params: &ExitCostParams) -> eyre::Result<U256>;

    /// Returns the address that must be approved to pull deposited tokens on `chain_id`.
    async fn spender(&self, chain_id: ChainId) -> eyre::Result<Address>;

    /// Builds the deposit transaction.
    async fn deposit(&self, params: &DepositParams) -> eyre::Result<TxRequest>;
}
