use alloy::primitives::{Address, ChainId};
use rust_decimal::Decimal;

/// How value moves from a surplus network to the deficit network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteAction {
    /// Swap into the bridgeable token on the source network, then bridge it.
    ConvertThenTransfer,
    /// Bridge the token as is, then swap it into the reference token on the target network.
    TransferThenConvert,
}

/// A priced candidate for moving one token from a surplus network to the deficit network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Surplus network funds are taken from.
    pub from_chain: ChainId,
    /// Deficit network funds are moved to.
    pub to_chain: ChainId,
    /// Token moved out of the surplus network.
    pub token: Address,
    /// Route shape.
    pub action: RouteAction,
    /// Estimated total cost of executing the route in USD.
    pub cost_usd: Decimal,
}

/// A single step of route execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RouteStep {
    /// Reading balances or token lists before submitting anything.
    Prepare,
    /// Approving a spender.
    Approve,
    /// Swapping through the aggregator.
    Convert,
    /// Bridging to another network.
    Transfer,
}
