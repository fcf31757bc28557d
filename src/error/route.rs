use super::{BalanceReadError, ChainError, ValuationError};
use crate::types::{RouteAction, RouteStep};
use alloy::primitives::{Address, ChainId, U256};

/// Pricing a candidate route failed. The candidate is discarded.
#[derive(Debug, thiserror::Error)]
pub enum RouteEstimationError {
    /// The token balance could not be read.
    #[error(transparent)]
    BalanceRead(#[from] BalanceReadError),
    /// An amount making up the cost could not be valued.
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    /// The gas price could not be read.
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// The bridge cannot move the token to the destination.
    #[error("bridge does not support {token} from chain {from_chain} to chain {to_chain}")]
    UnsupportedBridgeToken {
        /// Token to bridge.
        token: Address,
        /// Source network.
        from_chain: ChainId,
        /// Destination network.
        to_chain: ChainId,
    },
    /// The swap aggregator lists no token to convert into.
    #[error("no {symbol} token to convert into on chain {chain_id}")]
    NoConversionTarget {
        /// Network of the swap.
        chain_id: ChainId,
        /// Symbol looked up.
        symbol: String,
    },
    /// The bridge or swap client failed to quote.
    #[error("{action} quote failed")]
    Quote {
        /// Route shape being priced.
        action: RouteAction,
        /// Underlying error.
        #[source]
        source: eyre::Error,
    },
    /// The cost does not fit into a decimal.
    #[error("route cost overflows")]
    Overflow,
}

/// A route step failed. The route is abandoned and the next one is attempted.
#[derive(Debug, thiserror::Error)]
#[error("{step} of {amount} {token} on chain {chain_id} failed: {reason}")]
pub struct StepExecutionError {
    /// Step that failed.
    pub step: RouteStep,
    /// Network the step ran on.
    pub chain_id: ChainId,
    /// Token involved.
    pub token: Address,
    /// Amount involved.
    pub amount: U256,
    /// What went wrong.
    #[source]
    pub reason: StepFailure,
}

/// The cause of a [`StepExecutionError`].
#[derive(Debug, thiserror::Error)]
pub enum StepFailure {
    /// Talking to the network failed.
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// A balance needed for the step could not be read.
    #[error(transparent)]
    BalanceRead(#[from] BalanceReadError),
    /// The amount to move could not be valued.
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    /// The bridge or swap client failed to build the transaction.
    #[error(transparent)]
    Client(#[from] eyre::Error),
    /// The route can no longer be executed as priced.
    #[error(transparent)]
    Route(#[from] RouteEstimationError),
}
