//! Pricing-specific error types.

use super::{BalanceReadError, ChainError};
use alloy::primitives::{Address, ChainId};

/// A USD price needed for valuation was not available.
#[derive(Debug, thiserror::Error)]
pub enum PriceUnavailableError {
    /// No price for the symbol.
    #[error("price unavailable for symbol {0}")]
    Symbol(String),
    /// No price for the token address.
    #[error("price unavailable for token {token} on chain {chain_id}")]
    Token {
        /// Network of the token.
        chain_id: ChainId,
        /// Token address.
        token: Address,
    },
    /// The network has no native token configured.
    #[error("no native token configured for chain {0}")]
    NativeTokenUnknown(ChainId),
    /// The value does not fit into a decimal.
    #[error("value of {token} on chain {chain_id} overflows")]
    Overflow {
        /// Network of the token.
        chain_id: ChainId,
        /// Token address.
        token: Address,
    },
}

/// A token amount could not be valued in USD.
#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    /// The balance could not be read.
    #[error(transparent)]
    BalanceRead(#[from] BalanceReadError),
    /// The price was unavailable.
    #[error(transparent)]
    PriceUnavailable(#[from] PriceUnavailableError),
    /// The token's decimals could not be read.
    #[error("failed to read decimals of {token} on chain {chain_id}")]
    Decimals {
        /// Network of the token.
        chain_id: ChainId,
        /// Token address.
        token: Address,
        /// Underlying error.
        #[source]
        source: ChainError,
    },
}
