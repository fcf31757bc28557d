use alloy::{
    primitives::{Address, ChainId, TxHash},
    providers::PendingTransactionError,
    transports::TransportError,
};

/// Errors returned by a [`ChainReader`](crate::chain::ChainReader).
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// No reader is registered for the network.
    #[error("no chain reader for chain {0}")]
    UnsupportedChain(ChainId),
    /// An error occurred talking to RPC.
    #[error(transparent)]
    Rpc(#[from] TransportError),
    /// Waiting for a transaction failed.
    #[error(transparent)]
    Pending(#[from] PendingTransactionError),
    /// An error occurred during ABI encoding/decoding.
    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
    /// The transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    /// An internal error occurred.
    #[error(transparent)]
    Internal(#[from] eyre::Error),
}

/// A balance of the master funding account could not be read.
#[derive(Debug, thiserror::Error)]
#[error("failed to read balance of {token} on chain {chain_id}")]
pub struct BalanceReadError {
    /// Network queried.
    pub chain_id: ChainId,
    /// Token queried.
    pub token: Address,
    /// Underlying error.
    #[source]
    pub source: ChainError,
}
