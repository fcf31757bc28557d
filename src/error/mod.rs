//! Fee manager error types.
use alloy::primitives::ChainId;
use thiserror::Error;

use crate::types::FeeMode;

mod chain;
pub use chain::{BalanceReadError, ChainError};

mod pricing;
pub use pricing::{PriceUnavailableError, ValuationError};

mod route;
pub use route::{RouteEstimationError, StepExecutionError, StepFailure};

mod storage;
pub use storage::StorageError;

/// The overarching error type returned when accruing a fee.
#[derive(Debug, Error)]
pub enum FeeManagerError {
    /// Errors talking to a network.
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// A balance could not be read.
    #[error(transparent)]
    BalanceRead(#[from] BalanceReadError),
    /// A USD price was needed but unavailable.
    #[error(transparent)]
    PriceUnavailable(#[from] PriceUnavailableError),
    /// The accrual lock could not be acquired.
    #[error("could not acquire lock {key} after {attempts} attempts")]
    LockAcquisition {
        /// Lock key.
        key: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// The accrual lock expired before the record was written.
    #[error("lock {key} expired before the accrual was persisted")]
    LockLost {
        /// Lock key.
        key: String,
    },
    /// Errors reading or writing the accumulated fee record or its cache.
    #[error(transparent)]
    Persistence(#[from] StorageError),
    /// A rebalance ran but closing the accrual window failed. Funds have moved, so the next
    /// accrual on this window may trigger a second rebalance unless this is reconciled.
    #[error("rebalance on chain {chain_id} ({mode}) completed but closing the window failed")]
    PersistenceAfterRebalance {
        /// Network of the window.
        chain_id: ChainId,
        /// Mode of the window.
        mode: FeeMode,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },
    /// The network is not configured.
    #[error("unsupported chain {0}")]
    UnsupportedChain(ChainId),
    /// The accrued USD total does not fit into a decimal.
    #[error("accrued fee overflows on chain {0}")]
    FeeOverflow(ChainId),
}
