//! Access to the networks the master funding account lives on.

use crate::{
    error::ChainError,
    types::{IERC20, TxReceipt, TxRequest},
};
use alloy::{
    primitives::{Address, Bytes, ChainId, TxHash, U256, map::HashMap},
    sol_types::SolCall,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

mod provider;
pub use provider::ProviderChainReader;

/// Read and write access to a single network.
#[async_trait]
pub trait ChainReader: Debug + Send + Sync {
    /// Returns the native balance of an account.
    async fn native_balance(&self, account: Address) -> Result<U256, ChainError>;

    /// Executes a read-only call.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError>;

    /// Returns the current gas price in wei.
    async fn gas_price(&self) -> Result<u128, ChainError>;

    /// Estimates the gas a transaction sent from `from` would consume.
    async fn estimate_gas(&self, from: Address, tx: &TxRequest) -> Result<u64, ChainError>;

    /// Signs and broadcasts a transaction from `from`.
    async fn send_transaction(&self, from: Address, tx: TxRequest) -> Result<TxHash, ChainError>;

    /// Waits until a transaction has the given number of confirmations and returns its
    /// receipt.
    async fn wait_for_confirmation(
        &self,
        hash: TxHash,
        confirmations: u64,
    ) -> Result<TxReceipt, ChainError>;
}

/// [`ChainReader`]s keyed by network.
#[derive(Debug, Clone, Default)]
pub struct Chains {
    readers: HashMap<ChainId, Arc<dyn ChainReader>>,
}

impl Chains {
    /// Creates a registry from `(chain, reader)` pairs.
    pub fn new(readers: impl IntoIterator<Item = (ChainId, Arc<dyn ChainReader>)>) -> Self {
        Self { readers: readers.into_iter().collect() }
    }

    /// Registers a reader for a network.
    pub fn insert(&mut self, chain_id: ChainId, reader: Arc<dyn ChainReader>) {
        self.readers.insert(chain_id, reader);
    }

    /// Returns the reader of a network.
    pub fn get(&self, chain_id: ChainId) -> Result<&Arc<dyn ChainReader>, ChainError> {
        self.readers.get(&chain_id).ok_or(ChainError::UnsupportedChain(chain_id))
    }

    /// Returns the ERC20 balance of `account`.
    pub async fn erc20_balance(
        &self,
        chain_id: ChainId,
        token: Address,
        account: Address,
    ) -> Result<U256, ChainError> {
        let output = self
            .get(chain_id)?
            .call(token, IERC20::balanceOfCall { account }.abi_encode().into())
            .await?;
        Ok(IERC20::balanceOfCall::abi_decode_returns(&output)?)
    }

    /// Returns the ERC20 allowance `owner` granted to `spender`.
    pub async fn erc20_allowance(
        &self,
        chain_id: ChainId,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        let output = self
            .get(chain_id)?
            .call(token, IERC20::allowanceCall { owner, spender }.abi_encode().into())
            .await?;
        Ok(IERC20::allowanceCall::abi_decode_returns(&output)?)
    }

    /// Returns the decimals of an ERC20 token.
    pub async fn erc20_decimals(
        &self,
        chain_id: ChainId,
        token: Address,
    ) -> Result<u8, ChainError> {
        let output =
            self.get(chain_id)?.call(token, IERC20::decimalsCall {}.abi_encode().into()).await?;
        Ok(IERC20::decimalsCall::abi_decode_returns(&output)?)
    }

    /// Sends a transaction and waits for its confirmation, failing if it reverted.
    pub async fn send_and_confirm(
        &self,
        chain_id: ChainId,
        from: Address,
        tx: TxRequest,
        confirmations: u64,
    ) -> Result<TxReceipt, ChainError> {
        let reader = self.get(chain_id)?;
        let hash = reader.send_transaction(from, tx).await?;
        let receipt = reader.wait_for_confirmation(hash, confirmations).await?;
        if !receipt.status {
            return Err(ChainError::Reverted(hash));
        }
        Ok(receipt)
    }
}

/// Returns the transaction approving `spender` to pull `amount` of `token`.
pub fn approve_tx(token: Address, spender: Address, amount: U256) -> TxRequest {
    TxRequest::call(token, IERC20::approveCall { spender, amount }.abi_encode())
}
