use super::ChainReader;
use crate::{
    error::ChainError,
    types::{TxReceipt, TxRequest},
};
use alloy::{
    network::ReceiptResponse,
    primitives::{Address, Bytes, TxHash, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// [`ChainReader`] backed by an alloy provider.
///
/// Sending transactions requires the provider to be built with the master funding account's
/// wallet.
#[derive(Debug, Clone)]
pub struct ProviderChainReader {
    provider: DynProvider,
    confirmation_timeout: Duration,
}

impl ProviderChainReader {
    /// Creates a new [`ProviderChainReader`].
    pub fn new(provider: DynProvider) -> Self {
        Self { provider, confirmation_timeout: Duration::from_secs(300) }
    }

    /// Sets how long to wait for confirmations before giving up.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    fn request(from: Option<Address>, tx: &TxRequest) -> TransactionRequest {
        let request =
            TransactionRequest::default().to(tx.to).input(tx.input.clone().into()).value(tx.value);
        match from {
            Some(from) => request.from(from),
            None => request,
        }
    }
}

#[async_trait]
impl ChainReader for ProviderChainReader {
    async fn native_balance(&self, account: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(account).await?)
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        Ok(self.provider.call(Self::request(None, &TxRequest::call(to, input))).await?)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn estimate_gas(&self, from: Address, tx: &TxRequest) -> Result<u64, ChainError> {
        Ok(self.provider.estimate_gas(Self::request(Some(from), tx)).await?)
    }

    async fn send_transaction(&self, from: Address, tx: TxRequest) -> Result<TxHash, ChainError> {
        let pending = self.provider.send_transaction(Self::request(Some(from), &tx)).await?;
        debug!(tx_hash = %pending.tx_hash(), to = %tx.to, "Sent transaction");
        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(
        &self,
        hash: TxHash,
        confirmations: u64,
    ) -> Result<TxReceipt, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), hash)
            .with_required_confirmations(confirmations)
            .with_timeout(Some(self.confirmation_timeout))
            .get_receipt()
            .await?;

        Ok(TxReceipt {
            transaction_hash: receipt.transaction_hash,
            status: ReceiptResponse::status(&receipt),
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
            block_number: receipt.block_number,
        })
    }
}
