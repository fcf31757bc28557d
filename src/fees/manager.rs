use super::{AccrualOutcome, FeeAccrualLedger};
use crate::{
    chain::Chains,
    config::FeeManagerConfig,
    error::FeeManagerError,
    liquidity::{
        BalanceAggregator, CrossNetworkBalanceValuer, DeltaCalculator, RebalanceExecutor,
        RebalanceMetrics, Rebalance, Rebalancer, RouteFinder, SupportedTokens, bridge::Bridge,
        swap::Swapper,
    },
    price::PriceOracle,
    storage::FeeStorage,
    types::{FeeAccrual, FeeMode, TxReceipt},
};
use alloy::primitives::{ChainId, TxHash, U256};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Accrues the gas fee of every relayed transaction and rebalances the master funding account
/// when a network's accrued spend crosses its threshold.
#[derive(Debug, Clone)]
pub struct FeeManager {
    config: Arc<FeeManagerConfig>,
    chains: Chains,
    valuer: CrossNetworkBalanceValuer,
    tokens: SupportedTokens,
    ledger: FeeAccrualLedger,
    rebalancer: Arc<dyn Rebalance>,
}

impl FeeManager {
    /// Creates a new [`FeeManager`], wiring the rebalancing pipeline from its parts.
    ///
    /// Fails if the configuration is inconsistent.
    pub fn new(
        config: FeeManagerConfig,
        chains: Chains,
        oracle: Arc<dyn PriceOracle>,
        storage: FeeStorage,
        bridge: Arc<dyn Bridge>,
        swapper: Arc<dyn Swapper>,
    ) -> eyre::Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let metrics = Arc::new(RebalanceMetrics::default());

        let valuer = CrossNetworkBalanceValuer::new(
            BalanceAggregator::new(
                chains.clone(),
                config.master_funding_account,
                config.native_sentinels,
            ),
            oracle,
            config.clone(),
        );
        let tokens = SupportedTokens::new(
            bridge.clone(),
            swapper.clone(),
            storage.cache().clone(),
            config.token_list_ttl,
        );
        let finder = RouteFinder::new(
            valuer.clone(),
            tokens.clone(),
            bridge.clone(),
            swapper.clone(),
            config.clone(),
            metrics.clone(),
        );
        let executor = RebalanceExecutor::new(
            finder.clone(),
            chains.clone(),
            bridge,
            swapper,
            config.clone(),
            metrics.clone(),
        );
        let rebalancer = Arc::new(Rebalancer::new(
            valuer.clone(),
            DeltaCalculator::from_config(&config),
            finder,
            executor,
            metrics,
        ));
        let ledger = FeeAccrualLedger::new(storage, config.clone());

        Ok(Self { config, chains, valuer, tokens, ledger, rebalancer })
    }

    /// Replaces the rebalance cycle run when a threshold is crossed.
    pub fn with_rebalancer(mut self, rebalancer: Arc<dyn Rebalance>) -> Self {
        self.rebalancer = rebalancer;
        self
    }

    /// Returns the accrual ledger.
    pub fn ledger(&self) -> &FeeAccrualLedger {
        &self.ledger
    }

    /// Fetches the bridge and swap token lists of every configured network into the cache.
    pub async fn init(&self) -> eyre::Result<()> {
        self.tokens.warm(self.config.chains.keys().copied()).await
    }

    /// Returns the fee paid by a transaction in native units and USD.
    ///
    /// Falls back to the network's current gas price if the receipt carries none.
    pub async fn value_fee(
        &self,
        chain_id: ChainId,
        receipt: &TxReceipt,
    ) -> Result<FeeAccrual, FeeManagerError> {
        let chain = self.config.chain(chain_id).ok_or(FeeManagerError::UnsupportedChain(chain_id))?;

        let gas_price = match receipt.effective_gas_price {
            0 => self.chains.get(chain_id)?.gas_price().await?,
            price => price,
        };
        let native = U256::from(receipt.gas_used).saturating_mul(U256::from(gas_price));
        let usd = self.valuer.native_value(chain_id, native).await?;

        Ok(FeeAccrual { native, usd, token_symbol: chain.native_symbol.clone() })
    }

    /// Accrues the fee of a confirmed transaction.
    #[instrument(skip(self, receipt), fields(tx_hash = %receipt.transaction_hash))]
    pub async fn on_transaction(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
        receipt: &TxReceipt,
    ) -> Result<AccrualOutcome, FeeManagerError> {
        let fee = self.value_fee(chain_id, receipt).await?;
        debug!(fee_native = %fee.native, fee_usd = %fee.usd, "Valued transaction fee");
        self.ledger.record(chain_id, mode, &fee, self.rebalancer.as_ref()).await
    }

    /// Waits for a transaction to be confirmed and accrues its fee.
    pub async fn on_transaction_hash(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
        hash: TxHash,
    ) -> Result<AccrualOutcome, FeeManagerError> {
        let confirmations = self
            .config
            .chain(chain_id)
            .ok_or(FeeManagerError::UnsupportedChain(chain_id))?
            .block_confirmations;
        let receipt = self.chains.get(chain_id)?.wait_for_confirmation(hash, confirmations).await?;
        self.on_transaction(chain_id, mode, &receipt).await
    }
}
