use crate::{
    chain::Chains,
    config::FeeManagerConfig,
    error::{BalanceReadError, ChainError, PriceUnavailableError, ValuationError},
    price::PriceOracle,
    types::{NativeSentinels, TokenRecord, usd_value},
};
use alloy::primitives::{Address, ChainId, U256};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, warn};

/// Reads balances of the master funding account.
#[derive(Debug, Clone)]
pub struct BalanceAggregator {
    chains: Chains,
    account: Address,
    sentinels: NativeSentinels,
}

impl BalanceAggregator {
    /// Creates a new [`BalanceAggregator`].
    pub fn new(chains: Chains, account: Address, sentinels: NativeSentinels) -> Self {
        Self { chains, account, sentinels }
    }

    /// Returns the account whose balances are read.
    pub fn account(&self) -> Address {
        self.account
    }

    /// Returns the chain readers.
    pub fn chains(&self) -> &Chains {
        &self.chains
    }

    /// Returns the native token sentinels.
    pub fn sentinels(&self) -> &NativeSentinels {
        &self.sentinels
    }

    /// Returns the balance of `token` on `chain_id`. Native sentinels read the native balance.
    pub async fn balance(
        &self,
        chain_id: ChainId,
        token: Address,
    ) -> Result<U256, BalanceReadError> {
        self.read(chain_id, token)
            .await
            .map_err(|source| BalanceReadError { chain_id, token, source })
    }

    async fn read(&self, chain_id: ChainId, token: Address) -> Result<U256, ChainError> {
        if self.sentinels.is_native(token) {
            self.chains.get(chain_id)?.native_balance(self.account).await
        } else {
            self.chains.erc20_balance(chain_id, token, self.account).await
        }
    }
}

/// Values the master funding account in USD on every configured network.
#[derive(Debug, Clone)]
pub struct CrossNetworkBalanceValuer {
    balances: BalanceAggregator,
    oracle: Arc<dyn PriceOracle>,
    config: Arc<FeeManagerConfig>,
}

impl CrossNetworkBalanceValuer {
    /// Creates a new [`CrossNetworkBalanceValuer`].
    pub fn new(
        balances: BalanceAggregator,
        oracle: Arc<dyn PriceOracle>,
        config: Arc<FeeManagerConfig>,
    ) -> Self {
        Self { balances, oracle, config }
    }

    /// Returns the balance reader.
    pub fn balances(&self) -> &BalanceAggregator {
        &self.balances
    }

    /// Returns the USD value of the account on each network.
    ///
    /// Tokens that fail to be read or priced are skipped. A network on which every token failed
    /// is left out, as its balance is unknown rather than zero.
    pub async fn snapshot(&self) -> BTreeMap<ChainId, Decimal> {
        let networks = self.config.chains.iter().map(async |(chain_id, chain)| {
            let values =
                join_all(chain.tokens.iter().map(|token| self.token_value(*chain_id, token)))
                    .await;

            let mut total = None;
            for (token, value) in chain.tokens.iter().zip(values) {
                match value {
                    Ok(value) => {
                        total = Some(total.unwrap_or(Decimal::ZERO).saturating_add(value));
                    }
                    Err(err) => {
                        warn!(
                            chain_id,
                            token = %token.address,
                            %err,
                            "Skipping token in balance snapshot"
                        );
                    }
                }
            }

            if total.is_none() {
                warn!(chain_id, "Balance unknown, every token failed");
            }
            total.map(|total| (*chain_id, total))
        });

        let snapshot: BTreeMap<_, _> = join_all(networks).await.into_iter().flatten().collect();
        debug!(?snapshot, "Took balance snapshot");
        snapshot
    }

    /// Returns the USD value of the account's balance of a tracked token.
    pub async fn token_value(
        &self,
        chain_id: ChainId,
        token: &TokenRecord,
    ) -> Result<Decimal, ValuationError> {
        let balance = self.balances.balance(chain_id, token.address).await?;
        let price = self.token_price(chain_id, token).await?;
        usd_value(balance, token.decimals, price)
            .ok_or(PriceUnavailableError::Overflow { chain_id, token: token.address }.into())
    }

    /// Returns the USD value of `amount` of any token on `chain_id`.
    ///
    /// Tracked tokens are priced by symbol, others by address with decimals read on-chain.
    pub async fn value_of(
        &self,
        chain_id: ChainId,
        token: Address,
        amount: U256,
    ) -> Result<Decimal, ValuationError> {
        let record = match self.tracked_token(chain_id, token) {
            Some(record) => record,
            None => {
                let decimals =
                    self.balances.chains().erc20_decimals(chain_id, token).await.map_err(
                        |source| ValuationError::Decimals { chain_id, token, source },
                    )?;
                TokenRecord::new(token, String::new(), decimals)
            }
        };
        let price = self.token_price(chain_id, &record).await?;
        usd_value(amount, record.decimals, price)
            .ok_or(PriceUnavailableError::Overflow { chain_id, token }.into())
    }

    /// Returns the USD value of `amount` of the native token of `chain_id`.
    pub async fn native_value(
        &self,
        chain_id: ChainId,
        amount: U256,
    ) -> Result<Decimal, PriceUnavailableError> {
        let native = self
            .config
            .native_token(chain_id)
            .ok_or(PriceUnavailableError::NativeTokenUnknown(chain_id))?;
        let price = self.symbol_price(chain_id, native).await?;
        usd_value(amount, native.decimals, price)
            .ok_or(PriceUnavailableError::Overflow { chain_id, token: native.address })
    }

    fn tracked_token(&self, chain_id: ChainId, token: Address) -> Option<TokenRecord> {
        if self.balances.sentinels().is_native(token) {
            return self.config.native_token(chain_id).cloned();
        }
        self.config.chain(chain_id)?.token(token).cloned()
    }

    async fn token_price(
        &self,
        chain_id: ChainId,
        token: &TokenRecord,
    ) -> Result<Decimal, PriceUnavailableError> {
        if self.balances.sentinels().is_native(token.address) {
            let native = self
                .config
                .native_token(chain_id)
                .ok_or(PriceUnavailableError::NativeTokenUnknown(chain_id))?;
            return self.symbol_price(chain_id, native).await;
        }
        if !token.symbol.is_empty()
            && let Some(price) = self.oracle.usd_price(&token.symbol).await
        {
            return Ok(price);
        }
        self.oracle
            .usd_price_by_address(chain_id, token.address)
            .await
            .ok_or(PriceUnavailableError::Token { chain_id, token: token.address })
    }

    async fn symbol_price(
        &self,
        chain_id: ChainId,
        native: &TokenRecord,
    ) -> Result<Decimal, PriceUnavailableError> {
        let symbol = self
            .config
            .chain(chain_id)
            .map(|chain| chain.native_symbol.as_str())
            .unwrap_or(native.symbol.as_str());
        self.oracle
            .usd_price(symbol)
            .await
            .ok_or_else(|| PriceUnavailableError::Symbol(symbol.to_string()))
    }
}
