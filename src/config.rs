//! Fee manager configuration.

use crate::{
    constants::{
        DEFAULT_ACCUMULATED_FEE_CACHE_TTL, DEFAULT_BLOCK_CONFIRMATIONS, DEFAULT_LOCK_RETRY_COUNT,
        DEFAULT_LOCK_RETRY_DELAY, DEFAULT_LOCK_TTL, DEFAULT_REBALANCE_BUDGET,
        DEFAULT_TOKEN_LIST_CACHE_TTL,
    },
    types::{NativeSentinels, TokenRecord},
};
use alloy::primitives::{Address, ChainId, map::HashMap};
use eyre::{Context, ensure};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Fee manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeManagerConfig {
    /// The master funding account whose balances are rebalanced.
    pub master_funding_account: Address,
    /// Per-network configuration.
    #[serde(with = "crate::serde::hash_map")]
    pub chains: HashMap<ChainId, ChainConfig>,
    /// Addresses standing in for native tokens.
    #[serde(default)]
    pub native_sentinels: NativeSentinels,
    /// Accrual ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Lifetime of cached bridge and swap token lists.
    #[serde(with = "crate::serde::duration", default = "default_token_list_ttl")]
    pub token_list_ttl: Duration,
}

fn default_token_list_ttl() -> Duration {
    DEFAULT_TOKEN_LIST_CACHE_TTL
}

fn default_block_confirmations() -> u64 {
    DEFAULT_BLOCK_CONFIRMATIONS
}

/// Per-network configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Symbol of the native token, used for price lookups.
    pub native_symbol: String,
    /// Tokens of the master funding account tracked on this network, including the native
    /// token under a native sentinel.
    pub tokens: Vec<TokenRecord>,
    /// Accrued USD spend above which a rebalance is triggered.
    pub fee_spend_threshold_usd: Decimal,
    /// Target USD balance of the master funding account. Networks without a target take no
    /// part in rebalancing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_funding_usd: Option<Decimal>,
    /// Confirmations awaited for rebalance transactions.
    #[serde(default = "default_block_confirmations")]
    pub block_confirmations: u64,
    /// USD balance per token above which the token is swapped into the native token when a
    /// single network window triggers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty", with = "crate::serde::hash_map")]
    pub consolidation_thresholds: HashMap<Address, Decimal>,
}

impl ChainConfig {
    /// Creates a [`ChainConfig`] with the given native symbol and spend threshold.
    pub fn new(native_symbol: impl Into<String>, fee_spend_threshold_usd: Decimal) -> Self {
        Self {
            native_symbol: native_symbol.into(),
            tokens: Vec::new(),
            fee_spend_threshold_usd,
            target_funding_usd: None,
            block_confirmations: DEFAULT_BLOCK_CONFIRMATIONS,
            consolidation_thresholds: HashMap::default(),
        }
    }

    /// Adds a tracked token.
    pub fn with_token(mut self, token: TokenRecord) -> Self {
        self.tokens.push(token);
        self
    }

    /// Sets the target funding in USD.
    pub fn with_target_funding(mut self, target: Decimal) -> Self {
        self.target_funding_usd = Some(target);
        self
    }

    /// Sets the confirmations awaited for rebalance transactions.
    pub fn with_block_confirmations(mut self, confirmations: u64) -> Self {
        self.block_confirmations = confirmations;
        self
    }

    /// Sets the consolidation threshold of a token.
    pub fn with_consolidation_threshold(mut self, token: Address, threshold: Decimal) -> Self {
        self.consolidation_thresholds.insert(token, threshold);
        self
    }

    /// Returns the tracked token with the given address.
    pub fn token(&self, address: Address) -> Option<&TokenRecord> {
        self.tokens.iter().find(|token| token.address == address)
    }

    /// Returns the tracked native token.
    pub fn native_token(&self, sentinels: &NativeSentinels) -> Option<&TokenRecord> {
        self.tokens.iter().find(|token| sentinels.is_native(token.address))
    }
}

/// Accrual ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerConfig {
    /// Lifetime of the per-network accrual lock.
    #[serde(with = "crate::serde::duration")]
    pub lock_ttl: Duration,
    /// Attempts made to acquire the accrual lock.
    pub lock_retry_count: u32,
    /// Delay between lock acquisition attempts.
    #[serde(with = "crate::serde::duration_ms")]
    pub lock_retry_delay: Duration,
    /// Lifetime of a cached accumulated fee record.
    #[serde(with = "crate::serde::duration")]
    pub cache_ttl: Duration,
    /// Wall-clock budget of a rebalance cycle. Must be below `lock_ttl`.
    #[serde(with = "crate::serde::duration")]
    pub rebalance_budget: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_ttl: DEFAULT_LOCK_TTL,
            lock_retry_count: DEFAULT_LOCK_RETRY_COUNT,
            lock_retry_delay: DEFAULT_LOCK_RETRY_DELAY,
            cache_ttl: DEFAULT_ACCUMULATED_FEE_CACHE_TTL,
            rebalance_budget: DEFAULT_REBALANCE_BUDGET,
        }
    }
}

impl FeeManagerConfig {
    /// Creates a configuration for the given master funding account without any networks.
    pub fn new(master_funding_account: Address) -> Self {
        Self {
            master_funding_account,
            chains: HashMap::default(),
            native_sentinels: NativeSentinels::default(),
            ledger: LedgerConfig::default(),
            token_list_ttl: DEFAULT_TOKEN_LIST_CACHE_TTL,
        }
    }

    /// Adds a network.
    pub fn with_chain(mut self, chain_id: ChainId, chain: ChainConfig) -> Self {
        self.chains.insert(chain_id, chain);
        self
    }

    /// Sets the native sentinels.
    pub fn with_native_sentinels(mut self, sentinels: NativeSentinels) -> Self {
        self.native_sentinels = sentinels;
        self
    }

    /// Sets the ledger configuration.
    pub fn with_ledger(mut self, ledger: LedgerConfig) -> Self {
        self.ledger = ledger;
        self
    }

    /// Returns the configuration of a network.
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    /// Returns the native token of a network.
    pub fn native_token(&self, chain_id: ChainId) -> Option<&TokenRecord> {
        self.chain(chain_id)?.native_token(&self.native_sentinels)
    }

    /// Checks the configuration for inconsistencies.
    pub fn validate(&self) -> eyre::Result<()> {
        ensure!(!self.master_funding_account.is_zero(), "master funding account is not set");
        ensure!(!self.chains.is_empty(), "no chains configured");
        ensure!(
            self.ledger.rebalance_budget < self.ledger.lock_ttl,
            "rebalance budget {:?} must be below lock ttl {:?}",
            self.ledger.rebalance_budget,
            self.ledger.lock_ttl
        );
        ensure!(self.ledger.lock_retry_count > 0, "lock retry count must be positive");

        for (chain_id, chain) in &self.chains {
            ensure!(!chain.native_symbol.is_empty(), "chain {chain_id} has no native symbol");
            ensure!(
                chain.fee_spend_threshold_usd > Decimal::ZERO,
                "chain {chain_id} fee spend threshold must be positive"
            );
            ensure!(
                chain.native_token(&self.native_sentinels).is_some(),
                "chain {chain_id} does not track its native token"
            );
            if let Some(target) = chain.target_funding_usd {
                ensure!(target >= Decimal::ZERO, "chain {chain_id} target funding is negative");
            }
        }

        Ok(())
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
