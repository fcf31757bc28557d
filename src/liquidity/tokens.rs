//! Supported token list caching
//!
//! Bridge and swap token lists change rarely, so they are kept in the shared cache with an
//! expiry instead of being fetched for every candidate route.

use super::{
    bridge::{Bridge, BridgeTokenMap},
    swap::{SwapTokenList, Swapper},
};
use crate::{
    constants::{BRIDGE_TOKENS_KEY_PREFIX, SWAP_TOKENS_KEY_PREFIX},
    storage::CacheApi,
};
use alloy::primitives::ChainId;
use serde::{Serialize, de::DeserializeOwned};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Cache key of the bridge token list of a network.
pub fn bridge_tokens_key(chain_id: ChainId) -> String {
    format!("{BRIDGE_TOKENS_KEY_PREFIX}:{chain_id}")
}

/// Cache key of the swap token list of a network.
pub fn swap_tokens_key(chain_id: ChainId) -> String {
    format!("{SWAP_TOKENS_KEY_PREFIX}:{chain_id}")
}

/// Bridge and swap token lists, read through the shared cache.
#[derive(Debug, Clone)]
pub struct SupportedTokens {
    bridge: Arc<dyn Bridge>,
    swapper: Arc<dyn Swapper>,
    cache: Arc<dyn CacheApi>,
    ttl: Duration,
}

impl SupportedTokens {
    /// Creates a new [`SupportedTokens`].
    pub fn new(
        bridge: Arc<dyn Bridge>,
        swapper: Arc<dyn Swapper>,
        cache: Arc<dyn CacheApi>,
        ttl: Duration,
    ) -> Self {
        Self { bridge, swapper, cache, ttl }
    }

    /// Returns the bridge token map of a network.
    pub async fn bridge_tokens(&self, chain_id: ChainId) -> eyre::Result<BridgeTokenMap> {
        self.cached(bridge_tokens_key(chain_id), || self.bridge.supported_tokens(chain_id)).await
    }

    /// Returns the swap token list of a network.
    pub async fn swap_tokens(&self, chain_id: ChainId) -> eyre::Result<SwapTokenList> {
        self.cached(swap_tokens_key(chain_id), || self.swapper.supported_tokens(chain_id)).await
    }

    /// Fetches and caches both lists for every given network.
    pub async fn warm(&self, chains: impl IntoIterator<Item = ChainId>) -> eyre::Result<()> {
        for chain_id in chains {
            self.bridge_tokens(chain_id).await?;
            self.swap_tokens(chain_id).await?;
        }
        Ok(())
    }

    async fn cached<T, F, Fut>(&self, key: String, fetch: F) -> eyre::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = eyre::Result<T>>,
    {
        match self.cache.get(&key).await {
            Ok(Some(value)) => match serde_json::from_str(&value) {
                Ok(value) => return Ok(value),
                Err(err) => warn!(%key, %err, "Discarding malformed cached token list"),
            },
            Ok(None) => {}
            Err(err) => warn!(%key, %err, "Failed to read cached token list"),
        }

        let value = fetch().await?;
        debug!(%key, "Caching token list");
        if let Err(err) = self.cache.set(&key, serde_json::to_string(&value)?, Some(self.ttl)).await
        {
            warn!(%key, %err, "Failed to cache token list");
        }
        Ok(value)
    }
}
