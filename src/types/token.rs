use crate::constants::{NATIVE_ADDRESS_RELAYER, NATIVE_ADDRESS_ROUTER};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// A token tracked on a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Token address, or a native sentinel for the network's native token.
    pub address: Address,
    /// Token symbol, used for price lookups.
    pub symbol: String,
    /// Token decimals.
    pub decimals: u8,
}

impl TokenRecord {
    /// Creates a new [`TokenRecord`].
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self { address, symbol: symbol.into(), decimals }
    }
}

/// Addresses standing in for a network's native token.
///
/// The relayer and bridges use one sentinel, swap aggregators another. Both are recognised
/// everywhere; swaps address the native token through [`NativeSentinels::router`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSentinels {
    /// Sentinel used by the relayer and bridges.
    pub relayer: Address,
    /// Sentinel used by swap aggregators.
    pub router: Address,
}

impl Default for NativeSentinels {
    fn default() -> Self {
        Self { relayer: NATIVE_ADDRESS_RELAYER, router: NATIVE_ADDRESS_ROUTER }
    }
}

impl NativeSentinels {
    /// Whether the address denotes the native token.
    pub fn is_native(&self, address: Address) -> bool {
        address == self.relayer || address == self.router
    }

    /// Whether two addresses denote the same token, treating both sentinels as equal.
    pub fn same_token(&self, a: Address, b: Address) -> bool {
        a == b || (self.is_native(a) && self.is_native(b))
    }
}
