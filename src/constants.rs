//! Fee manager constants.

use alloy::primitives::{Address, address};
use std::time::Duration;

/// Native token sentinel used by the relayer and the bridge.
pub const NATIVE_ADDRESS_RELAYER: Address = Address::ZERO;

/// Native token sentinel used by swap aggregators.
pub const NATIVE_ADDRESS_ROUTER: Address = address!("0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// Default lifetime of the per-network accrual lock.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(600);

/// Default wall-clock budget for a single rebalance cycle. Must stay below the lock TTL.
pub const DEFAULT_REBALANCE_BUDGET: Duration = Duration::from_secs(540);

/// Default lifetime of a cached accumulated fee record.
pub const DEFAULT_ACCUMULATED_FEE_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Default lifetime of cached bridge and swap token lists.
pub const DEFAULT_TOKEN_LIST_CACHE_TTL: Duration = Duration::from_secs(3_600);

/// Default number of attempts made to acquire an accrual lock.
pub const DEFAULT_LOCK_RETRY_COUNT: u32 = 10;

/// Default delay between lock acquisition attempts.
pub const DEFAULT_LOCK_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Gas left unspent when moving a network's native token, so the account can still pay for
/// transactions afterwards.
pub const NATIVE_GAS_RESERVE: u64 = 1_000_000;

/// Default number of block confirmations awaited for rebalance transactions.
pub const DEFAULT_BLOCK_CONFIRMATIONS: u64 = 1;

/// Prefix of the cache key holding the open accumulated fee record of a network.
pub const ACCUMULATED_FEE_KEY_PREFIX: &str = "accumulated_fee";

/// Prefix of the cache key holding the bridge token list of a network.
pub const BRIDGE_TOKENS_KEY_PREFIX: &str = "bridge_tokens";

/// Prefix of the cache key holding the swap token list of a network.
pub const SWAP_TOKENS_KEY_PREFIX: &str = "swap_tokens";
