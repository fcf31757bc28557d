//! Fee storage api.

use super::StorageError;
use crate::types::{AccumulatedFeeRecord, FeeMode, FeeRecordId, FeeRecordUpdate, LockToken};
use alloy::primitives::ChainId;
use async_trait::async_trait;
use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

/// Type alias for `Result<T, StorageError>`
pub type Result<T> = core::result::Result<T, StorageError>;

/// Durable store of accumulated fee records.
#[async_trait]
pub trait StorageApi: Debug + Send + Sync {
    /// Reads the open [`FeeStatus::Pending`](crate::types::FeeStatus::Pending) record of a
    /// network and mode.
    async fn read_pending_fee(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
    ) -> Result<Option<AccumulatedFeeRecord>>;

    /// Reads a record by id.
    async fn read_fee(&self, id: FeeRecordId) -> Result<Option<AccumulatedFeeRecord>>;

    /// Inserts a new record.
    async fn insert_fee(&self, record: &AccumulatedFeeRecord) -> Result<()>;

    /// Updates the totals and status of a record.
    async fn update_fee(&self, id: FeeRecordId, update: &FeeRecordUpdate) -> Result<()>;
}

/// Key-value cache with expiry, shared by every process relaying for the same account.
#[async_trait]
pub trait CacheApi: Debug + Send + Sync {
    /// Returns the value of a key if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Sets the value of a key, expiring after `ttl` if given.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Removes a key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Sets the expiry of an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}

/// A held lock.
///
/// The lock lapses once its TTL elapses, whether or not it was released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// Locked resource.
    pub key: String,
    /// Owner token, checked on release.
    pub token: LockToken,
    /// When the lock was acquired.
    pub acquired_at: Instant,
    /// Lock lifetime.
    pub ttl: Duration,
}

impl LockHandle {
    /// Creates a handle for a lock acquired now with a fresh owner token.
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            token: LockToken::generate(),
            acquired_at: Instant::now(),
            ttl,
        }
    }

    /// Whether the lock's TTL has elapsed.
    pub fn is_expired(&self) -> bool {
        self.acquired_at.elapsed() >= self.ttl
    }
}

/// Mutual exclusion across every process relaying for the same account.
#[async_trait]
pub trait LockApi: Debug + Send + Sync {
    /// Acquires the lock on `key` for `ttl`. Returns `None` if another owner holds it.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockHandle>>;

    /// Releases a held lock. Releasing a lapsed lock now owned by someone else is a no-op.
    async fn release(&self, handle: &LockHandle) -> Result<()>;
}
