//! Fee storage, cache and lock backends.

mod api;
pub use api::{CacheApi, LockApi, LockHandle, Result, StorageApi};
mod memory;
pub use memory::InMemoryStorage;
mod pg;
pub use pg::PgStorage;

pub use crate::error::StorageError;
use crate::types::{AccumulatedFeeRecord, FeeMode, FeeRecordId, FeeRecordUpdate};
use alloy::primitives::ChainId;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Fee storage interface bundling the durable store, the cache and the lock service.
#[derive(Debug, Clone)]
pub struct FeeStorage {
    inner: Arc<dyn StorageApi>,
    cache: Arc<dyn CacheApi>,
    locks: Arc<dyn LockApi>,
}

impl FeeStorage {
    /// Create [`FeeStorage`] from separate backends.
    pub fn new(
        inner: Arc<dyn StorageApi>,
        cache: Arc<dyn CacheApi>,
        locks: Arc<dyn LockApi>,
    ) -> Self {
        Self { inner, cache, locks }
    }

    /// Create [`FeeStorage`] with a in-memory backend. Suitable for a single process only.
    pub fn in_memory() -> Self {
        let storage = Arc::new(InMemoryStorage::default());
        Self { inner: storage.clone(), cache: storage.clone(), locks: storage }
    }

    /// Create [`FeeStorage`] with a PostgreSQL backend shared by every process.
    pub fn pg(pool: PgPool) -> Self {
        let storage = Arc::new(PgStorage::new(pool));
        Self { inner: storage.clone(), cache: storage.clone(), locks: storage }
    }

    /// Returns the cache.
    pub fn cache(&self) -> &Arc<dyn CacheApi> {
        &self.cache
    }

    /// Returns the lock service.
    pub fn locks(&self) -> &Arc<dyn LockApi> {
        &self.locks
    }
}

#[async_trait]
impl StorageApi for FeeStorage {
    async fn read_pending_fee(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
    ) -> api::Result<Option<AccumulatedFeeRecord>> {
        self.inner.read_pending_fee(chain_id, mode).await
    }

    async fn read_fee(&self, id: FeeRecordId) -> api::Result<Option<AccumulatedFeeRecord>> {
        self.inner.read_fee(id).await
    }

    async fn insert_fee(&self, record: &AccumulatedFeeRecord) -> api::Result<()> {
        self.inner.insert_fee(record).await
    }

    async fn update_fee(&self, id: FeeRecordId, update: &FeeRecordUpdate) -> api::Result<()> {
        self.inner.update_fee(id, update).await
    }
}
