//! Fee storage implementation in-memory.

use super::{CacheApi, LockApi, LockHandle, StorageApi, api::Result};
use crate::{
    error::StorageError,
    types::{AccumulatedFeeRecord, FeeMode, FeeRecordId, FeeRecordUpdate, FeeStatus, LockToken},
};
use alloy::primitives::ChainId;
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use std::time::{Duration, Instant};

/// A cached value with its optional deadline.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|deadline| Instant::now() < deadline)
    }
}

/// [`StorageApi`], [`CacheApi`] and [`LockApi`] implementation in-memory.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    fees: DashMap<FeeRecordId, AccumulatedFeeRecord>,
    cache: DashMap<String, CacheEntry>,
    locks: DashMap<String, (LockToken, Instant)>,
}

#[async_trait]
impl StorageApi for InMemoryStorage {
    async fn read_pending_fee(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
    ) -> Result<Option<AccumulatedFeeRecord>> {
        Ok(self
            .fees
            .iter()
            .filter(|record| {
                record.chain_id == chain_id
                    && record.mode == mode
                    && record.status == FeeStatus::Pending
            })
            .max_by_key(|record| record.start_time)
            .map(|record| record.value().clone()))
    }

    async fn read_fee(&self, id: FeeRecordId) -> Result<Option<AccumulatedFeeRecord>> {
        Ok(self.fees.get(&id).map(|record| record.value().clone()))
    }

    async fn insert_fee(&self, record: &AccumulatedFeeRecord) -> Result<()> {
        self.fees.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_fee(&self, id: FeeRecordId, update: &FeeRecordUpdate) -> Result<()> {
        let mut record = self.fees.get_mut(&id).ok_or(StorageError::RecordNotFound(id))?;
        record.fee_native = update.fee_native;
        record.fee_usd = update.fee_usd;
        record.status = update.status;
        record.updated_at = update.updated_at;
        Ok(())
    }
}

#[async_trait]
impl CacheApi for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.cache.get(key).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        if entry.is_live() {
            return Ok(Some(entry.value));
        }
        self.cache.remove_if(key, |_, entry| !entry.is_live());
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.cache.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        if let Some(mut entry) = self.cache.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}

#[async_trait]
impl LockApi for InMemoryStorage {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockHandle>> {
        let handle = LockHandle::new(key, ttl);
        let expires_at = handle.acquired_at + ttl;
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if Instant::now() < entry.get().1 {
                    return Ok(None);
                }
                entry.insert((handle.token, expires_at));
            }
            Entry::Vacant(entry) => {
                entry.insert((handle.token, expires_at));
            }
        }
        Ok(Some(handle))
    }

    async fn release(&self, handle: &LockHandle) -> Result<()> {
        self.locks.remove_if(&handle.key, |_, (token, _)| *token == handle.token);
        Ok(())
    }
}
