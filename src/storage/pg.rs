//! Fee storage implementation using a PostgreSQL database.

use super::{CacheApi, LockApi, LockHandle, StorageApi, api::Result};
use crate::{
    error::StorageError,
    types::{AccumulatedFeeRecord, FeeMode, FeeRecordId, FeeRecordUpdate, FeeStatus},
};
use alloy::primitives::{ChainId, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::eyre;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::{str::FromStr, time::Duration};
use tracing::{instrument, trace};

/// PostgreSQL storage implementation.
#[derive(Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Creates a new PostgreSQL storage instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the bundled migrations.
    pub async fn migrate(&self) -> eyre::Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

fn record_from_row(row: PgRow) -> Result<AccumulatedFeeRecord> {
    let id: Vec<u8> = row.try_get("id").map_err(eyre::Error::from)?;
    let id = <[u8; 32]>::try_from(id.as_slice())
        .map(FeeRecordId::new)
        .map_err(|_| eyre!("invalid fee record id length {}", id.len()))?;
    let chain_id: i64 = row.try_get("chain_id").map_err(eyre::Error::from)?;
    let mode: String = row.try_get("mode").map_err(eyre::Error::from)?;
    let status: String = row.try_get("status").map_err(eyre::Error::from)?;
    let fee_native: String = row.try_get("fee_native").map_err(eyre::Error::from)?;

    Ok(AccumulatedFeeRecord {
        id,
        chain_id: chain_id as ChainId,
        mode: FeeMode::from_str(&mode).map_err(eyre::Error::from)?,
        fee_native: U256::from_str(&fee_native).map_err(eyre::Error::from)?,
        fee_usd: row.try_get::<Decimal, _>("fee_usd").map_err(eyre::Error::from)?,
        token_symbol: row.try_get("token_symbol").map_err(eyre::Error::from)?,
        status: FeeStatus::from_str(&status).map_err(eyre::Error::from)?,
        start_time: row.try_get::<DateTime<Utc>, _>("start_time").map_err(eyre::Error::from)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(eyre::Error::from)?,
    })
}

#[async_trait]
impl StorageApi for PgStorage {
    #[instrument(skip(self))]
    async fn read_pending_fee(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
    ) -> Result<Option<AccumulatedFeeRecord>> {
        sqlx::query(
            "select * from accumulated_fees where chain_id = $1 and mode = $2 and status = $3 order by start_time desc limit 1",
        )
        .bind(chain_id as i64)
        .bind(mode.as_ref())
        .bind(FeeStatus::Pending.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(eyre::Error::from)?
        .map(record_from_row)
        .transpose()
    }

    #[instrument(skip(self))]
    async fn read_fee(&self, id: FeeRecordId) -> Result<Option<AccumulatedFeeRecord>> {
        sqlx::query("select * from accumulated_fees where id = $1")
            .bind(id.as_slice())
            .fetch_optional(&self.pool)
            .await
            .map_err(eyre::Error::from)?
            .map(record_from_row)
            .transpose()
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn insert_fee(&self, record: &AccumulatedFeeRecord) -> Result<()> {
        sqlx::query(
            "insert into accumulated_fees (id, chain_id, mode, fee_native, fee_usd, token_symbol, status, start_time, updated_at) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id.as_slice())
        .bind(record.chain_id as i64)
        .bind(record.mode.as_ref())
        .bind(record.fee_native.to_string())
        .bind(record.fee_usd)
        .bind(&record.token_symbol)
        .bind(record.status.as_ref())
        .bind(record.start_time)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(eyre::Error::from)?;

        Ok(())
    }

    #[instrument(skip(self, update))]
    async fn update_fee(&self, id: FeeRecordId, update: &FeeRecordUpdate) -> Result<()> {
        let result = sqlx::query(
            "update accumulated_fees set fee_native = $2, fee_usd = $3, status = $4, updated_at = $5 where id = $1",
        )
        .bind(id.as_slice())
        .bind(update.fee_native.to_string())
        .bind(update.fee_usd)
        .bind(update.status.as_ref())
        .bind(update.updated_at)
        .execute(&self.pool)
        .await
        .map_err(eyre::Error::from)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::RecordNotFound(id));
        }

        Ok(())
    }
}

#[async_trait]
impl CacheApi for PgStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "select value from fee_cache where key = $1 and (expires_at is null or expires_at > now())",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(eyre::Error::from)?)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        sqlx::query(
            "insert into fee_cache (key, value, expires_at) values ($1, $2, now() + make_interval(secs => $3)) on conflict (key) do update set value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(ttl.map(|ttl| ttl.as_secs_f64()))
        .execute(&self.pool)
        .await
        .map_err(eyre::Error::from)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("delete from fee_cache where key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(eyre::Error::from)?;

        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        sqlx::query(
            "update fee_cache set expires_at = now() + make_interval(secs => $2) where key = $1",
        )
        .bind(key)
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(eyre::Error::from)?;

        Ok(())
    }
}

#[async_trait]
impl LockApi for PgStorage {
    #[instrument(skip(self))]
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockHandle>> {
        let handle = LockHandle::new(key, ttl);

        // Takes over the row only if the previous owner's lease has lapsed.
        let result = sqlx::query(
            "insert into fee_locks (resource_key, token, expires_at) values ($1, $2, now() + make_interval(secs => $3)) on conflict (resource_key) do update set token = excluded.token, expires_at = excluded.expires_at where fee_locks.expires_at <= now()",
        )
        .bind(key)
        .bind(handle.token.as_slice())
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(eyre::Error::from)?;

        if result.rows_affected() == 0 {
            trace!(key, "Lock is held by another owner");
            return Ok(None);
        }

        Ok(Some(handle))
    }

    #[instrument(skip_all, fields(key = %handle.key))]
    async fn release(&self, handle: &LockHandle) -> Result<()> {
        sqlx::query("delete from fee_locks where resource_key = $1 and token = $2")
            .bind(&handle.key)
            .bind(handle.token.as_slice())
            .execute(&self.pool)
            .await
            .map_err(eyre::Error::from)?;

        Ok(())
    }
}
