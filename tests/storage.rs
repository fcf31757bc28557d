//! PostgreSQL backend tests.
//!
//! Run against a scratch database with `DATABASE_URL` set and `--ignored`.

use alloy::primitives::U256;
use fee_manager::{
    storage::{FeeStorage, PgStorage, StorageApi},
    types::{AccumulatedFeeRecord, FeeAccrual, FeeMode, FeeStatus},
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::time::Duration;

async fn storage() -> eyre::Result<FeeStorage> {
    let pool = PgPool::connect(&std::env::var("DATABASE_URL").expect("set DATABASE_URL")).await?;
    PgStorage::new(pool.clone()).migrate().await?;
    Ok(FeeStorage::pg(pool))
}

/// A chain id unlikely to collide with rows left by earlier runs.
fn chain_id() -> u64 {
    rand::random::<u32>() as u64
}

#[tokio::test]
#[ignore]
async fn fee_record_roundtrip() -> eyre::Result<()> {
    let storage = storage().await?;
    let chain_id = chain_id();
    let fee = FeeAccrual {
        native: U256::from(102_453),
        usd: Decimal::new(204_906, 6),
        token_symbol: "ETH".into(),
    };

    let record = AccumulatedFeeRecord::open(chain_id, FeeMode::CrossNetwork, &fee);
    storage.insert_fee(&record).await?;

    let pending = storage.read_pending_fee(chain_id, FeeMode::CrossNetwork).await?.unwrap();
    assert_eq!(pending.id, record.id);
    assert_eq!(pending.fee_native, record.fee_native);
    assert_eq!(pending.fee_usd, record.fee_usd);
    assert!(storage.read_pending_fee(chain_id, FeeMode::SingleNetwork).await?.is_none());

    let accrued = record.accrue(&fee).unwrap();
    storage.update_fee(record.id, &accrued.update(FeeStatus::Complete)).await?;

    let stored = storage.read_fee(record.id).await?.unwrap();
    assert_eq!(stored.status, FeeStatus::Complete);
    assert_eq!(stored.fee_native, U256::from(204_906));
    assert_eq!(stored.fee_usd, Decimal::new(409_812, 6));
    assert!(storage.read_pending_fee(chain_id, FeeMode::CrossNetwork).await?.is_none());

    Ok(())
}

#[tokio::test]
#[ignore]
async fn lock_is_exclusive_until_released() -> eyre::Result<()> {
    let storage = storage().await?;
    let key = format!("locks:{}_test", chain_id());

    let held = storage.locks().try_acquire(&key, Duration::from_secs(60)).await?.unwrap();
    assert!(storage.locks().try_acquire(&key, Duration::from_secs(60)).await?.is_none());

    storage.locks().release(&held).await?;
    let next = storage.locks().try_acquire(&key, Duration::from_secs(60)).await?.unwrap();
    assert_ne!(next.token, held.token);

    // releasing a lock we no longer own leaves the new owner in place
    storage.locks().release(&held).await?;
    assert!(storage.locks().try_acquire(&key, Duration::from_secs(60)).await?.is_none());
    storage.locks().release(&next).await?;

    Ok(())
}

#[tokio::test]
#[ignore]
async fn cache_entries_expire() -> eyre::Result<()> {
    let storage = storage().await?;
    let key = format!("test:{}", chain_id());

    storage.cache().set(&key, "value".into(), Some(Duration::from_secs(1))).await?;
    assert_eq!(storage.cache().get(&key).await?.as_deref(), Some("value"));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(storage.cache().get(&key).await?.is_none());

    storage.cache().set(&key, "value".into(), None).await?;
    storage.cache().delete(&key).await?;
    assert!(storage.cache().get(&key).await?.is_none());

    Ok(())
}
