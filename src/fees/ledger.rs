use super::LedgerMetrics;
use crate::{
    config::FeeManagerConfig,
    constants::ACCUMULATED_FEE_KEY_PREFIX,
    error::{FeeManagerError, StorageError},
    liquidity::{Rebalance, RebalanceReport},
    storage::{FeeStorage, LockHandle, StorageApi},
    types::{AccumulatedFeeRecord, FeeAccrual, FeeMode, FeeStatus},
};
use alloy::primitives::{Address, ChainId};
use eyre::eyre;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

/// Returns the key of the accrual lock of a network and mode.
pub fn lock_key(chain_id: ChainId, account: Address, mode: FeeMode) -> String {
    format!("locks:{chain_id}_{account}_{mode}")
}

/// Returns the cache key of the open accumulated fee record of a network and mode.
pub fn accumulated_fee_key(chain_id: ChainId, mode: FeeMode) -> String {
    format!("{ACCUMULATED_FEE_KEY_PREFIX}:{chain_id}:{mode}")
}

/// What recording a fee did.
#[derive(Debug)]
pub enum AccrualOutcome {
    /// No window was open, a new one was opened holding the fee.
    WindowOpened {
        /// The new record.
        record: AccumulatedFeeRecord,
    },
    /// The fee was added to the open window, which stayed below its threshold.
    Accrued {
        /// The updated record.
        record: AccumulatedFeeRecord,
    },
    /// The threshold was crossed, a rebalance ran and the window was closed.
    Rebalanced {
        /// The closed record.
        record: AccumulatedFeeRecord,
        /// What the rebalance did.
        report: RebalanceReport,
    },
    /// The threshold was crossed but the rebalance could not run. The window stays open with
    /// the fee added, so the next fee triggers again.
    RebalanceFailed {
        /// The updated record.
        record: AccumulatedFeeRecord,
        /// Why the rebalance did not run.
        error: eyre::Report,
    },
}

impl AccrualOutcome {
    /// Returns the record as persisted.
    pub fn record(&self) -> &AccumulatedFeeRecord {
        match self {
            Self::WindowOpened { record }
            | Self::Accrued { record }
            | Self::Rebalanced { record, .. }
            | Self::RebalanceFailed { record, .. } => record,
        }
    }
}

/// Running totals of gas fees spent per network and mode.
///
/// Every read-modify-write of a record happens under a lock shared by all processes relaying
/// for the same master funding account. The open record is read from the cache first and from
/// durable storage on a miss.
#[derive(Debug, Clone)]
pub struct FeeAccrualLedger {
    storage: FeeStorage,
    config: Arc<FeeManagerConfig>,
    metrics: Arc<LedgerMetrics>,
}

impl FeeAccrualLedger {
    /// Creates a new [`FeeAccrualLedger`].
    pub fn new(storage: FeeStorage, config: Arc<FeeManagerConfig>) -> Self {
        Self { storage, config, metrics: Arc::new(LedgerMetrics::default()) }
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &FeeStorage {
        &self.storage
    }

    /// Records a fee spent on `chain_id`, running `rebalance` if the window crosses the
    /// network's threshold.
    ///
    /// The lock is released on every path, including errors.
    #[instrument(skip(self, fee, rebalance), fields(fee_usd = %fee.usd))]
    pub async fn record(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
        fee: &FeeAccrual,
        rebalance: &dyn Rebalance,
    ) -> Result<AccrualOutcome, FeeManagerError> {
        let threshold = self
            .config
            .chain(chain_id)
            .ok_or(FeeManagerError::UnsupportedChain(chain_id))?
            .fee_spend_threshold_usd;
        self.metrics.events.increment(1);

        let lock = self.acquire_lock(chain_id, mode).await?;
        let result = self.record_locked(chain_id, mode, fee, threshold, &lock, rebalance).await;

        if let Err(err) = self.storage.locks().release(&lock).await {
            warn!(key = %lock.key, %err, "Failed to release lock, it will lapse after its ttl");
        }

        result
    }

    async fn acquire_lock(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
    ) -> Result<LockHandle, FeeManagerError> {
        let key = lock_key(chain_id, self.config.master_funding_account, mode);
        let ledger = &self.config.ledger;

        for attempt in 1..=ledger.lock_retry_count {
            match self.storage.locks().try_acquire(&key, ledger.lock_ttl).await {
                Ok(Some(lock)) => {
                    trace!(%key, attempt, "Acquired lock");
                    return Ok(lock);
                }
                Ok(None) => trace!(%key, attempt, "Lock busy"),
                Err(err) => warn!(%key, attempt, %err, "Failed to acquire lock"),
            }
            if attempt < ledger.lock_retry_count {
                tokio::time::sleep(ledger.lock_retry_delay).await;
            }
        }

        self.metrics.lock_failures.increment(1);
        error!(
            %key,
            attempts = ledger.lock_retry_count,
            "Could not acquire lock, dropping fee event"
        );
        Err(FeeManagerError::LockAcquisition { key, attempts: ledger.lock_retry_count })
    }

    /// Fails if the lock lapsed, as another process may now hold it.
    fn ensure_held(&self, lock: &LockHandle) -> Result<(), FeeManagerError> {
        if lock.is_expired() {
            self.metrics.locks_lost.increment(1);
            error!(key = %lock.key, "Lock lapsed, aborting without persisting");
            return Err(FeeManagerError::LockLost { key: lock.key.clone() });
        }
        Ok(())
    }

    async fn record_locked(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
        fee: &FeeAccrual,
        threshold: Decimal,
        lock: &LockHandle,
        rebalance: &dyn Rebalance,
    ) -> Result<AccrualOutcome, FeeManagerError> {
        let cache_key = accumulated_fee_key(chain_id, mode);

        let current = match self.read_cached(&cache_key, chain_id, mode).await {
            Some(record) => Some(record),
            None => self.storage.read_pending_fee(chain_id, mode).await?,
        };

        let Some(current) = current else {
            self.storage.cache().delete(&cache_key).await?;
            let record = AccumulatedFeeRecord::open(chain_id, mode, fee);
            self.ensure_held(lock)?;
            self.storage.insert_fee(&record).await?;
            self.metrics.windows_opened.increment(1);
            info!(id = %record.id, fee_usd = %record.fee_usd, "Opened accrual window");
            return Ok(AccrualOutcome::WindowOpened { record });
        };

        let updated = current.accrue(fee).ok_or(FeeManagerError::FeeOverflow(chain_id))?;

        if updated.fee_usd <= threshold {
            self.ensure_held(lock)?;
            self.storage.update_fee(updated.id, &updated.update(FeeStatus::Pending)).await?;
            self.cache_record(&cache_key, &updated).await?;
            debug!(id = %updated.id, fee_usd = %updated.fee_usd, %threshold, "Accrued fee");
            return Ok(AccrualOutcome::Accrued { record: updated });
        }

        info!(
            id = %updated.id,
            fee_usd = %updated.fee_usd,
            %threshold,
            "Fee spend threshold crossed, rebalancing"
        );
        self.metrics.rebalances_triggered.increment(1);

        // A crash mid-cycle leaves the window PROCESSING and out of the cache, so the next fee
        // opens a fresh window instead of re-triggering.
        self.ensure_held(lock)?;
        self.storage.update_fee(updated.id, &updated.update(FeeStatus::Processing)).await?;
        self.storage.cache().delete(&cache_key).await?;

        let budget = self.config.ledger.rebalance_budget;
        let cycle = tokio::time::timeout(budget, rebalance.rebalance(chain_id, mode))
            .await
            .unwrap_or_else(|_| Err(eyre!("rebalance exceeded its budget of {budget:?}")));

        self.ensure_held(lock)?;
        match cycle {
            Ok(report) => {
                let record = AccumulatedFeeRecord { status: FeeStatus::Complete, ..updated };
                self.storage
                    .update_fee(record.id, &record.update(FeeStatus::Complete))
                    .await
                    .map_err(|source| {
                        self.persistence_after_rebalance(chain_id, mode, &record, source)
                    })?;
                info!(id = %record.id, "Closed accrual window");
                Ok(AccrualOutcome::Rebalanced { record, report })
            }
            Err(error) => {
                self.metrics.rebalance_failures.increment(1);
                error!(id = %updated.id, %error, "Rebalance cycle failed, keeping window open");
                self.storage.update_fee(updated.id, &updated.update(FeeStatus::Pending)).await?;
                self.cache_record(&cache_key, &updated).await?;
                Ok(AccrualOutcome::RebalanceFailed { record: updated, error })
            }
        }
    }

    fn persistence_after_rebalance(
        &self,
        chain_id: ChainId,
        mode: FeeMode,
        record: &AccumulatedFeeRecord,
        source: StorageError,
    ) -> FeeManagerError {
        self.metrics.persistence_failures.increment(1);
        error!(
            id = %record.id,
            fee_usd = %record.fee_usd,
            %source,
            "Funds were rebalanced but the accrual window could not be closed"
        );
        FeeManagerError::PersistenceAfterRebalance { chain_id, mode, source }
    }

    /// Returns the cached open record, treating unreadable entries as a miss.
    async fn read_cached(
        &self,
        key: &str,
        chain_id: ChainId,
        mode: FeeMode,
    ) -> Option<AccumulatedFeeRecord> {
        let value = match self.storage.cache().get(key).await {
            Ok(value) => value?,
            Err(err) => {
                warn!(%key, %err, "Failed to read cache, falling back to storage");
                return None;
            }
        };

        match serde_json::from_str::<AccumulatedFeeRecord>(&value) {
            Ok(record)
                if record.chain_id == chain_id
                    && record.mode == mode
                    && record.status == FeeStatus::Pending =>
            {
                Some(record)
            }
            Ok(record) => {
                warn!(%key, id = %record.id, "Ignoring cached record of another window");
                None
            }
            Err(err) => {
                warn!(%key, %err, "Ignoring malformed cached record");
                None
            }
        }
    }

    async fn cache_record(
        &self,
        key: &str,
        record: &AccumulatedFeeRecord,
    ) -> Result<(), StorageError> {
        self.storage
            .cache()
            .set(key, serde_json::to_string(record)?, Some(self.config.ledger.cache_ttl))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ChainConfig, LedgerConfig},
        constants::NATIVE_ADDRESS_RELAYER,
        storage::{self, InMemoryStorage},
        test_utils::{CountingRebalance, MFA, MetricsRecorder},
        types::{FeeRecordId, FeeRecordUpdate, TokenRecord, usd_value},
    };
    use alloy::primitives::U256;
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use std::time::Duration;

    const MODE: FeeMode = FeeMode::SingleNetwork;

    fn config(ledger: LedgerConfig) -> Arc<FeeManagerConfig> {
        Arc::new(
            FeeManagerConfig::new(MFA)
                .with_chain(
                    5,
                    ChainConfig::new("ETH", Decimal::from(5000))
                        .with_token(TokenRecord::new(NATIVE_ADDRESS_RELAYER, "ETH", 18)),
                )
                .with_ledger(ledger),
        )
    }

    fn ledger() -> FeeAccrualLedger {
        FeeAccrualLedger::new(
            FeeStorage::in_memory(),
            config(LedgerConfig {
                lock_retry_delay: Duration::from_millis(5),
                ..Default::default()
            }),
        )
    }

    fn fee(usd: i64) -> FeeAccrual {
        FeeAccrual { native: U256::from(usd), usd: Decimal::from(usd), token_symbol: "ETH".into() }
    }

    async fn cached(ledger: &FeeAccrualLedger) -> Option<AccumulatedFeeRecord> {
        let value = ledger.storage().cache().get(&accumulated_fee_key(5, MODE)).await.unwrap()?;
        Some(serde_json::from_str(&value).unwrap())
    }

    /// Delays every durable read and write so concurrent accruals interleave.
    #[derive(Debug)]
    struct SlowStorage(Arc<InMemoryStorage>);

    #[async_trait]
    impl StorageApi for SlowStorage {
        async fn read_pending_fee(
            &self,
            chain_id: ChainId,
            mode: FeeMode,
        ) -> storage::Result<Option<AccumulatedFeeRecord>> {
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.0.read_pending_fee(chain_id, mode).await
        }

        async fn read_fee(&self, id: FeeRecordId) -> storage::Result<Option<AccumulatedFeeRecord>> {
            self.0.read_fee(id).await
        }

        async fn insert_fee(&self, record: &AccumulatedFeeRecord) -> storage::Result<()> {
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.0.insert_fee(record).await
        }

        async fn update_fee(
            &self,
            id: FeeRecordId,
            update: &FeeRecordUpdate,
        ) -> storage::Result<()> {
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.0.update_fee(id, update).await
        }
    }

    /// Fails every write closing a window.
    #[derive(Debug)]
    struct FailingClose(Arc<InMemoryStorage>);

    #[async_trait]
    impl StorageApi for FailingClose {
        async fn read_pending_fee(
            &self,
            chain_id: ChainId,
            mode: FeeMode,
        ) -> storage::Result<Option<AccumulatedFeeRecord>> {
            self.0.read_pending_fee(chain_id, mode).await
        }

        async fn read_fee(&self, id: FeeRecordId) -> storage::Result<Option<AccumulatedFeeRecord>> {
            self.0.read_fee(id).await
        }

        async fn insert_fee(&self, record: &AccumulatedFeeRecord) -> storage::Result<()> {
            self.0.insert_fee(record).await
        }

        async fn update_fee(
            &self,
            id: FeeRecordId,
            update: &FeeRecordUpdate,
        ) -> storage::Result<()> {
            if update.status == FeeStatus::Complete {
                return Err(StorageError::InternalError(eyre!("connection reset")));
            }
            self.0.update_fee(id, update).await
        }
    }

    #[tokio::test]
    async fn first_fee_opens_window() {
        let ledger = ledger();
        let rebalance = CountingRebalance::default();
        // 0x19035 gas at a gas price of 1 wei
        let native = U256::from(0x19035);
        let fee = FeeAccrual {
            native,
            usd: usd_value(native, 18, Decimal::from(2000)).unwrap(),
            token_symbol: "ETH".into(),
        };

        let outcome = ledger.record(5, MODE, &fee, &rebalance).await.unwrap();

        let AccrualOutcome::WindowOpened { record } = outcome else {
            panic!("expected a new window, got {outcome:?}");
        };
        assert_eq!(record.fee_native, U256::from(102_453));
        assert_eq!(record.fee_usd, fee.usd);
        assert_eq!(record.status, FeeStatus::Pending);
        assert_eq!(record.token_symbol, "ETH");

        let stored = ledger.storage().read_pending_fee(5, MODE).await.unwrap().unwrap();
        assert_eq!(stored.id, record.id);
        assert!(cached(&ledger).await.is_none());
        assert_eq!(rebalance.calls(), 0);
    }

    #[tokio::test]
    async fn fee_below_threshold_accrues() {
        let ledger = ledger();
        let rebalance = CountingRebalance::default();

        ledger.record(5, MODE, &fee(1000), &rebalance).await.unwrap();
        let outcome = ledger.record(5, MODE, &fee(50), &rebalance).await.unwrap();

        assert!(matches!(outcome, AccrualOutcome::Accrued { .. }));
        let stored = ledger.storage().read_pending_fee(5, MODE).await.unwrap().unwrap();
        assert_eq!(stored.fee_usd, Decimal::from(1050));
        assert_eq!(stored.fee_native, U256::from(1050));
        assert_eq!(stored.status, FeeStatus::Pending);
        assert_eq!(cached(&ledger).await.unwrap().fee_usd, Decimal::from(1050));
        assert_eq!(rebalance.calls(), 0);

        // the other mode keeps its own window
        let outcome = ledger.record(5, FeeMode::CrossNetwork, &fee(1), &rebalance).await.unwrap();
        assert!(matches!(outcome, AccrualOutcome::WindowOpened { .. }));
    }

    #[tokio::test]
    async fn crossing_threshold_rebalances_and_closes_window() {
        let ledger = ledger();
        let rebalance = CountingRebalance::default();

        ledger.record(5, MODE, &fee(4980), &rebalance).await.unwrap();
        let outcome = ledger.record(5, MODE, &fee(30), &rebalance).await.unwrap();

        let AccrualOutcome::Rebalanced { record, .. } = outcome else {
            panic!("expected a rebalance, got {outcome:?}");
        };
        assert_eq!(rebalance.calls(), 1);
        assert_eq!(record.status, FeeStatus::Complete);
        let stored = ledger.storage().read_fee(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, FeeStatus::Complete);
        assert_eq!(stored.fee_usd, Decimal::from(5010));
        assert!(ledger.storage().read_pending_fee(5, MODE).await.unwrap().is_none());
        assert!(cached(&ledger).await.is_none());

        let outcome = ledger.record(5, MODE, &fee(10), &rebalance).await.unwrap();
        let AccrualOutcome::WindowOpened { record: next } = outcome else {
            panic!("expected a new window, got {outcome:?}");
        };
        assert_ne!(next.id, record.id);
        assert_eq!(next.fee_usd, Decimal::from(10));
        assert_eq!(rebalance.calls(), 1);
    }

    #[tokio::test]
    async fn fee_at_threshold_does_not_rebalance() {
        let ledger = ledger();
        let rebalance = CountingRebalance::default();

        ledger.record(5, MODE, &fee(4000), &rebalance).await.unwrap();
        let outcome = ledger.record(5, MODE, &fee(1000), &rebalance).await.unwrap();

        assert!(matches!(outcome, AccrualOutcome::Accrued { .. }));
        assert_eq!(rebalance.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_fees_are_serialized() {
        let memory = Arc::new(InMemoryStorage::default());
        let storage =
            FeeStorage::new(Arc::new(SlowStorage(memory.clone())), memory.clone(), memory);
        let ledger = FeeAccrualLedger::new(
            storage,
            config(LedgerConfig {
                lock_retry_count: 500,
                lock_retry_delay: Duration::from_millis(1),
                ..Default::default()
            }),
        );
        let rebalance = CountingRebalance::default();
        let fee = fee(1);

        let outcomes =
            join_all((0..10).map(|_| ledger.record(5, MODE, &fee, &rebalance))).await;

        let opened = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Ok(AccrualOutcome::WindowOpened { .. })))
            .count();
        assert_eq!(opened, 1);
        assert!(outcomes.iter().all(Result::is_ok));
        let stored = ledger.storage().read_pending_fee(5, MODE).await.unwrap().unwrap();
        assert_eq!(stored.fee_usd, Decimal::from(10));
    }

    #[tokio::test]
    async fn busy_lock_fails_the_event() {
        let ledger = FeeAccrualLedger::new(
            FeeStorage::in_memory(),
            config(LedgerConfig {
                lock_retry_count: 3,
                lock_retry_delay: Duration::from_millis(1),
                ..Default::default()
            }),
        );
        let key = lock_key(5, MFA, MODE);
        let held = ledger
            .storage()
            .locks()
            .try_acquire(&key, Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();

        let err = ledger.record(5, MODE, &fee(1), &CountingRebalance::default()).await.unwrap_err();

        assert!(matches!(err, FeeManagerError::LockAcquisition { attempts: 3, .. }));
        assert!(ledger.storage().read_pending_fee(5, MODE).await.unwrap().is_none());

        ledger.storage().locks().release(&held).await.unwrap();
        ledger.record(5, MODE, &fee(1), &CountingRebalance::default()).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_chain_is_rejected() {
        let err =
            ledger().record(6, MODE, &fee(1), &CountingRebalance::default()).await.unwrap_err();
        assert!(matches!(err, FeeManagerError::UnsupportedChain(6)));
    }

    #[tokio::test]
    async fn failed_rebalance_keeps_window_open() {
        let ledger = ledger();

        ledger.record(5, MODE, &fee(4980), &CountingRebalance::default()).await.unwrap();
        let failing = CountingRebalance::failing();
        let outcome = ledger.record(5, MODE, &fee(30), &failing).await.unwrap();

        let AccrualOutcome::RebalanceFailed { record, .. } = outcome else {
            panic!("expected a failed rebalance, got {outcome:?}");
        };
        assert_eq!(failing.calls(), 1);
        assert_eq!(record.status, FeeStatus::Pending);
        let stored = ledger.storage().read_pending_fee(5, MODE).await.unwrap().unwrap();
        assert_eq!(stored.id, record.id);
        assert_eq!(stored.fee_usd, Decimal::from(5010));
        assert_eq!(cached(&ledger).await.unwrap().fee_usd, Decimal::from(5010));

        // the next fee triggers again
        let rebalance = CountingRebalance::default();
        let outcome = ledger.record(5, MODE, &fee(1), &rebalance).await.unwrap();
        assert!(matches!(outcome, AccrualOutcome::Rebalanced { .. }));
        assert_eq!(rebalance.calls(), 1);
    }

    #[tokio::test]
    async fn failed_close_after_rebalance_is_surfaced() {
        let memory = Arc::new(InMemoryStorage::default());
        let storage =
            FeeStorage::new(Arc::new(FailingClose(memory.clone())), memory.clone(), memory);
        let recorder = MetricsRecorder::default();
        let ledger = metrics::with_local_recorder(&recorder, || {
            FeeAccrualLedger::new(storage, config(LedgerConfig::default()))
        });
        let rebalance = CountingRebalance::default();

        ledger.record(5, MODE, &fee(4980), &rebalance).await.unwrap();
        let id = ledger.storage().read_pending_fee(5, MODE).await.unwrap().unwrap().id;
        let err = ledger.record(5, MODE, &fee(30), &rebalance).await.unwrap_err();

        assert!(matches!(
            err,
            FeeManagerError::PersistenceAfterRebalance { chain_id: 5, mode: MODE, .. }
        ));
        assert_eq!(rebalance.calls(), 1);
        assert_eq!(recorder.counter("persistence_failures"), 1);
        assert_eq!(recorder.counter("rebalances_triggered"), 1);

        // the window is left in flight and the lock is free for the next event
        let stored = ledger.storage().read_fee(id).await.unwrap().unwrap();
        assert_eq!(stored.status, FeeStatus::Processing);
        let key = lock_key(5, MFA, MODE);
        assert!(
            ledger
                .storage()
                .locks()
                .try_acquire(&key, Duration::from_secs(1))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rebalance_over_budget_keeps_window_open() {
        let ledger = FeeAccrualLedger::new(
            FeeStorage::in_memory(),
            config(LedgerConfig {
                rebalance_budget: Duration::from_secs(1),
                ..Default::default()
            }),
        );
        let slow = CountingRebalance::default().with_delay(Duration::from_secs(5));

        ledger.record(5, MODE, &fee(4980), &slow).await.unwrap();
        let outcome = ledger.record(5, MODE, &fee(30), &slow).await.unwrap();

        assert!(matches!(outcome, AccrualOutcome::RebalanceFailed { .. }));
        let stored = ledger.storage().read_pending_fee(5, MODE).await.unwrap().unwrap();
        assert_eq!(stored.fee_usd, Decimal::from(5010));
    }

    #[tokio::test]
    async fn lapsed_lock_aborts_without_persisting() {
        let ledger = FeeAccrualLedger::new(
            FeeStorage::in_memory(),
            config(LedgerConfig {
                lock_ttl: Duration::from_millis(20),
                rebalance_budget: Duration::from_secs(1),
                ..Default::default()
            }),
        );
        ledger.record(5, MODE, &fee(4980), &CountingRebalance::default()).await.unwrap();
        let id = ledger.storage().read_pending_fee(5, MODE).await.unwrap().unwrap().id;

        let slow = CountingRebalance::default().with_delay(Duration::from_millis(50));
        let err = ledger.record(5, MODE, &fee(30), &slow).await.unwrap_err();

        assert!(matches!(err, FeeManagerError::LockLost { .. }));
        // the window stays in flight rather than being closed or re-opened
        let stored = ledger.storage().read_fee(id).await.unwrap().unwrap();
        assert_eq!(stored.status, FeeStatus::Processing);
        assert!(cached(&ledger).await.is_none());
    }
}
