//! Fee accrual and the entry point invoked for every relayed transaction.

mod ledger;
pub use ledger::{AccrualOutcome, FeeAccrualLedger, accumulated_fee_key, lock_key};
mod manager;
pub use manager::FeeManager;
mod metrics;
pub use metrics::LedgerMetrics;
