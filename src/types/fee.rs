use alloy::primitives::{ChainId, U256, wrap_fixed_bytes};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

wrap_fixed_bytes!(
    /// Identifier of an accumulated fee record.
    pub struct FeeRecordId<32>;
);

impl FeeRecordId {
    /// Generates a new random record identifier.
    pub fn generate() -> Self {
        Self::new(rand::random())
    }
}

/// The relaying mode a fee was spent in.
///
/// Each mode keeps its own accrual window and lock per network.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeeMode {
    /// Transactions relayed within a single network.
    SingleNetwork,
    /// Cross-network message relaying.
    CrossNetwork,
}

/// Lifecycle of an accumulated fee record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeeStatus {
    /// The accrual window is open.
    Pending,
    /// A rebalance for the window is in flight.
    Processing,
    /// The window was closed after a rebalance.
    Complete,
    /// The window was abandoned.
    Failed,
}

/// Running total of the fees spent on a network in one mode since the window opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedFeeRecord {
    /// Record identifier.
    pub id: FeeRecordId,
    /// Network the fees were spent on.
    pub chain_id: ChainId,
    /// Relaying mode.
    pub mode: FeeMode,
    /// Accrued fee in native base units.
    pub fee_native: U256,
    /// Accrued fee in USD.
    pub fee_usd: Decimal,
    /// Symbol of the native token the fee was paid in.
    pub token_symbol: String,
    /// Record status.
    pub status: FeeStatus,
    /// When the accrual window was opened.
    pub start_time: DateTime<Utc>,
    /// Last time the record was written.
    pub updated_at: DateTime<Utc>,
}

impl AccumulatedFeeRecord {
    /// Opens a new [`FeeStatus::Pending`] window holding a single fee.
    pub fn open(chain_id: ChainId, mode: FeeMode, fee: &FeeAccrual) -> Self {
        let now = Utc::now();
        Self {
            id: FeeRecordId::generate(),
            chain_id,
            mode,
            fee_native: fee.native,
            fee_usd: fee.usd,
            token_symbol: fee.token_symbol.clone(),
            status: FeeStatus::Pending,
            start_time: now,
            updated_at: now,
        }
    }

    /// Adds a fee to the running totals.
    ///
    /// Returns `None` if the USD total would overflow.
    pub fn accrue(&self, fee: &FeeAccrual) -> Option<Self> {
        Some(Self {
            fee_native: self.fee_native.saturating_add(fee.native),
            fee_usd: self.fee_usd.checked_add(fee.usd)?,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    /// Returns the update persisting the record's totals with the given status.
    pub fn update(&self, status: FeeStatus) -> FeeRecordUpdate {
        FeeRecordUpdate {
            fee_native: self.fee_native,
            fee_usd: self.fee_usd,
            status,
            updated_at: self.updated_at,
        }
    }
}

/// Fields written when an accumulated fee record is updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeRecordUpdate {
    /// New native total.
    pub fee_native: U256,
    /// New USD total.
    pub fee_usd: Decimal,
    /// New status.
    pub status: FeeStatus,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A single fee to be accrued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeAccrual {
    /// Fee in native base units.
    pub native: U256,
    /// Fee in USD.
    pub usd: Decimal,
    /// Symbol of the native token.
    pub token_symbol: String,
}
