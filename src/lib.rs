//! # Relay Fee Manager
//!
//! Accrues the gas fees a relayer spends on every network and, once a network's accrued spend
//! crosses its threshold, rebalances the master funding account across networks so the
//! depleted network is topped back up.

pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod fees;
pub mod liquidity;
pub mod price;
pub mod serde;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_utils;
