use alloy::primitives::{Address, BlockNumber, Bytes, TxHash, U256};

/// An unsigned transaction to be sent from the master funding account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRequest {
    /// Recipient.
    pub to: Address,
    /// Calldata.
    pub input: Bytes,
    /// Native value attached.
    pub value: U256,
}

impl TxRequest {
    /// Creates a call without value.
    pub fn call(to: Address, input: impl Into<Bytes>) -> Self {
        Self { to, input: input.into(), value: U256::ZERO }
    }

    /// Sets the attached value.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// The parts of a transaction receipt the fee manager relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash.
    pub transaction_hash: TxHash,
    /// Whether the transaction succeeded.
    pub status: bool,
    /// Gas consumed by the transaction.
    pub gas_used: u64,
    /// Price paid per unit of gas, zero when unknown.
    pub effective_gas_price: u128,
    /// Block the transaction was included in.
    pub block_number: Option<BlockNumber>,
}
