//! Fee manager types.

mod amount;
pub use amount::{scale_amount, to_decimal_units, usd_value};

mod erc20;
pub use erc20::IERC20;

mod fee;
pub use fee::{
    AccumulatedFeeRecord, FeeAccrual, FeeMode, FeeRecordId, FeeRecordUpdate, FeeStatus,
};

mod lock;
pub use lock::LockToken;

mod route;
pub use route::{Route, RouteAction, RouteStep};

mod token;
pub use token::{NativeSentinels, TokenRecord};

mod tx;
pub use tx::{TxReceipt, TxRequest};
