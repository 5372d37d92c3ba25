//! Contains all updates to the [crate::SystemConfig] type.

mod batcher;
pub use batcher::BatcherUpdate;

mod signer;
pub use signer::UnsafeBlockSignerUpdate;

mod gas_config;
pub use gas_config::GasConfigUpdate;

mod gas_limit;
pub use gas_limit::GasLimitUpdate;

mod eip1559;
pub use eip1559::Eip1559Update;

mod operator_fee;
pub use operator_fee::OperatorFeeUpdate;

mod min_base_fee;
pub use min_base_fee::MinBaseFeeUpdate;
