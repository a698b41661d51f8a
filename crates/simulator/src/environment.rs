use ethsim_common::{
    Address, U256,
    types::{BlockContext, Fork},
};

/// Block and transaction context the EVM executes under. `gas_limit` is
/// the execution budget, i.e. the transaction's gas minus the intrinsic
/// cost already charged.
#[derive(Debug, Clone)]
pub struct Environment {
    pub origin: Address,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub chain_id: u64,
    pub fork: Fork,
    pub block: BlockContext,
}
