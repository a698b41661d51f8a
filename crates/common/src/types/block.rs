use serde::{Deserialize, Serialize};

use crate::{Address, H256, U256, serde_utils};

/// The header view a simulated transaction executes against. Only the
/// fields observable from the EVM (plus the state root the simulation is
/// pinned to) are carried; full headers live in the blockchain engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContext {
    #[serde(with = "serde_utils::u64::hex_str")]
    pub number: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub timestamp: u64,
    pub coinbase: Address,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub gas_limit: u64,
    #[serde(default, with = "serde_utils::u64::hex_str_opt")]
    pub base_fee_per_gas: Option<u64>,
    pub prev_randao: H256,
    pub difficulty: U256,
    pub state_root: H256,
}
