use serde::{Deserialize, Serialize};

use crate::{Address, Bytes, H256, serde_utils};

/// An event emitted during execution. Simulation logs are returned to the
/// caller but never persisted, so no bloom or receipt indices are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "serde_utils::bytes")]
    pub data: Bytes,
}
