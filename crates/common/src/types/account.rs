use serde::{Deserialize, Serialize};

use crate::{H256, U256, constants::EMPTY_CODE_HASH};

/// Balance, nonce and code hash of an account. The code itself is stored
/// separately, keyed by its hash, so duplicate bytecode is held only once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: H256,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl AccountInfo {
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }

    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && !self.has_code()
    }
}
