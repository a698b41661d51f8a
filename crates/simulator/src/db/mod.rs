mod overlay;

use ethsim_common::{Address, Bytes, H256, U256, types::AccountInfo};

pub use overlay::OverlayState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    Custom(String),
}

/// Read-only view of the parent chain state a simulation is pinned to.
///
/// The blockchain engine produces one per simulation (a shallow copy of
/// its state trie at the requested root, sharing the underlying key-value
/// store). There is deliberately no write surface: every mutation a
/// simulation makes lives in [`OverlayState`] and dies with it.
pub trait Database: Send + Sync {
    /// Account at `address`, or `None` if it does not exist in the trie.
    fn get_account_info(&self, address: Address) -> Result<Option<AccountInfo>, DatabaseError>;

    /// Storage slot value, or `None` if the slot was never written.
    fn get_storage_slot(&self, address: Address, key: H256) -> Result<Option<U256>, DatabaseError>;

    /// Code blob stored under `code_hash`.
    fn get_code(&self, code_hash: H256) -> Result<Bytes, DatabaseError>;

    /// Hash of block `number`, for the BLOCKHASH opcode.
    fn get_block_hash(&self, number: u64) -> Result<Option<H256>, DatabaseError>;
}
