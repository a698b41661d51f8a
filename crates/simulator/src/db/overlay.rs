use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use ethsim_common::{Address, Bytes, H256, U256, constants::EMPTY_CODE_HASH, types::AccountInfo, utils::keccak};

use super::{Database, DatabaseError};

#[derive(Debug, Clone, Default)]
struct CachedAccount {
    info: AccountInfo,
    storage: BTreeMap<H256, U256>,
}

#[derive(Debug, Clone, Default)]
struct OverlaySnapshot {
    accounts: HashMap<Address, CachedAccount>,
    code: HashMap<H256, Bytes>,
    cleared_storage: HashSet<Address>,
}

/// Copy-on-write state overlay for one simulation.
///
/// Reads fall through to the parent [`Database`] and are cached; writes
/// only ever touch the cache. Checkpoints snapshot the cache, so `revert`
/// restores it and `commit` merely drops the snapshot — at no point does
/// anything flow back into the parent store.
pub struct OverlayState {
    store: Arc<dyn Database>,
    accounts: HashMap<Address, CachedAccount>,
    code: HashMap<H256, Bytes>,
    /// Accounts whose storage trie was wiped (full `state` override).
    /// Reads for them no longer fall through to the store.
    cleared_storage: HashSet<Address>,
    checkpoints: Vec<OverlaySnapshot>,
}

impl OverlayState {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self {
            store,
            accounts: HashMap::new(),
            code: HashMap::new(),
            cleared_storage: HashSet::new(),
            checkpoints: Vec::new(),
        }
    }

    fn account_mut(&mut self, address: Address) -> Result<&mut CachedAccount, DatabaseError> {
        if !self.accounts.contains_key(&address) {
            let info = self.store.get_account_info(address)?.unwrap_or_default();
            self.accounts.insert(
                address,
                CachedAccount {
                    info,
                    storage: BTreeMap::new(),
                },
            );
        }
        Ok(self
            .accounts
            .get_mut(&address)
            .expect("account was cached above"))
    }

    /// Account info at `address`; a non-existent account reads as empty.
    pub fn get_account_info(&mut self, address: Address) -> Result<AccountInfo, DatabaseError> {
        Ok(self.account_mut(address)?.info.clone())
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), DatabaseError> {
        self.account_mut(address)?.info.balance = balance;
        Ok(())
    }

    pub fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), DatabaseError> {
        let account = self.account_mut(address)?;
        account.info.balance = account.info.balance.saturating_add(amount);
        Ok(())
    }

    /// Debits `amount`, clamping at zero. Simulations never reject a
    /// sender for insufficient balance; the pool does that for real
    /// transactions.
    pub fn sub_balance_saturating(
        &mut self,
        address: Address,
        amount: U256,
    ) -> Result<(), DatabaseError> {
        let account = self.account_mut(address)?;
        account.info.balance = account.info.balance.saturating_sub(amount);
        Ok(())
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), DatabaseError> {
        self.account_mut(address)?.info.nonce = nonce;
        Ok(())
    }

    pub fn increment_nonce(&mut self, address: Address) -> Result<u64, DatabaseError> {
        let account = self.account_mut(address)?;
        account.info.nonce = account.info.nonce.saturating_add(1);
        Ok(account.info.nonce)
    }

    /// Installs `code` on the account: the blob is stored under its
    /// keccak hash and the hash written to the account. Empty code hashes
    /// to `EMPTY_CODE_HASH`, leaving the account code-less.
    pub fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), DatabaseError> {
        let code_hash = keccak(&code);
        self.code.insert(code_hash, code);
        self.account_mut(address)?.info.code_hash = code_hash;
        Ok(())
    }

    pub fn get_code(&mut self, address: Address) -> Result<Bytes, DatabaseError> {
        let code_hash = self.account_mut(address)?.info.code_hash;
        self.get_code_by_hash(code_hash)
    }

    pub fn get_code_by_hash(&mut self, code_hash: H256) -> Result<Bytes, DatabaseError> {
        if code_hash == EMPTY_CODE_HASH {
            return Ok(Bytes::new());
        }
        if let Some(code) = self.code.get(&code_hash) {
            return Ok(code.clone());
        }
        let code = self.store.get_code(code_hash)?;
        self.code.insert(code_hash, code.clone());
        Ok(code)
    }

    /// Slot value at (`address`, `key`); unwritten slots read as zero.
    pub fn get_storage_slot(&mut self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        if let Some(value) = self.accounts.get(&address).and_then(|a| a.storage.get(&key)) {
            return Ok(*value);
        }
        if self.cleared_storage.contains(&address) {
            return Ok(U256::zero());
        }
        let value = self
            .store
            .get_storage_slot(address, key)?
            .unwrap_or_default();
        self.account_mut(address)?.storage.insert(key, value);
        Ok(value)
    }

    pub fn set_storage_slot(
        &mut self,
        address: Address,
        key: H256,
        value: U256,
    ) -> Result<(), DatabaseError> {
        self.account_mut(address)?.storage.insert(key, value);
        Ok(())
    }

    /// Wipes the account's storage trie. Subsequent reads of any slot
    /// return zero until overwritten.
    pub fn clear_storage(&mut self, address: Address) -> Result<(), DatabaseError> {
        self.account_mut(address)?.storage.clear();
        self.cleared_storage.insert(address);
        Ok(())
    }

    pub fn get_block_hash(&self, number: u64) -> Result<Option<H256>, DatabaseError> {
        self.store.get_block_hash(number)
    }

    pub fn checkpoint(&mut self) {
        self.checkpoints.push(OverlaySnapshot {
            accounts: self.accounts.clone(),
            code: self.code.clone(),
            cleared_storage: self.cleared_storage.clone(),
        });
    }

    /// Keeps everything written since the matching `checkpoint`.
    pub fn commit(&mut self) {
        self.checkpoints.pop();
    }

    /// Discards everything written since the matching `checkpoint`.
    pub fn revert(&mut self) {
        if let Some(snapshot) = self.checkpoints.pop() {
            self.accounts = snapshot.accounts;
            self.code = snapshot.code;
            self.cleared_storage = snapshot.cleared_storage;
        }
    }

    pub fn checkpoint_depth(&self) -> usize {
        self.checkpoints.len()
    }
}
