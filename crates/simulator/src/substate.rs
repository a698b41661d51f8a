use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use ethsim_common::{
    Address, H256,
    types::{AccessList, AccessListEntry},
};

/// Per-run record of which accounts and storage slots execution touched.
///
/// Doubles as the EIP-2929 warm set: an entry present here is warm, and
/// inserting reports whether the access was cold. Account touches and
/// storage touches are kept apart so "touched as call target" never
/// fabricates a storage entry.
#[derive(Debug, Clone, Default)]
pub struct Substate {
    touched_accounts: HashSet<Address>,
    touched_storage_slots: HashMap<Address, BTreeSet<H256>>,
}

impl Substate {
    /// Records an account access. Returns true when the address was cold.
    pub fn add_touched_account(&mut self, address: Address) -> bool {
        self.touched_accounts.insert(address)
    }

    /// Records a storage slot access. Returns true when the slot was cold.
    pub fn add_touched_slot(&mut self, address: Address, key: H256) -> bool {
        self.touched_storage_slots
            .entry(address)
            .or_default()
            .insert(key)
    }

    pub fn is_account_warm(&self, address: Address) -> bool {
        self.touched_accounts.contains(&address)
    }

    pub fn is_slot_warm(&self, address: Address, key: H256) -> bool {
        self.touched_storage_slots
            .get(&address)
            .is_some_and(|slots| slots.contains(&key))
    }

    /// Warms every address and storage key of `list` up front, the
    /// EIP-2930 treatment of a transaction-supplied access list.
    pub fn warm_access_list(&mut self, list: &AccessList) {
        for entry in list {
            self.touched_accounts.insert(entry.address);
            for key in &entry.storage_keys {
                self.touched_storage_slots
                    .entry(entry.address)
                    .or_default()
                    .insert(*key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.touched_accounts.clear();
        self.touched_storage_slots.clear();
    }

    /// Builds the canonical access list of everything touched this run.
    ///
    /// Addresses in `exclude` (the caller and the precompiles, which the
    /// protocol warms for free) never appear. Addresses in `storage_only`
    /// (the callee) appear only when at least one of their storage slots
    /// was touched — a keyless entry for the callee would be pure cost.
    /// Entries come out sorted by address with deduplicated, sorted keys.
    pub fn make_access_list(
        &self,
        exclude: &HashSet<Address>,
        storage_only: &HashSet<Address>,
    ) -> AccessList {
        let mut merged: BTreeMap<Address, BTreeSet<H256>> = BTreeMap::new();
        for address in &self.touched_accounts {
            merged.entry(*address).or_default();
        }
        for (address, slots) in &self.touched_storage_slots {
            merged.entry(*address).or_default().extend(slots.iter().copied());
        }

        merged
            .into_iter()
            .filter(|(address, slots)| {
                !exclude.contains(address) && !(storage_only.contains(address) && slots.is_empty())
            })
            .map(|(address, slots)| AccessListEntry {
                address,
                storage_keys: slots.into_iter().collect(),
            })
            .collect()
    }
}

/// Collapses a list into its canonical set form: entries for the same
/// address merged, keys deduplicated, everything ordered.
pub fn canonicalize(list: &AccessList) -> BTreeMap<Address, BTreeSet<H256>> {
    let mut canonical: BTreeMap<Address, BTreeSet<H256>> = BTreeMap::new();
    for entry in list {
        canonical
            .entry(entry.address)
            .or_default()
            .extend(entry.storage_keys.iter().copied());
    }
    canonical
}

/// Order-insensitive equality: two lists are equal iff their canonical
/// `{(address, {keys})}` sets are.
pub fn access_lists_equal(a: &AccessList, b: &AccessList) -> bool {
    canonicalize(a) == canonicalize(b)
}
