use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Address, Bytes, H256, U256, serde_utils};

/// Call target of a transaction. `Create` is the wire-level `"to": null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TxKind {
    Call(Address),
    #[default]
    Create,
}

impl TxKind {
    pub fn is_create(&self) -> bool {
        matches!(self, TxKind::Create)
    }

    pub fn to(&self) -> Option<Address> {
        match self {
            TxKind::Call(address) => Some(*address),
            TxKind::Create => None,
        }
    }
}

impl Serialize for TxKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TxKind::Call(address) => address.serialize(serializer),
            TxKind::Create => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for TxKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Address>::deserialize(deserializer)? {
            Some(address) => TxKind::Call(address),
            None => TxKind::Create,
        })
    }
}

pub type AccessList = Vec<AccessListEntry>;

/// One EIP-2930 access list entry: an address plus the storage keys the
/// transaction declares it will touch there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<H256>,
}

/// The transaction shape a simulation consumes. Unsigned: `from` is taken
/// at face value, there is no signature to recover a sender from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationTransaction {
    pub from: Address,
    #[serde(default)]
    pub to: TxKind,
    /// Total gas budget, intrinsic cost included.
    #[serde(default, with = "serde_utils::u64::hex_str")]
    pub gas: u64,
    #[serde(default)]
    pub gas_price: U256,
    #[serde(default)]
    pub value: U256,
    #[serde(default, with = "serde_utils::bytes")]
    pub data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
}
