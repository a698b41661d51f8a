use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use ethsim_common::{Address, Bytes, H256, U256, utils::h256_to_u256};

use crate::{
    db::{DatabaseError, OverlayState},
    errors::{OverrideError, OverrideKind},
};

/// Pre-execution state overrides, keyed by address.
pub type StateOverrideSet = HashMap<Address, AccountOverride>;

/// One account's overrides as they arrive on the wire. Slot keys and
/// values stay loosely typed here; [`validate`] turns them into the tagged
/// [`StorageOverride`] or rejects them with the fixed error strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverride {
    pub balance: Option<String>,
    pub nonce: Option<String>,
    pub code: Option<String>,
    /// Full storage replacement. Mutually exclusive with `state_diff`.
    pub state: Option<HashMap<String, Option<String>>>,
    /// Storage merge. Mutually exclusive with `state`.
    pub state_diff: Option<HashMap<String, Option<String>>>,
}

/// Validated storage override, tagged by semantics: `Replace` wipes the
/// storage trie first, `Merge` writes over the existing one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageOverride {
    #[default]
    None,
    Replace(BTreeMap<H256, U256>),
    Merge(BTreeMap<H256, U256>),
}

/// An [`AccountOverride`] after validation, ready to apply.
#[derive(Debug, Clone, Default)]
pub struct ValidatedAccountOverride {
    pub balance: Option<U256>,
    pub nonce: Option<u64>,
    pub code: Option<Bytes>,
    pub storage: StorageOverride,
}

pub fn validate(raw: &AccountOverride) -> Result<ValidatedAccountOverride, OverrideError> {
    let storage = match (&raw.state, &raw.state_diff) {
        (Some(_), Some(_)) => return Err(OverrideError::ConflictingStorageOverride),
        (Some(state), None) => {
            StorageOverride::Replace(validate_slots(OverrideKind::State, state)?)
        }
        (None, Some(diff)) => {
            StorageOverride::Merge(validate_slots(OverrideKind::StateDiff, diff)?)
        }
        (None, None) => StorageOverride::None,
    };

    Ok(ValidatedAccountOverride {
        balance: raw
            .balance
            .as_deref()
            .map(|value| parse_quantity("balance", value))
            .transpose()?,
        nonce: raw
            .nonce
            .as_deref()
            .map(|value| parse_nonce(value))
            .transpose()?,
        code: raw.code.as_deref().map(parse_code).transpose()?,
        storage,
    })
}

fn validate_slots(
    kind: OverrideKind,
    slots: &HashMap<String, Option<String>>,
) -> Result<BTreeMap<H256, U256>, OverrideError> {
    let mut validated = BTreeMap::new();
    for (key, value) in slots {
        let slot = parse_slot_key(kind, key)?;
        let value = parse_slot_value(kind, value.as_deref())?;
        validated.insert(slot, value);
    }
    Ok(validated)
}

/// Slot keys must be 0x-prefixed 66-character hex strings.
fn parse_slot_key(kind: OverrideKind, key: &str) -> Result<H256, OverrideError> {
    if key.len() != 66 {
        return Err(OverrideError::SlotLength {
            kind,
            length: key.len(),
        });
    }
    let Some(stripped) = key.strip_prefix("0x") else {
        return Err(OverrideError::SlotNotValid {
            kind,
            value: key.to_string(),
        });
    };
    let bytes = hex::decode(stripped).map_err(|_| OverrideError::SlotNotValid {
        kind,
        value: key.to_string(),
    })?;
    Ok(H256::from_slice(&bytes))
}

/// Slot values follow the same shape as keys; `null` is rejected outright.
fn parse_slot_value(kind: OverrideKind, value: Option<&str>) -> Result<U256, OverrideError> {
    let Some(value) = value else {
        return Err(OverrideError::DataNotValid {
            kind,
            value: "null".to_string(),
        });
    };
    if value.len() != 66 {
        return Err(OverrideError::DataLength {
            kind,
            length: value.len(),
        });
    }
    let Some(stripped) = value.strip_prefix("0x") else {
        return Err(OverrideError::DataNotValid {
            kind,
            value: value.to_string(),
        });
    };
    let bytes = hex::decode(stripped).map_err(|_| OverrideError::DataNotValid {
        kind,
        value: value.to_string(),
    })?;
    Ok(h256_to_u256(H256::from_slice(&bytes)))
}

/// Quantities accept minimal hex; the empty string means `0x0`.
fn parse_quantity(field: &'static str, value: &str) -> Result<U256, OverrideError> {
    let stripped = value.trim_start_matches("0x");
    if stripped.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(stripped, 16).map_err(|_| OverrideError::InvalidQuantity {
        field,
        value: value.to_string(),
    })
}

fn parse_nonce(value: &str) -> Result<u64, OverrideError> {
    let quantity = parse_quantity("nonce", value)?;
    if quantity > U256::from(u64::MAX) {
        return Err(OverrideError::InvalidQuantity {
            field: "nonce",
            value: value.to_string(),
        });
    }
    Ok(quantity.as_u64())
}

/// Code accepts hex bytes; the empty string means empty code.
fn parse_code(value: &str) -> Result<Bytes, OverrideError> {
    let stripped = value.trim_start_matches("0x");
    let bytes = hex::decode(stripped).map_err(|e| OverrideError::InvalidCode(e.to_string()))?;
    Ok(Bytes::from(bytes))
}

/// Writes a validated override into the overlay. Runs once per
/// simulation, after the isolation checkpoint and before execution.
pub fn apply_account_override(
    state: &mut OverlayState,
    address: Address,
    validated: &ValidatedAccountOverride,
) -> Result<(), DatabaseError> {
    if let Some(balance) = validated.balance {
        state.set_balance(address, balance)?;
    }
    if let Some(nonce) = validated.nonce {
        state.set_nonce(address, nonce)?;
    }
    if let Some(code) = &validated.code {
        state.set_code(address, code.clone())?;
    }
    match &validated.storage {
        StorageOverride::Replace(slots) => {
            state.clear_storage(address)?;
            for (key, value) in slots {
                state.set_storage_slot(address, *key, *value)?;
            }
        }
        StorageOverride::Merge(slots) => {
            for (key, value) in slots {
                state.set_storage_slot(address, *key, *value)?;
            }
        }
        StorageOverride::None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_hex(n: u8) -> String {
        let mut key = H256::zero();
        key.0[31] = n;
        format!("{key:?}")
    }

    fn slots(entries: &[(String, Option<String>)]) -> HashMap<String, Option<String>> {
        entries.iter().cloned().collect()
    }

    #[test]
    fn state_and_state_diff_conflict_is_rejected() {
        let raw = AccountOverride {
            state: Some(HashMap::new()),
            state_diff: Some(HashMap::new()),
            ..Default::default()
        };
        let err = validate(&raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "both state and stateDiff overrides specified"
        );
    }

    #[test]
    fn short_slot_keys_report_their_length() {
        let raw = AccountOverride {
            state: Some(slots(&[("0x01".to_string(), Some(slot_hex(1)))])),
            ..Default::default()
        };
        let err = validate(&raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "State override slot must be a 64 character hex string. Received 4 character string."
        );
    }

    #[test]
    fn state_diff_errors_use_their_own_prefix() {
        let raw = AccountOverride {
            state_diff: Some(slots(&[("0xabc".to_string(), Some(slot_hex(1)))])),
            ..Default::default()
        };
        let err = validate(&raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "StateDiff override slot must be a 64 character hex string. Received 5 character string."
        );
    }

    #[test]
    fn null_slot_values_are_rejected() {
        let raw = AccountOverride {
            state: Some(slots(&[(slot_hex(1), None)])),
            ..Default::default()
        };
        let err = validate(&raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "State override data not valid. Received: null"
        );
    }

    #[test]
    fn short_slot_values_report_their_length() {
        let raw = AccountOverride {
            state: Some(slots(&[(slot_hex(1), Some("0x0".to_string()))])),
            ..Default::default()
        };
        let err = validate(&raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "State override data must be a 64 character hex string. Received 3 character string."
        );
    }

    #[test]
    fn well_formed_overrides_validate() {
        let raw = AccountOverride {
            balance: Some("0xde0b6b3a7640000".to_string()),
            nonce: Some("0x2".to_string()),
            code: Some("0x6001".to_string()),
            state_diff: Some(slots(&[(slot_hex(1), Some(slot_hex(0x2a)))])),
            ..Default::default()
        };
        let validated = validate(&raw).unwrap();
        assert_eq!(
            validated.balance,
            Some(U256::from_dec_str("1000000000000000000").unwrap())
        );
        assert_eq!(validated.nonce, Some(2));
        assert_eq!(validated.code.as_deref(), Some(&[0x60, 0x01][..]));
        match validated.storage {
            StorageOverride::Merge(slots) => {
                assert_eq!(slots[&H256::from_low_u64_be(1)], U256::from(0x2a));
            }
            other => panic!("expected merge override, got {other:?}"),
        }
    }

    #[test]
    fn empty_strings_mean_zero_and_empty_code() {
        let raw = AccountOverride {
            balance: Some(String::new()),
            nonce: Some(String::new()),
            code: Some(String::new()),
            ..Default::default()
        };
        let validated = validate(&raw).unwrap();
        assert_eq!(validated.balance, Some(U256::zero()));
        assert_eq!(validated.nonce, Some(0));
        assert_eq!(validated.code.as_deref(), Some(&[][..]));
    }

    #[test]
    fn wire_shape_deserializes_camel_case() {
        let json = r#"{
            "balance": "0x1",
            "stateDiff": {
                "0x0000000000000000000000000000000000000000000000000000000000000001":
                "0x0000000000000000000000000000000000000000000000000000000000000002"
            }
        }"#;
        let raw: AccountOverride = serde_json::from_str(json).unwrap();
        assert!(raw.state_diff.is_some());
        let validated = validate(&raw).unwrap();
        assert!(matches!(validated.storage, StorageOverride::Merge(_)));
    }
}
