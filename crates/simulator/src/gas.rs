use ethsim_common::types::{AccessListEntry, Fork};

use crate::errors::InternalError;

// Transaction costs in gas
pub const TX_BASE_COST: u64 = 21000;

pub const CALLDATA_COST_ZERO_BYTE: u64 = 4;
pub const CALLDATA_COST_NON_ZERO_BYTE: u64 = 16;
/// Pre-Istanbul non-zero byte cost (lowered by EIP-2028).
pub const CALLDATA_COST_NON_ZERO_BYTE_FRONTIER: u64 = 68;

/// Contract creation surcharge, charged since Homestead.
pub const CREATE_BASE_COST: u64 = 32000;
/// [EIP-3860] per-word init code cost, charged since Shanghai.
pub const INIT_CODE_WORD_COST: u64 = 2;

// [EIP-2930] access list surcharge, reported on top of execution gas.
pub const ACCESS_LIST_ADDRESS_COST: u64 = 2400;
pub const ACCESS_LIST_STORAGE_KEY_COST: u64 = 1900;

/// Calldata portion of the intrinsic cost: 4 gas per zero byte, 16 (68
/// before Istanbul) per non-zero byte.
pub fn tx_calldata(calldata: &[u8], fork: Fork) -> Result<u64, InternalError> {
    let non_zero_byte_cost = if fork >= Fork::Istanbul {
        CALLDATA_COST_NON_ZERO_BYTE
    } else {
        CALLDATA_COST_NON_ZERO_BYTE_FRONTIER
    };
    let mut calldata_cost: u64 = 0;
    for byte in calldata {
        calldata_cost = if *byte != 0 {
            calldata_cost
                .checked_add(non_zero_byte_cost)
                .ok_or(InternalError::GasOverflow)?
        } else {
            calldata_cost
                .checked_add(CALLDATA_COST_ZERO_BYTE)
                .ok_or(InternalError::GasOverflow)?
        }
    }
    Ok(calldata_cost)
}

/// The cost charged before the first opcode runs: base fee, calldata
/// bytes and, for creations, the deployment surcharges. A caller-supplied
/// access list is *not* part of this — its flat fee is computed by
/// [`access_list_data_fee`] and added to the reported total separately.
pub fn intrinsic_gas(calldata: &[u8], is_create: bool, fork: Fork) -> Result<u64, InternalError> {
    let mut gas = TX_BASE_COST
        .checked_add(tx_calldata(calldata, fork)?)
        .ok_or(InternalError::GasOverflow)?;

    if is_create && fork >= Fork::Homestead {
        gas = gas
            .checked_add(CREATE_BASE_COST)
            .ok_or(InternalError::GasOverflow)?;

        if fork >= Fork::Shanghai {
            // [EIP-3860] 2 gas for every 32-byte chunk of init code
            let words = (calldata.len() as u64).div_ceil(32);
            gas = gas
                .checked_add(
                    words
                        .checked_mul(INIT_CODE_WORD_COST)
                        .ok_or(InternalError::GasOverflow)?,
                )
                .ok_or(InternalError::GasOverflow)?;
        }
    }

    Ok(gas)
}

/// Flat [EIP-2930] fee of an access list: 2400 per address plus 1900 per
/// storage key.
pub fn access_list_data_fee(list: &[AccessListEntry]) -> Result<u64, InternalError> {
    let mut fee: u64 = 0;
    for entry in list {
        fee = fee
            .checked_add(ACCESS_LIST_ADDRESS_COST)
            .ok_or(InternalError::GasOverflow)?;
        let keys_fee = (entry.storage_keys.len() as u64)
            .checked_mul(ACCESS_LIST_STORAGE_KEY_COST)
            .ok_or(InternalError::GasOverflow)?;
        fee = fee.checked_add(keys_fee).ok_or(InternalError::GasOverflow)?;
    }
    Ok(fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethsim_common::{Address, H256, types::AccessListEntry};

    #[test]
    fn base_cost_for_empty_calldata() {
        for fork in [Fork::Frontier, Fork::Istanbul, Fork::Berlin, Fork::Cancun] {
            assert_eq!(intrinsic_gas(&[], false, fork).unwrap(), TX_BASE_COST);
        }
    }

    #[test]
    fn calldata_bytes_are_priced_by_content() {
        let data = [0x00, 0x01, 0x00, 0xff];
        assert_eq!(
            intrinsic_gas(&data, false, Fork::Cancun).unwrap(),
            TX_BASE_COST + 2 * CALLDATA_COST_ZERO_BYTE + 2 * CALLDATA_COST_NON_ZERO_BYTE
        );
    }

    #[test]
    fn non_zero_bytes_cost_more_before_istanbul() {
        let data = [0x01];
        assert_eq!(
            intrinsic_gas(&data, false, Fork::Petersburg).unwrap(),
            TX_BASE_COST + CALLDATA_COST_NON_ZERO_BYTE_FRONTIER
        );
        assert_eq!(
            intrinsic_gas(&data, false, Fork::Istanbul).unwrap(),
            TX_BASE_COST + CALLDATA_COST_NON_ZERO_BYTE
        );
    }

    #[test]
    fn creation_surcharge_applies_post_homestead() {
        assert_eq!(
            intrinsic_gas(&[], true, Fork::Frontier).unwrap(),
            TX_BASE_COST
        );
        assert_eq!(
            intrinsic_gas(&[], true, Fork::Homestead).unwrap(),
            TX_BASE_COST + CREATE_BASE_COST
        );
        assert_eq!(
            intrinsic_gas(&[], true, Fork::Berlin).unwrap(),
            TX_BASE_COST + CREATE_BASE_COST
        );
    }

    #[test]
    fn init_code_words_are_charged_post_shanghai() {
        // 33 bytes of init code round up to two words.
        let data = [0u8; 33];
        let calldata_cost = 33 * CALLDATA_COST_ZERO_BYTE;
        assert_eq!(
            intrinsic_gas(&data, true, Fork::Paris).unwrap(),
            TX_BASE_COST + CREATE_BASE_COST + calldata_cost
        );
        assert_eq!(
            intrinsic_gas(&data, true, Fork::Shanghai).unwrap(),
            TX_BASE_COST + CREATE_BASE_COST + calldata_cost + 2 * INIT_CODE_WORD_COST
        );
    }

    #[test]
    fn access_list_fee_counts_addresses_and_keys() {
        let list = vec![
            AccessListEntry {
                address: Address::from_low_u64_be(1),
                storage_keys: vec![H256::from_low_u64_be(1), H256::from_low_u64_be(2)],
            },
            AccessListEntry {
                address: Address::from_low_u64_be(2),
                storage_keys: vec![],
            },
        ];
        assert_eq!(
            access_list_data_fee(&list).unwrap(),
            2 * ACCESS_LIST_ADDRESS_COST + 2 * ACCESS_LIST_STORAGE_KEY_COST
        );
        assert_eq!(access_list_data_fee(&[]).unwrap(), 0);
    }
}
