use ethsim_common::{Address, H160, types::Fork};

/// Iteration bound for the access list fixed point. Exceeding it is a bug
/// surface and is reported to the caller unchanged.
pub const MAX_ACCESS_LIST_ITERATIONS: usize = 1000;

/// The console logging pseudo-contract, `0x…636f6e736f6c652e6c6f67`
/// ("console.log" in ASCII). Calls into it are surfaced as events, never
/// executed.
pub const CONSOLE_ADDRESS: Address = H160([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x63, 0x6f, 0x6e, 0x73, 0x6f, 0x6c,
    0x65, 0x2e, 0x6c, 0x6f, 0x67,
]);

/// Selector of `log(string)` on the console pseudo-contract.
pub const CONSOLE_LOG_STRING_SELECTOR: [u8; 4] = [0x41, 0x30, 0x4f, 0xac];

pub mod opcodes {
    pub const CALL: u8 = 0xf1;
    pub const CALLCODE: u8 = 0xf2;
    pub const DELEGATECALL: u8 = 0xf4;
    pub const STATICCALL: u8 = 0xfa;
}

const SIZE_PRECOMPILES_FRONTIER: u64 = 4;
const SIZE_PRECOMPILES_BYZANTIUM: u64 = 8;
const SIZE_PRECOMPILES_ISTANBUL: u64 = 9;
const SIZE_PRECOMPILES_CANCUN: u64 = 10;

/// Addresses of the precompiled contracts active at `fork`, i.e.
/// `0x01..=0x04` on Frontier up to `0x01..=0x0a` on Cancun.
pub fn precompile_addresses(fork: Fork) -> impl Iterator<Item = Address> {
    let count = if fork >= Fork::Cancun {
        SIZE_PRECOMPILES_CANCUN
    } else if fork >= Fork::Istanbul {
        SIZE_PRECOMPILES_ISTANBUL
    } else if fork >= Fork::Byzantium {
        SIZE_PRECOMPILES_BYZANTIUM
    } else {
        SIZE_PRECOMPILES_FRONTIER
    };
    (1..=count).map(Address::from_low_u64_be)
}
