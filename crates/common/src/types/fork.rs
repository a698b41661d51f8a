use serde::{Deserialize, Serialize};

/// Ethereum hard forks, ordered by activation. Comparing two forks with
/// `>=` answers "is this EIP set active", e.g. `fork >= Fork::Berlin` is
/// the EIP-2929/2930 activation check.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Fork {
    Frontier = 0,
    Homestead = 1,
    Tangerine = 2,
    SpuriousDragon = 3,
    Byzantium = 4,
    Petersburg = 5,
    Istanbul = 6,
    Berlin = 7,
    London = 8,
    Paris = 9,
    Shanghai = 10,
    #[default]
    Cancun = 11,
}

impl From<Fork> for &str {
    fn from(fork: Fork) -> Self {
        match fork {
            Fork::Frontier => "Frontier",
            Fork::Homestead => "Homestead",
            Fork::Tangerine => "Tangerine",
            Fork::SpuriousDragon => "SpuriousDragon",
            Fork::Byzantium => "Byzantium",
            Fork::Petersburg => "Petersburg",
            Fork::Istanbul => "Istanbul",
            Fork::Berlin => "Berlin",
            Fork::London => "London",
            Fork::Paris => "Paris",
            Fork::Shanghai => "Shanghai",
            Fork::Cancun => "Cancun",
        }
    }
}

impl core::fmt::Display for Fork {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(<&str>::from(*self))
    }
}

/// Fork activation schedule, geth genesis-config naming.
/// (None = fork never activates, 0 = active from genesis)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub homestead_block: Option<u64>,
    #[serde(default)]
    pub eip150_block: Option<u64>,
    #[serde(default)]
    pub eip158_block: Option<u64>,
    #[serde(default)]
    pub byzantium_block: Option<u64>,
    #[serde(default)]
    pub petersburg_block: Option<u64>,
    #[serde(default)]
    pub istanbul_block: Option<u64>,
    #[serde(default)]
    pub berlin_block: Option<u64>,
    #[serde(default)]
    pub london_block: Option<u64>,
    #[serde(default)]
    pub merge_netsplit_block: Option<u64>,
    #[serde(default)]
    pub shanghai_time: Option<u64>,
    #[serde(default)]
    pub cancun_time: Option<u64>,
}

impl ChainConfig {
    /// A config with every fork up to and including `fork` active from
    /// genesis. This is the schedule development chains run with.
    pub fn from_fork(fork: Fork) -> Self {
        let block = |f: Fork| (fork >= f).then_some(0);
        let time = |f: Fork| (fork >= f).then_some(0);
        Self {
            chain_id: 1337,
            homestead_block: block(Fork::Homestead),
            eip150_block: block(Fork::Tangerine),
            eip158_block: block(Fork::SpuriousDragon),
            byzantium_block: block(Fork::Byzantium),
            petersburg_block: block(Fork::Petersburg),
            istanbul_block: block(Fork::Istanbul),
            berlin_block: block(Fork::Berlin),
            london_block: block(Fork::London),
            merge_netsplit_block: block(Fork::Paris),
            shanghai_time: time(Fork::Shanghai),
            cancun_time: time(Fork::Cancun),
        }
    }

    /// Resolves the active fork for a block. Pre-merge forks activate by
    /// block number, post-merge forks by timestamp.
    pub fn fork(&self, block_number: u64, timestamp: u64) -> Fork {
        let active_at_block = |activation: Option<u64>| activation.is_some_and(|b| block_number >= b);
        let active_at_time = |activation: Option<u64>| activation.is_some_and(|t| timestamp >= t);

        if active_at_time(self.cancun_time) {
            Fork::Cancun
        } else if active_at_time(self.shanghai_time) {
            Fork::Shanghai
        } else if active_at_block(self.merge_netsplit_block) {
            Fork::Paris
        } else if active_at_block(self.london_block) {
            Fork::London
        } else if active_at_block(self.berlin_block) {
            Fork::Berlin
        } else if active_at_block(self.istanbul_block) {
            Fork::Istanbul
        } else if active_at_block(self.petersburg_block) {
            Fork::Petersburg
        } else if active_at_block(self.byzantium_block) {
            Fork::Byzantium
        } else if active_at_block(self.eip158_block) {
            Fork::SpuriousDragon
        } else if active_at_block(self.eip150_block) {
            Fork::Tangerine
        } else if active_at_block(self.homestead_block) {
            Fork::Homestead
        } else {
            Fork::Frontier
        }
    }
}
