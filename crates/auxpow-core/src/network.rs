//! Network definitions, consensus parameters and constants.

use serde::{Deserialize, Serialize};

/// Network type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    /// Local regression testing with a trivial proof-of-work limit.
    Regtest,
}

impl Network {
    /// Parse network from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Some(Network::Mainnet),
            "testnet" | "test" => Some(Network::Testnet),
            "regtest" => Some(Network::Regtest),
            _ => None,
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    /// Easiest allowed target in compact form.
    pub fn pow_limit_bits(&self) -> u32 {
        match self {
            Network::Mainnet | Network::Testnet => POW_LIMIT_BITS,
            Network::Regtest => REGTEST_POW_LIMIT_BITS,
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Hash function used for a header's proof of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowAlgorithm {
    /// scrypt with N=1024, r=1, p=1 over the 80-byte header.
    #[default]
    Scrypt,
    /// Double SHA256, the same function as the header identity hash.
    Sha256d,
}

/// Consensus parameters consulted by proof-of-work and maturity checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    pub pow_algorithm: PowAlgorithm,
    /// Easiest allowed target in compact form.
    pub pow_limit_bits: u32,
    /// Accept any header hash. Test networks only.
    pub skip_pow_check: bool,
    /// Reject aux blocks whose version carries a foreign chain id, and parents carrying ours.
    pub strict_chain_id: bool,
    /// Chain id this chain's blocks carry in their version.
    pub auxpow_chain_id: i32,
    /// Confirmations before coinbase outputs may be spent.
    pub coinbase_maturity: u32,
}

impl ConsensusParams {
    pub fn for_network(network: Network) -> Self {
        ConsensusParams {
            pow_limit_bits: network.pow_limit_bits(),
            strict_chain_id: network != Network::Regtest,
            ..ConsensusParams::default()
        }
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        ConsensusParams {
            pow_algorithm: PowAlgorithm::Scrypt,
            pow_limit_bits: POW_LIMIT_BITS,
            skip_pow_check: false,
            strict_chain_id: true,
            auxpow_chain_id: DEFAULT_AUXPOW_CHAIN_ID,
            coinbase_maturity: COINBASE_MATURITY,
        }
    }
}

/// Merge-mining marker preceding the commitment in a parent coinbase script.
pub const MERGED_MINING_HEADER: [u8; 4] = [0xfa, 0xbe, b'm', b'm'];

/// Tallest chain merkle tree accepted.
pub const MAX_CHAIN_MERKLE_HEIGHT: u32 = 30;

/// Version bit marking a header that carries an aux proof.
pub const VERSION_AUXPOW: i32 = 1 << 8;

/// Chain id occupies the version bits from here up.
pub const VERSION_CHAIN_START: i32 = 1 << 16;

/// Base block version for newly built headers.
pub const BLOCK_VERSION: i32 = 2;

/// Default chain id of this chain in merge-mined headers.
pub const DEFAULT_AUXPOW_CHAIN_ID: i32 = 1;

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Coinbase maturity - blocks before coinbase can be spent.
pub const COINBASE_MATURITY: u32 = 100;

/// Mainnet and testnet limit: 2^236 - 1.
pub const POW_LIMIT_BITS: u32 = 0x1e0fffff;

/// Regtest limit: about half of all hashes qualify.
pub const REGTEST_POW_LIMIT_BITS: u32 = 0x207fffff;
