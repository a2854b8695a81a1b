use serde::{Deserialize, Serialize};

pub const VERSION: &str = env!("BUILD_VERSION");

// Cosmos-style chain identifier: <name>_<evm chain id>-<epoch>
pub const DEFAULT_CHAIN_ID: &str = "vela_9000-1";
pub const DEFAULT_EVM_CHAIN_ID: u64 = 9000;

// Base denomination (18 decimals, like wei)
pub const DEFAULT_DENOM: &str = "avela";

pub const ACCOUNT_ADDRESS_PREFIX: &str = "vela";
pub const VALIDATOR_OPERATOR_PREFIX: &str = "velavaloper";
pub const VALIDATOR_CONSENSUS_PREFIX: &str = "velavalcons";

// Module accounts
pub const FEE_COLLECTOR_MODULE: &str = "fee_collector";
pub const BONDED_POOL_MODULE: &str = "bonded_tokens_pool";

// Gas schedule
pub const TX_BASE_GAS: u64 = 21_000;
pub const TX_CREATE_GAS: u64 = 32_000;
pub const TX_DATA_ZERO_GAS: u64 = 4;
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;
pub const MAX_INIT_CODE_SIZE: usize = 49_152;
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Human readable prefixes used when formatting addresses as bech32
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bech32Config {
    pub account: String,
    pub validator_operator: String,
    pub validator_consensus: String,
}

impl Default for Bech32Config {
    fn default() -> Self {
        Self {
            account: ACCOUNT_ADDRESS_PREFIX.to_string(),
            validator_operator: VALIDATOR_OPERATOR_PREFIX.to_string(),
            validator_consensus: VALIDATOR_CONSENSUS_PREFIX.to_string(),
        }
    }
}

/// Chain wide configuration shared by genesis, nodes and the test harness.
///
/// Passed explicitly everywhere an address must be formatted or a
/// transaction signed, there is no global instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: String,
    pub evm_chain_id: u64,
    #[serde(default)]
    pub bech32: Bech32Config,
    #[serde(default = "default_block_gas_limit")]
    pub block_gas_limit: u64,
}

fn default_block_gas_limit() -> u64 {
    DEFAULT_BLOCK_GAS_LIMIT
}

impl ChainConfig {
    pub fn new(chain_id: impl Into<String>, evm_chain_id: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            evm_chain_id,
            bech32: Bech32Config::default(),
            block_gas_limit: DEFAULT_BLOCK_GAS_LIMIT,
        }
    }

    pub fn with_bech32(mut self, bech32: Bech32Config) -> Self {
        self.bech32 = bech32;
        self
    }

    pub fn with_block_gas_limit(mut self, limit: u64) -> Self {
        self.block_gas_limit = limit;
        self
    }

    /// Parse the EVM chain id embedded in a `<name>_<id>-<epoch>` chain id
    pub fn parse_evm_chain_id(chain_id: &str) -> Option<u64> {
        let (_, rest) = chain_id.rsplit_once('_')?;
        let (id, epoch) = rest.split_once('-')?;
        epoch.parse::<u64>().ok()?;
        id.parse().ok()
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_ID, DEFAULT_EVM_CHAIN_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evm_chain_id() {
        assert_eq!(ChainConfig::parse_evm_chain_id("vela_9000-1"), Some(9000));
        assert_eq!(ChainConfig::parse_evm_chain_id("my_chain_42-7"), Some(42));
        assert_eq!(ChainConfig::parse_evm_chain_id("vela-1"), None);
        assert_eq!(ChainConfig::parse_evm_chain_id("vela_abc-1"), None);
    }

    #[test]
    fn test_default_matches_chain_id() {
        let config = ChainConfig::default();
        assert_eq!(
            ChainConfig::parse_evm_chain_id(&config.chain_id),
            Some(config.evm_chain_id)
        );
    }
}
