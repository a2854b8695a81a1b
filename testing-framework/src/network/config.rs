use crate::HarnessError;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use vela_common::{
    config::{ChainConfig, DEFAULT_DENOM},
    utils::amount_string,
};
use vela_daemon::{
    config::{DEFAULT_BLOCK_TIME_MS, DEFAULT_MAX_TXS_PER_BLOCK},
    core::handler::SharedHandler,
};
use vela_genesis::{DEFAULT_FUNDING, DEFAULT_STAKE_PER_VALIDATOR};

pub const DEFAULT_NUM_VALIDATORS: usize = 4;
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";

/// Parameters of a local network.
///
/// Every field has a default so a YAML file only needs the overrides:
///
/// ```yaml
/// num_validators: 2
/// block_time_ms: 100
/// key_seed: 42
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub num_validators: usize,
    pub chain: ChainConfig,
    pub denom: String,
    #[serde(with = "amount_string")]
    pub primary_funding: u128,
    #[serde(with = "amount_string")]
    pub fee_collector_funding: u128,
    #[serde(with = "amount_string")]
    pub stake_per_validator: u128,
    pub block_time_ms: u64,
    pub startup_timeout_ms: u64,
    pub max_txs_per_block: usize,
    // Nodes bind an ephemeral port on this host
    pub rpc_host: String,
    // Deterministic primary and validator keys when set
    pub key_seed: Option<u64>,
    // Runs every transaction on every node, not configurable from YAML
    #[serde(skip)]
    pub handler: SharedHandler,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_validators: DEFAULT_NUM_VALIDATORS,
            chain: ChainConfig::default(),
            denom: DEFAULT_DENOM.to_string(),
            primary_funding: DEFAULT_FUNDING,
            fee_collector_funding: DEFAULT_FUNDING,
            stake_per_validator: DEFAULT_STAKE_PER_VALIDATOR,
            block_time_ms: DEFAULT_BLOCK_TIME_MS,
            startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT_MS,
            max_txs_per_block: DEFAULT_MAX_TXS_PER_BLOCK,
            rpc_host: DEFAULT_RPC_HOST.to_string(),
            key_seed: None,
            handler: SharedHandler::default(),
        }
    }
}

impl NetworkConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, HarnessError> {
        serde_yaml::from_str(yaml).map_err(|err| HarnessError::setup("network config", err))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            HarnessError::setup(
                "network config",
                anyhow::Error::new(err).context(format!("reading {}", path.display())),
            )
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn with_validators(mut self, count: usize) -> Self {
        self.num_validators = count;
        self
    }

    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_denom(mut self, denom: impl Into<String>) -> Self {
        self.denom = denom.into();
        self
    }

    pub fn with_primary_funding(mut self, amount: u128) -> Self {
        self.primary_funding = amount;
        self
    }

    pub fn with_fee_collector_funding(mut self, amount: u128) -> Self {
        self.fee_collector_funding = amount;
        self
    }

    pub fn with_stake_per_validator(mut self, amount: u128) -> Self {
        self.stake_per_validator = amount;
        self
    }

    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time_ms = block_time.as_millis() as u64;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_txs_per_block(mut self, max: usize) -> Self {
        self.max_txs_per_block = max;
        self
    }

    pub fn with_rpc_host(mut self, host: impl Into<String>) -> Self {
        self.rpc_host = host.into();
        self
    }

    pub fn with_key_seed(mut self, seed: u64) -> Self {
        self.key_seed = Some(seed);
        self
    }

    pub fn with_handler(mut self, handler: SharedHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub(crate) fn rpc_bind_address(&self) -> String {
        format!("{}:0", self.rpc_host)
    }
}
