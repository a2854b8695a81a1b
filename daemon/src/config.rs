use clap::Args;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vela_common::config::ChainConfig;

use crate::core::mempool::DEFAULT_MEMPOOL_CAPACITY;

// Port 0 lets the OS pick a free port, the bound address is read back after start
pub const DEFAULT_RPC_BIND_ADDRESS: &str = "127.0.0.1:0";

pub const DEFAULT_BLOCK_TIME_MS: u64 = 200;
pub const DEFAULT_MAX_TXS_PER_BLOCK: usize = 500;

// A single worker is enough for test traffic
pub const DEFAULT_RPC_THREADS: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct NodeConfig {
    /// RPC bind address
    #[clap(long, default_value_t = String::from(DEFAULT_RPC_BIND_ADDRESS))]
    #[serde(default = "default_rpc_bind_address")]
    pub rpc_bind_address: String,
    /// Number of RPC worker threads
    #[clap(long, default_value_t = DEFAULT_RPC_THREADS)]
    #[serde(default = "default_rpc_threads")]
    pub rpc_threads: usize,
    /// Minimum delay between two blocks in milliseconds
    #[clap(long, default_value_t = DEFAULT_BLOCK_TIME_MS)]
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: u64,
    /// Maximum transactions included per block
    #[clap(long, default_value_t = DEFAULT_MAX_TXS_PER_BLOCK)]
    #[serde(default = "default_max_txs_per_block")]
    pub max_txs_per_block: usize,
    /// Maximum pending transactions before admission refuses new ones
    #[clap(long, default_value_t = DEFAULT_MEMPOOL_CAPACITY)]
    #[serde(default = "default_mempool_capacity")]
    pub mempool_capacity: usize,
    #[clap(skip)]
    #[serde(default)]
    pub chain: ChainConfig,
}

fn default_rpc_bind_address() -> String {
    DEFAULT_RPC_BIND_ADDRESS.to_string()
}

fn default_rpc_threads() -> usize {
    DEFAULT_RPC_THREADS
}

fn default_block_time_ms() -> u64 {
    DEFAULT_BLOCK_TIME_MS
}

fn default_max_txs_per_block() -> usize {
    DEFAULT_MAX_TXS_PER_BLOCK
}

fn default_mempool_capacity() -> usize {
    DEFAULT_MEMPOOL_CAPACITY
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_bind_address: default_rpc_bind_address(),
            rpc_threads: DEFAULT_RPC_THREADS,
            block_time_ms: DEFAULT_BLOCK_TIME_MS,
            max_txs_per_block: DEFAULT_MAX_TXS_PER_BLOCK,
            mempool_capacity: DEFAULT_MEMPOOL_CAPACITY,
            chain: ChainConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_rpc_bind_address(mut self, address: impl Into<String>) -> Self {
        self.rpc_bind_address = address.into();
        self
    }

    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time_ms = block_time.as_millis() as u64;
        self
    }

    pub fn with_max_txs_per_block(mut self, max: usize) -> Self {
        self.max_txs_per_block = max;
        self
    }

    pub fn with_mempool_capacity(mut self, capacity: usize) -> Self {
        self.mempool_capacity = capacity;
        self
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: NodeConfig = serde_json::from_str(r#"{"block_time_ms": 50}"#).unwrap();
        assert_eq!(config.block_time(), Duration::from_millis(50));
        assert_eq!(config.rpc_bind_address, DEFAULT_RPC_BIND_ADDRESS);
        assert_eq!(config.max_txs_per_block, DEFAULT_MAX_TXS_PER_BLOCK);
        assert_eq!(config.mempool_capacity, DEFAULT_MEMPOOL_CAPACITY);
        assert_eq!(config.chain, ChainConfig::default());
    }
}
