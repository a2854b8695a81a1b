use crate::{
    invariants::check_ledger,
    network::{Network, NetworkConfig},
    HarnessError,
};
use anyhow::anyhow;
use log::{debug, info};
use std::time::Duration;
use vela_common::{
    crypto::Hash,
    rpc::client::JsonRPCError,
    serializer::{ReaderError, Serializer},
    transaction::Transaction,
};

pub const DEFAULT_TARGET_HEIGHT: u64 = 10;
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct NetworkRpcFuzzConfig {
    pub network: NetworkConfig,
    /// Height every node must reach after the submission
    pub target_height: u64,
    pub liveness_timeout: Duration,
}

impl Default for NetworkRpcFuzzConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            target_height: DEFAULT_TARGET_HEIGHT,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
        }
    }
}

impl NetworkRpcFuzzConfig {
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_target_height(mut self, height: u64) -> Self {
        self.target_height = height;
        self
    }

    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }
}

/// Answer of the node to the submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted(Hash),
    Rejected { code: i64, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCaseOutcome {
    /// Input is not a transaction envelope, no network was started
    Discarded(ReaderError),
    Submitted {
        tx_hash: Hash,
        admission: Admission,
        /// Minimum height once the liveness check passed
        height: u64,
    },
}

/// Submit raw bytes to a fresh network and check it keeps producing blocks.
///
/// The network is cleaned up on every return path, dropping it while
/// unwinding aborts the node tasks.
pub async fn run_network_rpc_case(
    data: &[u8],
    config: &NetworkRpcFuzzConfig,
) -> Result<NetworkCaseOutcome, HarnessError> {
    let tx = match Transaction::from_bytes(data) {
        Ok(tx) => tx,
        Err(err) => {
            if log::log_enabled!(log::Level::Debug) {
                debug!("Discarding fuzz input of {} bytes: {}", data.len(), err);
            }
            return Ok(NetworkCaseOutcome::Discarded(err));
        }
    };

    let network = Network::new(config.network.clone()).await?;
    let result = drive(&network, &tx, data, config).await;
    network.cleanup().await?;
    result
}

async fn drive(
    network: &Network,
    tx: &Transaction,
    data: &[u8],
    config: &NetworkRpcFuzzConfig,
) -> Result<NetworkCaseOutcome, HarnessError> {
    network.wait_for_height(1).await?;

    let node = network
        .validator(0)
        .ok_or_else(|| HarnessError::setup("network", anyhow!("no validator to submit to")))?;
    let admission = match node.submit_hex(hex::encode(data)).await {
        Ok(result) => Admission::Accepted(result.hash),
        Err(JsonRPCError::Server { code, message }) => Admission::Rejected { code, message },
        Err(err) => return Err(HarnessError::Rpc(err.into())),
    };
    if log::log_enabled!(log::Level::Info) {
        info!("Fuzz tx {} submitted: {:?}", tx.hash(), admission);
    }

    let reached = match network
        .wait_for_height_with_timeout(config.target_height, config.liveness_timeout)
        .await
    {
        Ok(height) => height,
        Err(HarnessError::Timeout { last_height, .. }) => {
            return Err(HarnessError::Liveness {
                expected: config.target_height,
                observed: last_height,
            })
        }
        Err(err) => return Err(err),
    };

    let latest = network.latest_height().await?;
    if latest < reached {
        return Err(HarnessError::Liveness {
            expected: reached,
            observed: latest,
        });
    }

    for result in network.inspect_ledgers(check_ledger).await? {
        result?;
    }

    Ok(NetworkCaseOutcome::Submitted {
        tx_hash: tx.hash(),
        admission,
        height: latest,
    })
}
