use super::{NetworkConfig, NodeRpc};
use crate::{utilities::format_elapsed, HarnessError};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use log::{debug, info, warn};
use std::{
    borrow::Cow,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use strum::Display;
use tokio::{
    sync::{watch, Mutex},
    time::{sleep_until, timeout_at, Instant},
};
use vela_common::{
    api::daemon::{
        GetBalanceParams, GetBalanceResult, GetNonceParams, SubmitTransactionParams,
        SubmitTransactionResult,
    },
    crypto::Address,
    rpc::client::{JsonRPCClient, JsonRPCError},
    serializer::Serializer,
    transaction::Transaction,
};
use vela_daemon::{
    config::NodeConfig,
    consensus::LocalConsensus,
    core::state::LedgerState,
    Node,
};
use vela_genesis::{GenesisBuilder, GenesisOutput, TestIdentity, ValidatorIdentity};

/// Interval between two height polls
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of a [`Network`].
/// Only `Live` accepts queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HarnessState {
    Uninitialized,
    Starting,
    Live,
    TearingDown,
    Stopped,
}

/// RPC view of one validator node
pub struct ValidatorHandle {
    identity: ValidatorIdentity,
    endpoint: String,
    client: JsonRPCClient,
}

impl ValidatorHandle {
    pub fn identity(&self) -> &ValidatorIdentity {
        &self.identity
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn client(&self) -> &JsonRPCClient {
        &self.client
    }

    /// Submit an already hex encoded envelope.
    /// Admission rejections come back as [`JsonRPCError::Server`].
    pub async fn submit_hex(&self, data: String) -> Result<SubmitTransactionResult, JsonRPCError> {
        self.client
            .call_with("submit_transaction", &SubmitTransactionParams { data })
            .await
    }
}

#[async_trait]
impl NodeRpc for ValidatorHandle {
    async fn get_height(&self) -> anyhow::Result<u64> {
        self.client
            .call("get_height")
            .await
            .with_context(|| format!("get_height on {}", self.identity.moniker()))
    }

    async fn get_balance(&self, address: &Address) -> anyhow::Result<u128> {
        let result: GetBalanceResult = self
            .client
            .call_with(
                "get_balance",
                &GetBalanceParams {
                    address: Cow::Borrowed(address),
                },
            )
            .await
            .with_context(|| format!("get_balance of {} on {}", address, self.identity.moniker()))?;
        Ok(result.balance)
    }

    async fn get_nonce(&self, address: &Address) -> anyhow::Result<u64> {
        self.client
            .call_with(
                "get_nonce",
                &GetNonceParams {
                    address: Cow::Borrowed(address),
                },
            )
            .await
            .with_context(|| format!("get_nonce of {} on {}", address, self.identity.moniker()))
    }

    async fn submit_transaction(&self, tx: &Transaction) -> anyhow::Result<SubmitTransactionResult> {
        self.submit_hex(tx.to_hex())
            .await
            .with_context(|| format!("submit_transaction {} on {}", tx.hash(), self.identity.moniker()))
    }
}

/// A local network of validator nodes owned by one test.
///
/// Queries fail fast with [`HarnessError::Stopped`] once teardown began and
/// in-flight waits observe the state change. Dropping the network without
/// awaiting [`Network::cleanup`] still aborts every node task.
pub struct Network {
    config: NetworkConfig,
    genesis: GenesisOutput,
    // Drained on cleanup
    nodes: Mutex<Vec<Node>>,
    validators: Vec<ValidatorHandle>,
    state: watch::Sender<HarnessState>,
    last_height: AtomicU64,
}

impl Network {
    /// Build the genesis, start every node and wait for height 1
    pub async fn new(config: NetworkConfig) -> Result<Self, HarnessError> {
        let started_at = Instant::now();
        if config.num_validators == 0 {
            return Err(HarnessError::setup(
                "network config",
                anyhow!("a network needs at least one validator"),
            ));
        }

        let (state, _) = watch::channel(HarnessState::Uninitialized);
        state.send_replace(HarnessState::Starting);

        let mut builder = GenesisBuilder::new(config.chain.clone())
            .with_denom(config.denom.clone())
            .with_primary_funding(config.primary_funding)
            .with_fee_collector_funding(config.fee_collector_funding)
            .with_stake_per_validator(config.stake_per_validator);
        builder = match config.key_seed {
            Some(seed) => builder
                .with_primary(TestIdentity::from_seed(seed))
                .with_seeded_validators(config.num_validators, seed),
            None => builder.with_generated_validators(config.num_validators),
        };
        let genesis = builder
            .build()
            .map_err(|err| HarnessError::setup("genesis", err))?;

        let mut network = Self {
            config,
            genesis,
            nodes: Mutex::new(Vec::new()),
            validators: Vec::new(),
            state,
            last_height: AtomicU64::new(0),
        };

        if let Err(err) = network.start_nodes().await {
            network.cleanup().await?;
            return Err(err);
        }

        network.state.send_replace(HarnessState::Live);
        if let Err(err) = network
            .wait_for_height_with_timeout(1, network.config.startup_timeout())
            .await
        {
            network.cleanup().await?;
            return Err(HarnessError::Startup(anyhow::Error::new(err)));
        }

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Network {} is live with {} validator(s) after {}",
                network.genesis.chain.chain_id,
                network.validators.len(),
                format_elapsed(started_at.elapsed())
            );
        }
        Ok(network)
    }

    async fn start_nodes(&mut self) -> Result<(), HarnessError> {
        let genesis_bytes = self
            .genesis
            .state
            .to_json_bytes()
            .map_err(|err| HarnessError::setup("genesis", err))?;
        let consensus = Arc::new(
            LocalConsensus::new(
                self.genesis
                    .validators
                    .iter()
                    .map(|validator| validator.consensus_address())
                    .collect(),
            )
            .map_err(|err| HarnessError::setup("consensus", err))?,
        );
        let chain_id = self.genesis.chain.chain_id.clone();

        for identity in self.genesis.validators.clone() {
            let node_config = NodeConfig::default()
                .with_chain(self.genesis.chain.clone())
                .with_rpc_bind_address(self.config.rpc_bind_address())
                .with_block_time(self.config.block_time())
                .with_max_txs_per_block(self.config.max_txs_per_block);
            let node = Node::new(
                node_config,
                identity.clone(),
                consensus.clone(),
                self.config.handler.handler(),
            );

            node.init_with_genesis(&chain_id, &genesis_bytes)
                .with_context(|| format!("init chain on {}", identity.moniker()))
                .map_err(HarnessError::Startup)?;
            let started = node
                .start()
                .await
                .with_context(|| format!("start {}", identity.moniker()));
            let endpoint = node.rpc_endpoint();
            // Recorded even when the start failed so cleanup reaches it
            self.nodes.get_mut().push(node);
            started.map_err(HarnessError::Startup)?;

            let endpoint = endpoint.ok_or_else(|| {
                HarnessError::Startup(anyhow!("{} has no RPC endpoint", identity.moniker()))
            })?;
            let client = JsonRPCClient::new(endpoint.clone())
                .map_err(|err| HarnessError::setup("rpc client", err))?;

            if log::log_enabled!(log::Level::Debug) {
                debug!("Started {} on {}", identity.moniker(), endpoint);
            }
            self.validators.push(ValidatorHandle {
                identity,
                endpoint,
                client,
            });
        }
        Ok(())
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn genesis(&self) -> &GenesisOutput {
        &self.genesis
    }

    /// Funded account of the genesis
    pub fn primary(&self) -> &TestIdentity {
        &self.genesis.primary
    }

    pub fn validators(&self) -> &[ValidatorHandle] {
        &self.validators
    }

    pub fn validator(&self, index: usize) -> Option<&ValidatorHandle> {
        self.validators.get(index)
    }

    pub fn state(&self) -> HarnessState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<HarnessState> {
        self.state.subscribe()
    }

    fn ensure_live(&self) -> Result<(), HarnessError> {
        match self.state() {
            HarnessState::Live => Ok(()),
            HarnessState::Uninitialized | HarnessState::Starting => Err(HarnessError::NotLive),
            HarnessState::TearingDown | HarnessState::Stopped => Err(HarnessError::Stopped),
        }
    }

    /// Minimum height across all nodes.
    /// Never lower than a previously returned value.
    pub async fn latest_height(&self) -> Result<u64, HarnessError> {
        self.ensure_live()?;
        let heights = match try_join_all(self.validators.iter().map(|node| node.get_height())).await {
            Ok(heights) => heights,
            Err(err) => {
                // Nodes going away during teardown is not an RPC failure
                self.ensure_live()?;
                return Err(HarnessError::Rpc(err));
            }
        };

        let min = heights.into_iter().min().unwrap_or_default();
        let previous = self.last_height.fetch_max(min, Ordering::SeqCst);
        Ok(previous.max(min))
    }

    /// Wait until every node reached `target`, without a deadline
    pub async fn wait_for_height(&self, target: u64) -> Result<u64, HarnessError> {
        self.wait_until(target, None).await
    }

    /// Wait until every node reached `target` or `duration` elapsed.
    /// The harness stays usable after a timeout.
    pub async fn wait_for_height_with_timeout(
        &self,
        target: u64,
        duration: Duration,
    ) -> Result<u64, HarnessError> {
        self.wait_until(target, Some(duration)).await
    }

    async fn wait_until(&self, target: u64, limit: Option<Duration>) -> Result<u64, HarnessError> {
        let start = Instant::now();
        let deadline = limit.map(|limit| start + limit);
        let mut state = self.subscribe_state();
        let mut last_height = self.last_height.load(Ordering::SeqCst);

        loop {
            self.ensure_live()?;
            let height = match deadline {
                Some(deadline) => match timeout_at(deadline, self.latest_height()).await {
                    Ok(height) => Some(height?),
                    Err(_) => None,
                },
                None => Some(self.latest_height().await?),
            };

            if let Some(height) = height {
                last_height = height;
                if height >= target {
                    return Ok(height);
                }
            }

            if self.producer_failed().await {
                // Resumes the producer panic
                self.cleanup().await?;
                return Err(HarnessError::Stopped);
            }

            let next_poll = Instant::now() + POLL_INTERVAL;
            let wake = match deadline {
                Some(deadline) if deadline <= Instant::now() => {
                    if log::log_enabled!(log::Level::Debug) {
                        debug!(
                            "Gave up on height {} at {} after {}",
                            target,
                            last_height,
                            format_elapsed(start.elapsed())
                        );
                    }
                    return Err(HarnessError::Timeout {
                        target,
                        last_height,
                        elapsed: start.elapsed(),
                    });
                }
                Some(deadline) => next_poll.min(deadline),
                None => next_poll,
            };

            tokio::select! {
                _ = sleep_until(wake) => {},
                // The sender lives in self, this only fires on a state change
                _ = state.changed() => {},
            }
        }
    }

    async fn producer_failed(&self) -> bool {
        self.nodes.lock().await.iter().any(Node::producer_failed)
    }

    /// Run `f` against the ledger of every node, in validator order
    pub async fn inspect_ledgers<R>(
        &self,
        f: impl Fn(&LedgerState) -> R,
    ) -> Result<Vec<R>, HarnessError> {
        self.ensure_live()?;
        let nodes = self.nodes.lock().await;
        nodes
            .iter()
            .map(|node| {
                node.blockchain()
                    .with_state(&f)
                    .map_err(|err| HarnessError::Rpc(err.into()))
            })
            .collect()
    }

    /// Stop every node. Concurrent and repeated calls are fine, they all
    /// return once the network is stopped.
    ///
    /// Panics with the original payload if a node's transaction handler
    /// panicked.
    pub async fn cleanup(&self) -> Result<(), HarnessError> {
        let proceed = self.state.send_if_modified(|state| match state {
            HarnessState::TearingDown | HarnessState::Stopped => false,
            _ => {
                *state = HarnessState::TearingDown;
                true
            }
        });
        if !proceed {
            let mut state = self.subscribe_state();
            // Sender is owned by self so this cannot fail while we wait
            let _ = state.wait_for(|state| *state == HarnessState::Stopped).await;
            return Ok(());
        }

        let nodes = std::mem::take(&mut *self.nodes.lock().await);
        if log::log_enabled!(log::Level::Info) {
            info!("Tearing down network ({} node(s))", nodes.len());
        }
        let shutdowns = nodes
            .into_iter()
            .map(|node| tokio::spawn(async move { node.shutdown().await }));
        let results = join_all(shutdowns).await;
        self.state.send_replace(HarnessState::Stopped);

        // A handler panic inside a node surfaces here, after every node stopped
        for result in results {
            match result {
                Ok(()) => {}
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => warn!("Node shutdown task failed: {}", err),
            }
        }
        Ok(())
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        if self.state() == HarnessState::Stopped {
            return;
        }
        if log::log_enabled!(log::Level::Warn) {
            warn!("Network dropped without cleanup, aborting node tasks");
        }
        self.state.send_replace(HarnessState::TearingDown);
        // Dropping a node aborts its producer and RPC server
        self.nodes.get_mut().clear();
        self.state.send_replace(HarnessState::Stopped);
    }
}
