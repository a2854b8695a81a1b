//! A validator node: blockchain, RPC server and block producer task.

use crate::{
    config::NodeConfig,
    consensus::{ConsensusError, LocalConsensus},
    core::{
        blockchain::{Blockchain, InitChainRequest},
        error::BlockchainError,
        handler::TransactionHandler,
    },
    rpc::{DaemonRpcServer, SharedDaemonRpcServer},
};
use log::{debug, error, info, trace};
use parking_lot::Mutex;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{sleep, Instant},
};
use vela_common::{
    crypto::{Address, Hash},
    time::get_current_time_in_millis,
    transaction::Transaction,
};
use vela_genesis::ValidatorIdentity;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
    #[error("RPC server error: {0:#}")]
    Rpc(anyhow::Error),
    #[error("node is already started")]
    AlreadyStarted,
    #[error("node has been shut down")]
    ShutDown,
}

#[derive(Default)]
struct NodeTasks {
    producer: Option<JoinHandle<()>>,
    rpc: Option<SharedDaemonRpcServer>,
    started: bool,
}

pub struct Node {
    config: NodeConfig,
    identity: ValidatorIdentity,
    blockchain: Arc<Blockchain>,
    consensus: Arc<LocalConsensus>,
    tasks: Mutex<NodeTasks>,
    shutdown: watch::Sender<bool>,
}

impl Node {
    pub fn new(
        config: NodeConfig,
        identity: ValidatorIdentity,
        consensus: Arc<LocalConsensus>,
        handler: Arc<dyn TransactionHandler>,
    ) -> Self {
        let blockchain = Blockchain::new(config.chain.clone(), handler)
            .with_max_txs_per_block(config.max_txs_per_block)
            .with_mempool_capacity(config.mempool_capacity)
            .with_local_validator(identity.consensus_address());
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            identity,
            blockchain: Arc::new(blockchain),
            consensus,
            tasks: Mutex::new(NodeTasks::default()),
            shutdown,
        }
    }

    pub fn identity(&self) -> &ValidatorIdentity {
        &self.identity
    }

    pub fn blockchain(&self) -> &Arc<Blockchain> {
        &self.blockchain
    }

    pub fn init_with_genesis(&self, chain_id: &str, genesis: &[u8]) -> Result<Hash, NodeError> {
        let app_hash = self
            .blockchain
            .init_chain(InitChainRequest::new(chain_id, genesis.to_vec()))?;
        Ok(app_hash)
    }

    /// Start the RPC server then the block producer
    pub async fn start(&self) -> Result<(), NodeError> {
        {
            let mut tasks = self.tasks.lock();
            if *self.shutdown.borrow() {
                return Err(NodeError::ShutDown);
            }
            if tasks.started {
                return Err(NodeError::AlreadyStarted);
            }
            tasks.started = true;
        }
        if !self.blockchain.is_initialized() {
            self.tasks.lock().started = false;
            return Err(BlockchainError::NotInitialized.into());
        }

        let rpc = match DaemonRpcServer::new(
            self.blockchain.clone(),
            &self.config.rpc_bind_address,
            self.config.rpc_threads,
        )
        .await
        {
            Ok(rpc) => rpc,
            Err(err) => {
                self.tasks.lock().started = false;
                return Err(NodeError::Rpc(err));
            }
        };

        let producer = BlockProducer {
            blockchain: self.blockchain.clone(),
            consensus: self.consensus.clone(),
            proposer: self.identity.consensus_address(),
            block_time: self.config.block_time(),
            moniker: self.identity.moniker().to_string(),
        };
        let handle = tokio::spawn(producer.run(self.shutdown.subscribe()));

        {
            let mut tasks = self.tasks.lock();
            tasks.rpc = Some(rpc);
            tasks.producer = Some(handle);
        }

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Node {} started, RPC on {}",
                self.identity.moniker(),
                self.rpc_endpoint().unwrap_or_default()
            );
        }
        Ok(())
    }

    pub fn submit_transaction(&self, tx: Transaction) -> Result<Hash, NodeError> {
        Ok(self.blockchain.add_tx_to_mempool(tx)?)
    }

    pub fn get_height(&self) -> Result<u64, NodeError> {
        Ok(self.blockchain.get_height()?)
    }

    pub fn rpc_address(&self) -> Option<SocketAddr> {
        self.tasks.lock().rpc.as_ref().map(|rpc| rpc.bind_address())
    }

    pub fn rpc_endpoint(&self) -> Option<String> {
        self.tasks.lock().rpc.as_ref().map(|rpc| rpc.endpoint())
    }

    /// True when the block producer exited without being asked to,
    /// which only happens when it panicked. [`Node::shutdown`] resumes
    /// that panic.
    pub fn producer_failed(&self) -> bool {
        let finished = self
            .tasks
            .lock()
            .producer
            .as_ref()
            .is_some_and(|producer| producer.is_finished());
        finished && !*self.shutdown.borrow()
    }

    /// Stop the producer and the RPC server. Calling it again is a no-op.
    ///
    /// A panic raised by the producer, typically from the transaction
    /// handler, resumes here once the RPC server is stopped.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let (producer, rpc) = {
            let mut tasks = self.tasks.lock();
            (tasks.producer.take(), tasks.rpc.take())
        };

        let mut panic = None;
        if let Some(producer) = producer {
            match producer.await {
                Ok(()) => {}
                Err(err) if err.is_panic() => {
                    if log::log_enabled!(log::Level::Error) {
                        error!("Block producer of {} panicked", self.identity.moniker());
                    }
                    panic = Some(err.into_panic());
                }
                Err(err) => {
                    if log::log_enabled!(log::Level::Error) {
                        error!("Block producer of {} failed: {}", self.identity.moniker(), err);
                    }
                }
            }
        }
        if let Some(rpc) = rpc {
            rpc.stop().await;
            if log::log_enabled!(log::Level::Info) {
                info!("Node {} stopped", self.identity.moniker());
            }
        }

        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        let tasks = self.tasks.get_mut();
        if let Some(producer) = tasks.producer.take() {
            producer.abort();
        }
        if let Some(rpc) = tasks.rpc.take() {
            rpc.abort();
        }
    }
}

struct BlockProducer {
    blockchain: Arc<Blockchain>,
    consensus: Arc<LocalConsensus>,
    proposer: Address,
    block_time: Duration,
    moniker: String,
}

impl BlockProducer {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut last_height = self.blockchain.get_height().unwrap_or(0);
        let mut last_progress = Instant::now();

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Registered before reading the log so a commit can't be missed
            let notified = self.consensus.notified();

            let height = match self.sync() {
                Ok(height) => height,
                Err(err) => {
                    error!("{}: error while following the block log: {}", self.moniker, err);
                    last_height
                }
            };
            if height != last_height {
                last_height = height;
                last_progress = Instant::now();
            }

            let next = height + 1;
            let elapsed = last_progress.elapsed();
            if self.consensus.proposer_for(next) == Some(self.proposer) && elapsed >= self.block_time
            {
                self.propose(next);
                // Paces retries if the proposal did not make it
                last_progress = Instant::now();
                continue;
            }

            let wait = self
                .block_time
                .checked_sub(elapsed)
                .filter(|wait| !wait.is_zero())
                .unwrap_or(self.block_time);
            tokio::select! {
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
                _ = notified => {}
                _ = sleep(wait) => {}
            }
        }

        if log::log_enabled!(log::Level::Debug) {
            debug!("{}: block producer exited at height {}", self.moniker, last_height);
        }
    }

    // Apply every committed block we don't have yet
    fn sync(&self) -> Result<u64, BlockchainError> {
        let height = self.blockchain.get_height()?;
        for block in self.consensus.blocks_after(height) {
            self.blockchain.apply_block(&block)?;
        }
        self.blockchain.get_height()
    }

    fn propose(&self, height: u64) {
        let block = match self
            .blockchain
            .build_block(self.proposer, get_current_time_in_millis())
        {
            Ok(block) => block,
            Err(err) => {
                error!("{}: error while building block {}: {}", self.moniker, height, err);
                return;
            }
        };

        match self.consensus.propose(block) {
            Ok(block) => {
                if log::log_enabled!(log::Level::Debug) {
                    debug!(
                        "{}: proposed block {} at height {} with {} txs",
                        self.moniker,
                        block.hash(),
                        height,
                        block.transactions().len()
                    );
                }
            }
            // Someone else committed this height first, we'll sync it
            Err(err) => trace!("{}: proposal refused: {}", self.moniker, err),
        }
    }
}
