use super::{
    block::Block,
    error::BlockchainError,
    handler::{TransactionHandler, TxReceipt, TxRejection},
    mempool::{Mempool, DEFAULT_MEMPOOL_CAPACITY},
    state::LedgerState,
};
use crate::config::DEFAULT_MAX_TXS_PER_BLOCK;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vela_common::{
    api::daemon::{BlockSummary, GetInfoResult},
    config::{ChainConfig, VERSION},
    crypto::{hash, Address, Hash},
    time::TimestampMillis,
    transaction::{Transaction, MAX_PAYLOAD_SIZE},
};
use vela_genesis::GenesisState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub max_block_txs: usize,
    pub max_block_gas: u64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            max_block_txs: DEFAULT_MAX_TXS_PER_BLOCK,
            max_block_gas: vela_common::config::DEFAULT_BLOCK_GAS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorUpdate {
    pub consensus_pubkey: Vec<u8>,
    pub power: u64,
}

#[derive(Debug, Clone)]
pub struct InitChainRequest {
    pub chain_id: String,
    pub validators: Vec<ValidatorUpdate>,
    pub consensus_params: ConsensusParams,
    pub app_state_bytes: Vec<u8>,
}

impl InitChainRequest {
    // No validator updates and default consensus params
    pub fn new(chain_id: impl Into<String>, app_state_bytes: Vec<u8>) -> Self {
        Self {
            chain_id: chain_id.into(),
            validators: Vec::new(),
            consensus_params: ConsensusParams::default(),
            app_state_bytes,
        }
    }
}

struct Chain {
    ledger: LedgerState,
    // index 0 is the genesis entry
    blocks: Vec<BlockSummary>,
    consensus_params: ConsensusParams,
    rejected_total: u64,
}

impl Chain {
    fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    fn top_hash(&self) -> Hash {
        self.blocks
            .last()
            .map(|block| block.hash)
            .unwrap_or_else(Hash::zero)
    }
}

/// Ledger, block history and mempool of one node.
///
/// Locks are never held across an await point: every method is sync.
pub struct Blockchain {
    chain_config: ChainConfig,
    handler: Arc<dyn TransactionHandler>,
    chain: RwLock<Option<Chain>>,
    mempool: Mutex<Mempool>,
    max_txs_per_block: usize,
    // Consensus address of the validator running this node, if any
    local_validator: Option<Address>,
}

impl Blockchain {
    pub fn new(chain_config: ChainConfig, handler: Arc<dyn TransactionHandler>) -> Self {
        Self {
            chain_config,
            handler,
            chain: RwLock::new(None),
            mempool: Mutex::new(Mempool::new(DEFAULT_MEMPOOL_CAPACITY)),
            max_txs_per_block: DEFAULT_MAX_TXS_PER_BLOCK,
            local_validator: None,
        }
    }

    pub fn with_max_txs_per_block(mut self, max: usize) -> Self {
        self.max_txs_per_block = max;
        self
    }

    pub fn with_mempool_capacity(self, capacity: usize) -> Self {
        *self.mempool.lock() = Mempool::new(capacity);
        self
    }

    pub fn with_local_validator(mut self, consensus_address: Address) -> Self {
        self.local_validator = Some(consensus_address);
        self
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.chain_config
    }

    pub fn is_initialized(&self) -> bool {
        self.chain.read().is_some()
    }

    /// Load the genesis app state. Can only succeed once per instance.
    /// Returns the app hash: keccak256 of the app state bytes.
    pub fn init_chain(&self, request: InitChainRequest) -> Result<Hash, BlockchainError> {
        let mut chain = self.chain.write();
        if chain.is_some() {
            return Err(BlockchainError::AlreadyInitialized);
        }
        if request.chain_id != self.chain_config.chain_id {
            return Err(BlockchainError::ChainIdMismatch {
                expected: self.chain_config.chain_id.clone(),
                got: request.chain_id,
            });
        }
        if !request.validators.is_empty() {
            return Err(BlockchainError::UnexpectedValidatorUpdates(
                request.validators.len(),
            ));
        }

        let genesis = GenesisState::from_json_bytes(&request.app_state_bytes)?;
        let ledger = LedgerState::from_genesis(&genesis, &self.chain_config)?;
        let app_hash = hash(&request.app_state_bytes);

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Initialized chain {} with {} validator(s), app hash {}",
                request.chain_id,
                ledger.validators().count(),
                app_hash
            );
        }

        *chain = Some(Chain {
            ledger,
            blocks: vec![BlockSummary {
                height: 0,
                hash: app_hash,
                previous: Hash::zero(),
                proposer: Address::zero(),
                timestamp: 0,
                txs_count: 0,
                rejected_count: 0,
            }],
            consensus_params: request.consensus_params,
            rejected_total: 0,
        });
        Ok(app_hash)
    }

    /// Admission check. The transaction is only executed once included.
    pub fn add_tx_to_mempool(&self, tx: Transaction) -> Result<Hash, BlockchainError> {
        if !self.is_initialized() {
            return Err(BlockchainError::NotInitialized);
        }
        if tx.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(BlockchainError::TxTooLarge {
                size: tx.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        if tx.chain_id != self.chain_config.evm_chain_id {
            return Err(BlockchainError::InvalidTxChainId {
                expected: self.chain_config.evm_chain_id,
                got: tx.chain_id,
            });
        }
        let sender = tx
            .recover_sender()
            .map_err(|_| BlockchainError::InvalidTxSignature)?;

        let tx_hash = tx.hash();
        let mut mempool = self.mempool.lock();
        if mempool.contains_tx(&tx_hash) {
            return Err(BlockchainError::TxAlreadyInMempool(tx_hash));
        }
        if mempool.is_full() {
            return Err(BlockchainError::MempoolFull(mempool.size()));
        }
        mempool.add_tx(tx_hash, Arc::new(tx));

        if log::log_enabled!(log::Level::Debug) {
            debug!("Transaction {} from {} added to mempool", tx_hash, sender);
        }
        Ok(tx_hash)
    }

    /// Block template on top of the current chain, filled from the mempool
    pub fn build_block(
        &self,
        proposer: Address,
        timestamp: TimestampMillis,
    ) -> Result<Block, BlockchainError> {
        let chain = self.chain.read();
        let chain = chain.as_ref().ok_or(BlockchainError::NotInitialized)?;
        let max = self
            .max_txs_per_block
            .min(chain.consensus_params.max_block_txs);
        let transactions = self.mempool.lock().select(max);

        Ok(Block::new(
            chain.height() + 1,
            chain.top_hash(),
            proposer,
            timestamp,
            transactions,
        ))
    }

    /// Execute a committed block. Rejected transactions are counted, not fatal.
    pub fn apply_block(&self, block: &Block) -> Result<BlockSummary, BlockchainError> {
        let mut chain = self.chain.write();
        let chain = chain.as_mut().ok_or(BlockchainError::NotInitialized)?;

        let expected = chain.height() + 1;
        if block.height() != expected {
            return Err(BlockchainError::InvalidBlockHeight {
                expected,
                got: block.height(),
            });
        }
        let top = chain.top_hash();
        if block.header().previous != top {
            return Err(BlockchainError::InvalidPreviousHash {
                expected: top,
                got: block.header().previous,
            });
        }
        if !block.has_valid_tx_root() {
            return Err(BlockchainError::InvalidTxRoot);
        }

        let mut rejected_count = 0;
        for tx in block.transactions() {
            match self.handler.submit(tx, &mut chain.ledger) {
                Ok(receipt) => log_receipt(&receipt),
                Err(rejection) => {
                    rejected_count += 1;
                    log_rejection(&tx.hash(), &rejection);
                }
            }
        }

        {
            let mut mempool = self.mempool.lock();
            for tx in block.transactions() {
                mempool.remove_tx(&tx.hash());
            }
        }

        let summary = BlockSummary {
            height: block.height(),
            hash: block.hash(),
            previous: block.header().previous,
            proposer: block.header().proposer,
            timestamp: block.header().timestamp,
            txs_count: block.transactions().len(),
            rejected_count,
        };
        chain.rejected_total += rejected_count as u64;
        chain.blocks.push(summary.clone());

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Applied block {} at height {} with {} txs ({} rejected)",
                summary.hash, summary.height, summary.txs_count, rejected_count
            );
        }
        Ok(summary)
    }

    pub fn get_height(&self) -> Result<u64, BlockchainError> {
        self.with_chain(|chain| chain.height())
    }

    pub fn get_balance(&self, address: &Address) -> Result<u128, BlockchainError> {
        self.with_state(|state| state.balance(address))
    }

    pub fn get_nonce(&self, address: &Address) -> Result<u64, BlockchainError> {
        self.with_state(|state| state.nonce(address))
    }

    pub fn get_block_summary(&self, height: u64) -> Result<BlockSummary, BlockchainError> {
        self.with_chain(|chain| chain.blocks.get(height as usize).cloned())?
            .ok_or(BlockchainError::BlockNotFound(height))
    }

    // Transactions rejected by the handler since genesis
    pub fn get_rejected_count(&self) -> Result<u64, BlockchainError> {
        self.with_chain(|chain| chain.rejected_total)
    }

    pub fn get_mempool_size(&self) -> usize {
        self.mempool.lock().size()
    }

    pub fn get_info(&self) -> Result<GetInfoResult, BlockchainError> {
        let (height, top_block_hash, validators_count) = self.with_chain(|chain| {
            (
                chain.height(),
                chain.top_hash(),
                chain.ledger.validators().count(),
            )
        })?;

        Ok(GetInfoResult {
            height,
            top_block_hash,
            chain_id: self.chain_config.chain_id.clone(),
            evm_chain_id: self.chain_config.evm_chain_id,
            validator: self.local_validator.unwrap_or_else(Address::zero),
            validators_count,
            mempool_size: self.get_mempool_size(),
            version: VERSION.to_string(),
        })
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> Result<R, BlockchainError> {
        self.with_chain(|chain| f(&chain.ledger))
    }

    pub fn with_state_mut<R>(
        &self,
        f: impl FnOnce(&mut LedgerState) -> R,
    ) -> Result<R, BlockchainError> {
        let mut chain = self.chain.write();
        let chain = chain.as_mut().ok_or(BlockchainError::NotInitialized)?;
        Ok(f(&mut chain.ledger))
    }

    /// Run a transaction through the handler immediately, bypassing blocks
    pub fn execute_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Result<TxReceipt, TxRejection>, BlockchainError> {
        self.with_state_mut(|state| self.handler.submit(tx, state))
    }

    fn with_chain<R>(&self, f: impl FnOnce(&Chain) -> R) -> Result<R, BlockchainError> {
        let chain = self.chain.read();
        let chain = chain.as_ref().ok_or(BlockchainError::NotInitialized)?;
        Ok(f(chain))
    }
}

fn log_receipt(receipt: &TxReceipt) {
    if log::log_enabled!(log::Level::Debug) {
        match receipt.contract_address {
            Some(contract) => debug!(
                "Transaction {} deployed contract {} (fee {})",
                receipt.hash, contract, receipt.fee
            ),
            None => debug!("Transaction {} executed (fee {})", receipt.hash, receipt.fee),
        }
    }
}

fn log_rejection(hash: &Hash, rejection: &TxRejection) {
    if log::log_enabled!(log::Level::Warn) {
        warn!("Transaction {} rejected: {}", hash, rejection);
    }
}
